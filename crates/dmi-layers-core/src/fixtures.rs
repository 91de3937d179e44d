//! Shared builders for pipeline tests.

use image::{Rgba, RgbaImage};
use proptest::prelude::*;

use crate::dmi::{DirectionDepth, DmiFile, DmiState, DESCRIPTION_KEYWORD};

/// A distinct opaque colour for frame number `n`.
pub fn cell_color(n: u32) -> Rgba<u8> {
    Rgba([(n & 0xff) as u8, ((n >> 8) & 0xff) as u8, 100, 255])
}

/// Build a container whose frames are solid [`cell_color`]s numbered in
/// canonical order.
pub fn numbered_dmi<N: AsRef<str>>(
    frame_size: u32,
    states: &[(N, DirectionDepth, u32)],
) -> DmiFile {
    let mut dmi = DmiFile::new(frame_size, frame_size);
    let mut n = 0;
    for (name, dirs, frames) in states {
        let mut state =
            DmiState::new(name.as_ref(), *dirs, *frames, frame_size, frame_size).unwrap();
        for frame in 0..*frames {
            for direction in 0..dirs.count() {
                let cell = RgbaImage::from_pixel(frame_size, frame_size, cell_color(n));
                state.set_frame(direction, frame, cell).unwrap();
                n += 1;
            }
        }
        dmi.add_state(state).unwrap();
    }
    dmi
}

/// Encode an arbitrary sheet with a hand-written description.
pub fn sheet_bytes(sheet: &RgbaImage, description: &str) -> Vec<u8> {
    let mut output = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut output, sheet.width(), sheet.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .add_ztxt_chunk(DESCRIPTION_KEYWORD.to_string(), description.to_string())
            .unwrap();
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(sheet.as_raw()).unwrap();
    }
    output
}

/// Strategy for 1-4 uniquely named states of random shape.
pub fn shapes_strategy() -> impl Strategy<Value = Vec<(String, DirectionDepth, u32)>> {
    let dirs = prop_oneof![
        Just(DirectionDepth::One),
        Just(DirectionDepth::Four),
        Just(DirectionDepth::Eight),
    ];
    prop::collection::vec((dirs, 1u32..=3), 1..=4).prop_map(|shapes| {
        shapes
            .into_iter()
            .enumerate()
            .map(|(i, (dirs, frames))| (format!("state{i}"), dirs, frames))
            .collect()
    })
}
