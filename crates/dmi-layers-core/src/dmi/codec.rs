//! DMI decoding and encoding.
//!
//! Decoding reads the description from the PNG text chunks with the `png`
//! crate and the pixels with the `image` crate, then slices the sheet into
//! per-state frames in canonical order. Encoding packs the frames back into
//! a square-ish grid and writes the description as a compressed `zTXt`
//! chunk.

use std::io::Cursor;

use image::{imageops, ImageFormat, RgbaImage};

use super::metadata::{parse_description, write_description};
use super::types::{DmiError, DmiFile, DmiState};
use crate::tiling::{self, canonical_slots};

/// PNG text keyword under which DMI files store their description.
pub const DESCRIPTION_KEYWORD: &str = "Description";

/// Extract the DMI description text from PNG bytes.
///
/// `zTXt`, `tEXt` and `iTXt` chunks are all accepted; the first one keyed
/// `Description` wins.
///
/// # Errors
///
/// Returns `DmiError::InvalidPng` if the PNG header cannot be read and
/// `DmiError::MissingDescription` if no description chunk exists.
pub fn read_description(bytes: &[u8]) -> Result<String, DmiError> {
    let decoder = png::Decoder::new(Cursor::new(bytes));
    let reader = decoder
        .read_info()
        .map_err(|e| DmiError::InvalidPng(e.to_string()))?;
    let info = reader.info();

    for chunk in &info.compressed_latin1_text {
        if chunk.keyword == DESCRIPTION_KEYWORD {
            return chunk
                .get_text()
                .map_err(|e| DmiError::InvalidPng(e.to_string()));
        }
    }
    for chunk in &info.uncompressed_latin1_text {
        if chunk.keyword == DESCRIPTION_KEYWORD {
            return Ok(chunk.text.clone());
        }
    }
    for chunk in &info.utf8_text {
        if chunk.keyword == DESCRIPTION_KEYWORD {
            return chunk
                .get_text()
                .map_err(|e| DmiError::InvalidPng(e.to_string()));
        }
    }

    Err(DmiError::MissingDescription)
}

/// Decode a DMI container from bytes.
///
/// # Arguments
///
/// * `bytes` - Raw `.dmi` file bytes
///
/// # Errors
///
/// Returns `DmiError::InvalidPng` for undecodable image data, any parse
/// error from the description, and `DmiError::FrameOutOfBounds` if the sheet
/// is too small to hold every declared frame. In that case `frame_number` is
/// the first frame that does not fit.
pub fn decode(bytes: &[u8]) -> Result<DmiFile, DmiError> {
    let text = read_description(bytes)?;
    let description = parse_description(&text)?;

    let sheet = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| DmiError::InvalidPng(e.to_string()))?
        .into_rgba8();

    let (frame_width, frame_height) = (description.frame_width, description.frame_height);
    let (sheet_width, sheet_height) = sheet.dimensions();

    // Declared frames must fit the sheet before any frame buffer is allocated
    let capacity = tiling::frame_capacity(sheet_width, sheet_height, frame_width, frame_height);
    let declared = description.states.iter().try_fold(0u64, |total, header| {
        total.checked_add(u64::from(header.frames) * u64::from(header.dirs.count()))
    });
    if declared.map_or(true, |declared| declared > capacity) {
        return Err(DmiError::FrameOutOfBounds {
            frame_number: u32::try_from(capacity).unwrap_or(u32::MAX),
            frame_width,
            frame_height,
            sheet_width,
            sheet_height,
        });
    }

    let mut dmi = DmiFile::new(frame_width, frame_height);
    dmi.version = description.version;

    for header in description.states {
        let mut state = DmiState::new(
            header.name,
            header.dirs,
            header.frames,
            frame_width,
            frame_height,
        )?;
        state.delays = header.delays;
        state.loop_count = header.loop_count;
        state.rewind = header.rewind;
        state.movement = header.movement;
        state.hotspots = header.hotspots;
        state.extra = header.extra;
        dmi.add_state(state)?;
    }

    for slot in canonical_slots(&dmi) {
        let rect = tiling::locate_frame(
            slot.frame_number,
            sheet_width,
            sheet_height,
            frame_width,
            frame_height,
        )
        .ok_or(DmiError::FrameOutOfBounds {
            frame_number: slot.frame_number,
            frame_width,
            frame_height,
            sheet_width,
            sheet_height,
        })?;

        let frame = imageops::crop_imm(&sheet, rect.x, rect.y, rect.width, rect.height).to_image();
        dmi.states_mut()[slot.state_index].set_frame(slot.direction, slot.frame, frame)?;
    }

    Ok(dmi)
}

/// Pack every frame of a container into a single sheet.
///
/// The sheet is `columns x rows` cells where `columns = ceil(sqrt(total))`,
/// the layout BYOND itself produces.
pub fn pack_sheet(dmi: &DmiFile) -> RgbaImage {
    let (frame_width, frame_height) = (dmi.frame_width(), dmi.frame_height());
    let (columns, rows) = tiling::sheet_grid(tiling::total_frame_count(dmi));
    let (sheet_width, sheet_height) = (columns * frame_width, rows * frame_height);

    let mut sheet = RgbaImage::new(sheet_width, sheet_height);
    for slot in canonical_slots(dmi) {
        let state = &dmi.states()[slot.state_index];
        if let Some(frame) = state.frame(slot.direction, slot.frame) {
            let (x, y) = tiling::frame_offset(
                slot.frame_number,
                sheet_width,
                sheet_height,
                frame_width,
                frame_height,
            );
            imageops::replace(&mut sheet, frame, i64::from(x), i64::from(y));
        }
    }
    sheet
}

/// Encode a DMI container to bytes.
///
/// # Errors
///
/// Returns `DmiError::EncodingFailed` if the frame size is zero or the PNG
/// writer fails, for example on a state name outside Latin-1.
pub fn encode(dmi: &DmiFile) -> Result<Vec<u8>, DmiError> {
    if dmi.frame_width() == 0 || dmi.frame_height() == 0 {
        return Err(DmiError::EncodingFailed(format!(
            "frame size must be non-zero, got {}x{}",
            dmi.frame_width(),
            dmi.frame_height()
        )));
    }

    let sheet = pack_sheet(dmi);
    let description = write_description(dmi);

    let mut output = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut output, sheet.width(), sheet.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .add_ztxt_chunk(DESCRIPTION_KEYWORD.to_string(), description)
            .map_err(|e| DmiError::EncodingFailed(e.to_string()))?;

        let mut writer = encoder
            .write_header()
            .map_err(|e| DmiError::EncodingFailed(e.to_string()))?;
        writer
            .write_image_data(sheet.as_raw())
            .map_err(|e| DmiError::EncodingFailed(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| DmiError::EncodingFailed(e.to_string()))?;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmi::DirectionDepth;
    use crate::fixtures::sheet_bytes;
    use image::Rgba;

    /// A solid frame whose colour encodes the frame number.
    fn solid(size: u32, n: u8) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([n, 255 - n, n / 2, 255]))
    }

    fn sample_dmi() -> DmiFile {
        let mut dmi = DmiFile::new(4, 4);
        let mut walk = DmiState::new("walk", DirectionDepth::Four, 2, 4, 4).unwrap();
        walk.delays = vec![1.0, 2.0];
        let mut n = 0u8;
        for frame in 0..2 {
            for dir in 0..4 {
                walk.set_frame(dir, frame, solid(4, n * 10)).unwrap();
                n += 1;
            }
        }
        let mut idle = DmiState::new("idle", DirectionDepth::One, 1, 4, 4).unwrap();
        idle.set_frame(0, 0, solid(4, 200)).unwrap();
        dmi.add_state(walk).unwrap();
        dmi.add_state(idle).unwrap();
        dmi
    }

    #[test]
    fn test_pack_sheet_dimensions() {
        // 9 frames -> 3x3 grid of 4px cells
        let sheet = pack_sheet(&sample_dmi());
        assert_eq!(sheet.dimensions(), (12, 12));
        // frame 1 is direction 1 of walk frame 0
        assert_eq!(sheet.get_pixel(4, 0).0, [10, 245, 5, 255]);
        // frame 8 is idle at cell (2, 2)
        assert_eq!(sheet.get_pixel(8, 8).0, [200, 55, 100, 255]);
    }

    #[test]
    fn test_encode_writes_png_with_description() {
        let bytes = encode(&sample_dmi()).unwrap();
        assert_eq!(&bytes[0..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        let text = read_description(&bytes).unwrap();
        assert!(text.contains("state = \"walk\""));
        assert!(text.contains("\tdirs = 4"));
    }

    #[test]
    fn test_decode_restores_states_and_frames() {
        let original = sample_dmi();
        let decoded = decode(&encode(&original).unwrap()).unwrap();

        assert_eq!(decoded.frame_width(), 4);
        assert_eq!(decoded.states().len(), 2);
        assert_eq!(decoded.states()[0].name, "walk");
        assert_eq!(decoded.states()[0].dirs(), DirectionDepth::Four);
        assert_eq!(decoded.states()[0].delays, vec![1.0, 2.0]);

        for (a, b) in original.states().iter().zip(decoded.states()) {
            for frame in 0..a.frames() {
                for dir in 0..a.dir_count() {
                    assert_eq!(a.frame(dir, frame), b.frame(dir, frame));
                }
            }
        }
    }

    #[test]
    fn test_decode_plain_png_has_no_description() {
        let mut bytes = Vec::new();
        RgbaImage::new(4, 4)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        assert!(matches!(decode(&bytes), Err(DmiError::MissingDescription)));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode(&[0x00, 0x01, 0x02, 0x03]),
            Err(DmiError::InvalidPng(_))
        ));
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_decode_sheet_too_small() {
        // Description claims 4 frames of 4x4, sheet only holds 1
        let mut output = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut output, 4, 4);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder
                .add_text_chunk(
                    DESCRIPTION_KEYWORD.to_string(),
                    "# BEGIN DMI\nversion = 4.0\n\twidth = 4\n\theight = 4\nstate = \"a\"\n\tdirs = 4\n# END DMI\n"
                        .to_string(),
                )
                .unwrap();
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0u8; 4 * 4 * 4]).unwrap();
        }

        match decode(&output) {
            Err(DmiError::FrameOutOfBounds { frame_number, .. }) => assert_eq!(frame_number, 1),
            other => panic!("Expected FrameOutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_frame_count_overflow() {
        // 600M frames x 8 dirs overflows u32 and is far beyond a one-cell sheet
        let bytes = sheet_bytes(
            &RgbaImage::new(32, 32),
            "# BEGIN DMI\nversion = 4.0\nstate = \"huge\"\n\tdirs = 8\n\tframes = 600000000\n# END DMI\n",
        );
        assert!(matches!(
            decode(&bytes),
            Err(DmiError::FrameOutOfBounds { frame_number: 1, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_frames_beyond_sheet_capacity() {
        // 2x2 cells available, ten million declared
        let bytes = sheet_bytes(
            &RgbaImage::new(64, 64),
            "# BEGIN DMI\nversion = 4.0\nstate = \"a\"\n\tframes = 3\nstate = \"b\"\n\tframes = 10000000\n# END DMI\n",
        );
        match decode(&bytes) {
            Err(DmiError::FrameOutOfBounds {
                frame_number,
                sheet_width,
                sheet_height,
                ..
            }) => {
                assert_eq!(frame_number, 4);
                assert_eq!((sheet_width, sheet_height), (64, 64));
            }
            other => panic!("Expected FrameOutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_accepts_sheet_filled_to_capacity() {
        let bytes = sheet_bytes(
            &RgbaImage::new(64, 64),
            "# BEGIN DMI\nversion = 4.0\nstate = \"a\"\n\tdirs = 4\n# END DMI\n",
        );
        let dmi = decode(&bytes).unwrap();
        assert_eq!(dmi.total_frames(), 4);
    }

    #[test]
    fn test_encode_empty_container() {
        let dmi = DmiFile::new(8, 8);
        let decoded = decode(&encode(&dmi).unwrap()).unwrap();
        assert!(decoded.states().is_empty());
    }

    #[test]
    fn test_encode_rejects_zero_frame_size() {
        let dmi = DmiFile::new(0, 8);
        assert!(matches!(encode(&dmi), Err(DmiError::EncodingFailed(_))));
    }
}
