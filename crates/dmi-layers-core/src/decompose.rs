//! Load pipeline: DMI bytes to a layered document.
//!
//! Every state becomes one canvas-sized layer. Each frame is copied from the
//! packed sheet to the *same* rectangle on its state's layer, so stacking the
//! layers reproduces the original sheet and every other area of a layer
//! stays transparent. The original bytes are stored in the document
//! metadata so a later save can reuse the container structure.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::imageops;

use crate::config::ConvertConfig;
use crate::dmi;
use crate::document::{Document, Layer};
use crate::error::PipelineError;
use crate::tiling::{self, canonical_slots};

/// Load a DMI file into a layered document using the default config.
///
/// See [`load_document_with`].
pub fn load_document(bytes: &[u8]) -> Result<Document, PipelineError> {
    load_document_with(bytes, &ConvertConfig::default())
}

/// Load a DMI file into a layered document.
///
/// # Arguments
///
/// * `bytes` - Raw `.dmi` file bytes
/// * `config` - Metadata key names
///
/// # Returns
///
/// A document sized to the packed sheet with one layer per state, in
/// container order. Each layer is named after its state and tagged with the
/// state name; the document is tagged with the base64 original bytes.
///
/// # Errors
///
/// Returns `PipelineError::Container` or `PipelineError::Raster` if the
/// bytes cannot be decoded, and `PipelineError::TilingViolation` if any
/// frame falls outside the sheet. No partial document is returned.
pub fn load_document_with(
    bytes: &[u8],
    config: &ConvertConfig,
) -> Result<Document, PipelineError> {
    let container = dmi::decode(bytes)?;
    let raster = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::Raster(e.to_string()))?
        .into_rgba8();

    let total_frames = tiling::total_frame_count(&container);
    let (width, height) = raster.dimensions();
    log::debug!(
        "Loading DMI: {} states, {} frames, {}x{} sheet",
        container.states().len(),
        total_frames,
        width,
        height
    );

    let mut document = Document::new(width, height);
    document
        .metadata_mut()
        .set(config.raw_data_key.as_str(), BASE64.encode(bytes));

    let mut layers: Vec<Layer> = container
        .states()
        .iter()
        .map(|state| {
            let mut layer = Layer::new(state.name.as_str(), width, height);
            layer
                .metadata
                .set(config.state_name_key.as_str(), state.name.as_str());
            layer
        })
        .collect();

    let (frame_width, frame_height) = (container.frame_width(), container.frame_height());
    for slot in canonical_slots(&container) {
        let layer = &mut layers[slot.state_index];
        let rect = tiling::locate_frame(
            slot.frame_number,
            layer.pixels.width(),
            layer.pixels.height(),
            frame_width,
            frame_height,
        )
        .filter(|rect| rect.fits_within(raster.width(), raster.height()))
        .ok_or(PipelineError::TilingViolation {
            frame_number: slot.frame_number,
            frame_width,
            frame_height,
        })?;

        let frame =
            imageops::crop_imm(&raster, rect.x, rect.y, rect.width, rect.height).to_image();
        imageops::replace(
            &mut layer.pixels,
            &frame,
            i64::from(rect.x),
            i64::from(rect.y),
        );
    }

    for layer in layers {
        document.add_layer(layer);
    }
    Ok(document)
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::fixtures::{numbered_dmi, shapes_strategy};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: Each frame cell is opaque on exactly one layer, and the
        /// number of opaque cells equals the total frame count.
        #[test]
        fn prop_each_frame_copied_once(shapes in shapes_strategy()) {
            let dmi = numbered_dmi(3, &shapes);
            let total = tiling::total_frame_count(&dmi);
            let doc = load_document(&dmi::encode(&dmi).unwrap()).unwrap();
            prop_assert_eq!(doc.layers().len(), shapes.len());

            let mut owned_cells = 0u32;
            for n in 0..total {
                let (x, y) = tiling::frame_offset(n, doc.width(), doc.height(), 3, 3);
                let owners = doc
                    .layers()
                    .iter()
                    .filter(|layer| layer.pixels.get_pixel(x, y)[3] != 0)
                    .count();
                prop_assert_eq!(owners, 1);
                owned_cells += 1;
            }
            prop_assert_eq!(owned_cells, total);
        }
    }
}
