//! Save pipeline: layered document back to DMI bytes.
//!
//! Two modes exist:
//!
//! - **Update-Existing**: the document still carries the original container
//!   bytes from load time. The original container is decoded again and is
//!   the only source of structure (states, frame and direction counts, frame
//!   size, animation settings). Each frame slot is refilled from the same
//!   rectangle of the flattened document, then states are renamed after
//!   their layers.
//! - **Synthesize-New**: no original bytes. The canvas is split into a
//!   square grid with one cell per layer and each cell becomes a static,
//!   single-direction state. Animation and direction data cannot be
//!   recovered in this mode, and edge pixels are lost when the canvas does
//!   not divide evenly.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::config::ConvertConfig;
use crate::dmi::{self, DirectionDepth, DmiFile, DmiState};
use crate::document::{LayerView, LayeredDocument};
use crate::error::PipelineError;
use crate::tiling::{self, canonical_slots};

/// Which recomposition path produced a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveMode {
    /// Original container structure reused, frame pixels and names updated.
    UpdateExisting,
    /// Container built from scratch, one static state per layer.
    SynthesizeNew,
}

/// Output of [`save_document`].
#[derive(Debug, Clone)]
pub struct SavedContainer {
    /// Encoded `.dmi` bytes.
    pub bytes: Vec<u8>,
    pub mode: SaveMode,
}

/// Save a layered document as DMI bytes.
///
/// Update-Existing is used when the document metadata holds non-empty
/// original bytes under `config.raw_data_key` and `config.force_synthesize`
/// is off; otherwise Synthesize-New.
///
/// # Errors
///
/// Returns `PipelineError::InvalidRoundTripData` if the stored bytes are not
/// base64, `PipelineError::Container` if they do not decode or the result
/// cannot be encoded, `PipelineError::TilingViolation` if a frame rectangle
/// falls outside the rendered canvas, and `PipelineError::EmptyDocument`
/// when synthesizing from a document with no layers.
pub fn save_document<D>(
    document: &D,
    config: &ConvertConfig,
) -> Result<SavedContainer, PipelineError>
where
    D: LayeredDocument + ?Sized,
{
    let original = document
        .metadata()
        .get(&config.raw_data_key)
        .filter(|data| !data.is_empty());

    let render = document.render_flat();
    let (container, mode) = match original {
        Some(encoded) if !config.force_synthesize => (
            update_existing(document, &render, encoded, config)?,
            SaveMode::UpdateExisting,
        ),
        _ => (synthesize_new(document, &render)?, SaveMode::SynthesizeNew),
    };
    log::debug!(
        "Saving DMI via {:?}: {} states",
        mode,
        container.states().len()
    );

    let bytes = dmi::encode(&container)?;
    Ok(SavedContainer { bytes, mode })
}

/// Crop one frame cell out of the rendered canvas.
fn crop_frame(
    render: &RgbaImage,
    frame_number: u32,
    canvas_width: u32,
    canvas_height: u32,
    frame_width: u32,
    frame_height: u32,
) -> Result<RgbaImage, PipelineError> {
    let rect = tiling::locate_frame(
        frame_number,
        canvas_width,
        canvas_height,
        frame_width,
        frame_height,
    )
    .filter(|rect| rect.fits_within(render.width(), render.height()))
    .ok_or(PipelineError::TilingViolation {
        frame_number,
        frame_width,
        frame_height,
    })?;

    Ok(imageops::crop_imm(render, rect.x, rect.y, rect.width, rect.height).to_image())
}

/// Rebuild the original container with the document's current pixels.
///
/// `encoded` is the base64 original container. Frame positions are computed
/// from the document's canvas size and the container's frame size, so each
/// frame is read back from exactly where it was placed on load.
pub fn update_existing<D>(
    document: &D,
    render: &RgbaImage,
    encoded: &str,
    config: &ConvertConfig,
) -> Result<DmiFile, PipelineError>
where
    D: LayeredDocument + ?Sized,
{
    let original = BASE64
        .decode(encoded)
        .map_err(|e| PipelineError::InvalidRoundTripData(e.to_string()))?;
    let mut container = dmi::decode(&original)?;

    let (canvas_width, canvas_height) = (document.width(), document.height());
    let (frame_width, frame_height) = (container.frame_width(), container.frame_height());
    for slot in canonical_slots(&container) {
        let frame = crop_frame(
            render,
            slot.frame_number,
            canvas_width,
            canvas_height,
            frame_width,
            frame_height,
        )?;
        container.states_mut()[slot.state_index].set_frame(slot.direction, slot.frame, frame)?;
    }

    apply_renames(&mut container, &document.layers(), &config.state_name_key);
    Ok(container)
}

/// Rename states after the layers that came from them.
///
/// Each layer records the name its state had at load time under
/// `state_name_key`. Layers are visited bottom to top, and a layer claims
/// the first state whose *original* name matches and that no earlier layer
/// has claimed. Renames never feed later matches, and when several states
/// share a name they are paired with the layers carrying that name in
/// order. A layer whose recorded name matches no unclaimed state is skipped.
///
/// Returns the number of states renamed.
pub fn apply_renames(
    container: &mut DmiFile,
    layers: &[LayerView<'_>],
    state_name_key: &str,
) -> usize {
    let original_names: Vec<String> = container
        .states()
        .iter()
        .map(|state| state.name.clone())
        .collect();
    let mut claimed = vec![false; original_names.len()];
    let mut renamed = 0;

    for layer in layers {
        let Some(recorded) = layer
            .metadata
            .get(state_name_key)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };

        let target = original_names
            .iter()
            .enumerate()
            .position(|(index, name)| !claimed[index] && name == recorded);
        match target {
            Some(index) => {
                claimed[index] = true;
                container.states_mut()[index].name = layer.name.to_string();
                renamed += 1;
            }
            None => log::debug!(
                "No state named '{}' for layer '{}', skipping rename",
                recorded,
                layer.name
            ),
        }
    }
    renamed
}

/// Build a new container with one static state per layer.
///
/// With `n` layers the canvas is divided into a `k x k` grid where
/// `k = ceil(sqrt(n))`; layer `i` takes cell `i` in row-major order. Frame
/// size is `canvas / k` rounded down, so up to `k - 1` columns and rows of
/// edge pixels are dropped when the canvas does not divide evenly.
pub fn synthesize_new<D>(document: &D, render: &RgbaImage) -> Result<DmiFile, PipelineError>
where
    D: LayeredDocument + ?Sized,
{
    let layers = document.layers();
    if layers.is_empty() {
        return Err(PipelineError::EmptyDocument);
    }

    let (canvas_width, canvas_height) = (document.width(), document.height());
    let per_line = tiling::synthesis_grid(layers.len() as u32);
    let frame_width = canvas_width / per_line;
    let frame_height = canvas_height / per_line;
    if frame_width == 0 || frame_height == 0 {
        return Err(PipelineError::TilingViolation {
            frame_number: 0,
            frame_width,
            frame_height,
        });
    }

    let dropped_columns = canvas_width % per_line;
    let dropped_rows = canvas_height % per_line;
    if dropped_columns != 0 || dropped_rows != 0 {
        log::warn!(
            "Canvas {}x{} does not divide into a {}x{} grid; dropping {} right columns and {} bottom rows",
            canvas_width,
            canvas_height,
            per_line,
            per_line,
            dropped_columns,
            dropped_rows
        );
    }

    let mut container = DmiFile::new(frame_width, frame_height);
    for (index, layer) in layers.iter().enumerate() {
        let frame = crop_frame(
            render,
            index as u32,
            canvas_width,
            canvas_height,
            frame_width,
            frame_height,
        )?;
        let mut state =
            DmiState::new(layer.name, DirectionDepth::One, 1, frame_width, frame_height)?;
        state.set_frame(0, 0, frame)?;
        container.add_state(state)?;
    }
    Ok(container)
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::decompose::load_document;
    use crate::document::{Document, Layer};
    use crate::fixtures::{numbered_dmi, shapes_strategy};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: Load then save without edits keeps every frame's pixels.
        #[test]
        fn prop_round_trip_idempotent(shapes in shapes_strategy()) {
            let original = numbered_dmi(3, &shapes);
            let document = load_document(&dmi::encode(&original).unwrap()).unwrap();
            let saved = save_document(&document, &ConvertConfig::default()).unwrap();
            prop_assert_eq!(saved.mode, SaveMode::UpdateExisting);

            let result = dmi::decode(&saved.bytes).unwrap();
            prop_assert_eq!(result.states().len(), original.states().len());
            for (a, b) in original.states().iter().zip(result.states()) {
                prop_assert_eq!(&a.name, &b.name);
                for frame in 0..a.frames() {
                    for dir in 0..a.dir_count() {
                        prop_assert_eq!(a.frame(dir, frame), b.frame(dir, frame));
                    }
                }
            }
        }

        /// Property: Synthesizing from n layers yields n static single-direction
        /// states on a ceil(sqrt(n)) grid.
        #[test]
        fn prop_synthesize_one_state_per_layer(n in 1usize..=20, cell in 1u32..=8) {
            let per_line = tiling::synthesis_grid(n as u32);
            let side = per_line * cell;
            let mut document = Document::new(side, side);
            for i in 0..n {
                document.add_layer(Layer::new(format!("layer{i}"), side, side));
            }

            let container = synthesize_new(&document, &document.render_flat()).unwrap();
            prop_assert_eq!(container.states().len(), n);
            prop_assert_eq!(container.frame_width(), cell);
            prop_assert!((per_line as f64) >= (n as f64).sqrt());
            for (i, state) in container.states().iter().enumerate() {
                prop_assert_eq!(state.dirs(), DirectionDepth::One);
                prop_assert_eq!(state.frames(), 1);
                prop_assert_eq!(&state.name, &format!("layer{i}"));
            }
        }
    }
}
