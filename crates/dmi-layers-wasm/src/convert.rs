//! DMI load/save WASM bindings.
//!
//! This module exposes the dmi-layers-core pipelines to JavaScript.
//!
//! # Functions
//!
//! - [`load_dmi`] - Split a `.dmi` file into one layer per state
//! - [`load_dmi_with_config`] - Same, with custom metadata keys
//! - [`save_dmi`] - Write a document back to `.dmi` bytes
//! - [`inspect_dmi`] - Describe a `.dmi` file's states without building layers
//!
//! # Example
//!
//! ```typescript
//! import { load_dmi, save_dmi } from '@dmi-layers/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const doc = load_dmi(bytes);
//! doc.set_layer_name(0, 'walk_new');
//! const saved = save_dmi(doc);
//! ```

use crate::types::{ContainerSummary, JsDocument};
use dmi_layers_core::{dmi, load_document_with, save_document, ConvertConfig, SaveMode};
use wasm_bindgen::prelude::*;

fn to_js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Load a DMI file into a layered document.
///
/// # Arguments
///
/// * `bytes` - The raw `.dmi` file bytes as a `Uint8Array`
///
/// # Errors
///
/// Returns an error if the bytes are not a valid DMI file or a frame lies
/// outside the packed sheet.
#[wasm_bindgen]
pub fn load_dmi(bytes: &[u8]) -> Result<JsDocument, JsValue> {
    let config = ConvertConfig::default();
    load_document_with(bytes, &config)
        .map(|document| JsDocument::from_document(document, config))
        .map_err(to_js_error)
}

/// Load a DMI file using host-provided settings.
///
/// `config` is a plain object with any of `raw_data_key`, `state_name_key`
/// and `force_synthesize`; missing fields use their defaults. The settings
/// stay attached to the returned document and are used again by
/// [`save_dmi`].
#[wasm_bindgen]
pub fn load_dmi_with_config(bytes: &[u8], config: JsValue) -> Result<JsDocument, JsValue> {
    let config: ConvertConfig = serde_wasm_bindgen::from_value(config).map_err(to_js_error)?;
    load_document_with(bytes, &config)
        .map(|document| JsDocument::from_document(document, config))
        .map_err(to_js_error)
}

/// Save a document as DMI bytes.
///
/// Documents loaded from a DMI file keep their original states, directions
/// and animation settings; only pixels and state names change. Documents
/// created from scratch become one static state per layer.
#[wasm_bindgen]
pub fn save_dmi(document: &JsDocument) -> Result<Vec<u8>, JsValue> {
    let saved = save_document(document.document(), document.config()).map_err(to_js_error)?;
    if saved.mode == SaveMode::SynthesizeNew {
        web_sys::console::warn_1(&JsValue::from_str(
            "Saving DMI without original data: every layer becomes a single-frame, single-direction state",
        ));
    }
    Ok(saved.bytes)
}

/// Describe a DMI file's frame size and states.
///
/// Returns a plain object: `{ version, frame_width, frame_height,
/// total_frames, states: [{ name, dirs, frames, delays, ... }] }`.
#[wasm_bindgen]
pub fn inspect_dmi(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let container = dmi::decode(bytes).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&ContainerSummary::from(&container)).map_err(to_js_error)
}
