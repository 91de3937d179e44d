//! DMI Layers WASM - WebAssembly bindings for dmi-layers
//!
//! This crate lets a browser-based paint tool open BYOND `.dmi` sprite sheets
//! as layered documents and save them back.
//!
//! # Module Structure
//!
//! - `types` - `JsDocument` wrapper and serializable container summaries
//! - `convert` - Load, save and inspect bindings
//!
//! # Usage
//!
//! ```typescript
//! import init, { load_dmi, save_dmi } from '@dmi-layers/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const doc = load_dmi(new Uint8Array(await file.arrayBuffer()));
//! for (let i = 0; i < doc.layer_count; i++) {
//!   console.log(doc.layer_name(i));
//! }
//! const bytes = save_dmi(doc);
//! ```

use wasm_bindgen::prelude::*;

mod convert;
mod types;

// Re-export public types
pub use convert::{inspect_dmi, load_dmi, load_dmi_with_config, save_dmi};
pub use types::{ContainerSummary, JsDocument, StateSummary};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// File extensions this module can load and save.
#[wasm_bindgen]
pub fn supported_extensions() -> Vec<String> {
    vec![".dmi".to_string()]
}
