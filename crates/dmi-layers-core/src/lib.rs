//! DMI Layers Core - sprite-sheet layout engine
//!
//! This crate converts BYOND DMI sprite sheets into editable layered
//! documents and back. Each icon state becomes one canvas-sized layer whose
//! frames sit exactly where they were packed in the sheet.
//!
//! # Module Structure
//!
//! - `tiling` - Frame number to pixel offset arithmetic and canonical frame order
//! - `dmi` - Container model plus DMI decode/encode
//! - `document` - Layered document model and the `LayeredDocument` host trait
//! - `decompose` - Load pipeline (DMI bytes to document)
//! - `recompose` - Save pipeline (document to DMI bytes)
//! - `config` - Metadata key names and save options
//!
//! # Usage
//!
//! ```ignore
//! use dmi_layers_core::{load_document, save_document, ConvertConfig};
//!
//! let bytes = std::fs::read("mob.dmi").unwrap();
//! let mut document = load_document(&bytes).unwrap();
//! document.layers_mut()[0].name = "walk_new".to_string();
//!
//! let saved = save_document(&document, &ConvertConfig::default()).unwrap();
//! std::fs::write("mob.dmi", saved.bytes).unwrap();
//! ```

pub mod config;
pub mod decompose;
pub mod dmi;
pub mod document;
pub mod error;
pub mod recompose;
pub mod tiling;

// Re-exported so bindings can name pixel buffer types without their own dependency
pub use image;

#[cfg(test)]
mod fixtures;

pub use config::ConvertConfig;
pub use decompose::{load_document, load_document_with};
pub use document::{Document, Layer, LayerView, LayeredDocument, Metadata};
pub use error::PipelineError;
pub use recompose::{save_document, SaveMode, SavedContainer};
pub use tiling::{frame_offset, FrameSlot};
