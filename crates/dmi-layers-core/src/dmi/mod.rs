//! DMI sprite-sheet container model and codec.
//!
//! A DMI file is an ordinary PNG image carrying a `Description` text chunk.
//! The text lists the icon states in order together with their direction
//! and frame counts; the pixels hold every frame packed into a row-major
//! grid of uniform cells.
//!
//! This module provides:
//! - The in-memory container model ([`DmiFile`], [`DmiState`])
//! - Parsing and writing of the description text
//! - Decoding a DMI from bytes and encoding it back
//!
//! # Examples
//!
//! ```ignore
//! use dmi_layers_core::dmi;
//!
//! let bytes = std::fs::read("mob.dmi").unwrap();
//! let file = dmi::decode(&bytes).unwrap();
//! for state in file.states() {
//!     println!("{}: {} dirs, {} frames", state.name, state.dir_count(), state.frames());
//! }
//! ```

mod codec;
pub mod metadata;
mod types;

pub use codec::{decode, encode, pack_sheet, read_description, DESCRIPTION_KEYWORD};
pub use metadata::{parse_description, write_description, Description, StateHeader};
pub use types::{DirectionDepth, DmiError, DmiFile, DmiState, Hotspot, DEFAULT_VERSION};
