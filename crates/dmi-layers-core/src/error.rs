//! Error types for the load and save pipelines.

use thiserror::Error;

use crate::dmi::DmiError;

/// Errors that abort a load or save.
///
/// A state rename that finds no matching state is not an error, and neither
/// is the loss of animation data or edge pixels when synthesizing a new
/// container.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The container could not be decoded, encoded or updated.
    #[error("DMI container error: {0}")]
    Container(#[from] DmiError),

    /// The bytes could not be decoded as a flat raster image.
    #[error("Raster decode failed: {0}")]
    Raster(String),

    /// A frame rectangle falls outside the source or destination buffer.
    #[error("Failed copying frame {frame_number} (frame size {frame_width}x{frame_height}): rectangle lies outside the image")]
    TilingViolation {
        frame_number: u32,
        frame_width: u32,
        frame_height: u32,
    },

    /// The stored original container bytes are not valid base64.
    #[error("Invalid round-trip data: {0}")]
    InvalidRoundTripData(String),

    /// A new container cannot be synthesized from a document with no layers.
    #[error("Document has no layers")]
    EmptyDocument,
}
