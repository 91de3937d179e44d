//! Core types for the DMI container model.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Description format version written for new containers.
pub const DEFAULT_VERSION: &str = "4.0";

/// Error types for DMI decoding, encoding and frame access.
#[derive(Debug, Error)]
pub enum DmiError {
    /// The bytes are not a decodable PNG image.
    #[error("Invalid PNG data: {0}")]
    InvalidPng(String),

    /// The PNG has no DMI `Description` text chunk.
    #[error("No DMI description found in PNG text chunks")]
    MissingDescription,

    /// The description text could not be parsed.
    #[error("Invalid DMI description at line {line}: {reason}")]
    InvalidDescription { line: usize, reason: String },

    /// A state declares a direction count other than 1, 4 or 8.
    #[error("Unsupported direction count: {0} (expected 1, 4 or 8)")]
    UnsupportedDirs(u32),

    /// A frame cell lies outside the packed sheet.
    #[error(
        "Frame {frame_number} ({frame_width}x{frame_height}) lies outside the {sheet_width}x{sheet_height} sheet"
    )]
    FrameOutOfBounds {
        frame_number: u32,
        frame_width: u32,
        frame_height: u32,
        sheet_width: u32,
        sheet_height: u32,
    },

    /// A frame image does not match the container's frame size.
    #[error("Frame size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    FrameSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    /// A `(direction, frame)` address is outside the state's frame store.
    #[error("Frame index out of range: direction {direction}, frame {frame} (state has {dirs} dirs, {frames} frames)")]
    FrameIndexOutOfRange {
        direction: u32,
        frame: u32,
        dirs: u32,
        frames: u32,
    },

    /// A state or container declares more frame cells than a `u32` can count.
    #[error("Too many frames: {0} frame cells exceed the addressable limit")]
    TooManyFrames(u64),

    /// PNG encoding failed.
    #[error("DMI encoding failed: {0}")]
    EncodingFailed(String),
}

/// Number of directions stored per animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirectionDepth {
    /// A single, non-directional view.
    #[default]
    One,
    /// South, north, east, west.
    Four,
    /// The four cardinals followed by the four diagonals.
    Eight,
}

impl DirectionDepth {
    /// Number of directions this depth stores.
    #[inline]
    pub fn count(self) -> u32 {
        match self {
            DirectionDepth::One => 1,
            DirectionDepth::Four => 4,
            DirectionDepth::Eight => 8,
        }
    }
}

impl TryFrom<u32> for DirectionDepth {
    type Error = DmiError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DirectionDepth::One),
            4 => Ok(DirectionDepth::Four),
            8 => Ok(DirectionDepth::Eight),
            other => Err(DmiError::UnsupportedDirs(other)),
        }
    }
}

/// Attachment point of a state's frame, as `x,y,frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: u32,
    pub y: u32,
    pub frame: u32,
}

/// A named icon state: a `frames x dirs` grid of equally sized images.
///
/// Frames are stored frame-major, so the image for `(direction, frame)`
/// lives at index `frame * dirs + direction`.
#[derive(Debug, Clone)]
pub struct DmiState {
    /// State name as it appears in the description.
    pub name: String,
    dirs: DirectionDepth,
    frames: u32,
    frame_width: u32,
    frame_height: u32,
    images: Vec<RgbaImage>,
    /// Per-frame delays in ticks. Empty for unanimated states.
    pub delays: Vec<f32>,
    /// Number of animation loops, 0 for infinite.
    pub loop_count: u32,
    /// Play the animation back in reverse after reaching the end.
    pub rewind: bool,
    /// Marks a movement state.
    pub movement: bool,
    pub hotspots: Vec<Hotspot>,
    /// Unrecognised `key = value` pairs, kept in order.
    pub extra: Vec<(String, String)>,
}

impl DmiState {
    /// Create a state with transparent frames.
    ///
    /// `frames` is raised to 1 if zero is given: every state holds at least
    /// one frame.
    ///
    /// # Errors
    ///
    /// Returns `DmiError::TooManyFrames` if `frames * dirs` overflows `u32`.
    pub fn new(
        name: impl Into<String>,
        dirs: DirectionDepth,
        frames: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, DmiError> {
        let frames = frames.max(1);
        let slots = frames
            .checked_mul(dirs.count())
            .ok_or(DmiError::TooManyFrames(u64::from(frames) * u64::from(dirs.count())))?;
        Ok(Self {
            name: name.into(),
            dirs,
            frames,
            frame_width,
            frame_height,
            images: vec![RgbaImage::new(frame_width, frame_height); slots as usize],
            delays: Vec::new(),
            loop_count: 0,
            rewind: false,
            movement: false,
            hotspots: Vec::new(),
            extra: Vec::new(),
        })
    }

    pub fn dirs(&self) -> DirectionDepth {
        self.dirs
    }

    /// Number of directions per frame.
    pub fn dir_count(&self) -> u32 {
        self.dirs.count()
    }

    /// Number of animation frames.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Total number of frame cells, `frames * dirs`.
    ///
    /// Checked for overflow when the state is built.
    pub fn frame_count_total(&self) -> u32 {
        self.frames * self.dirs.count()
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    fn index(&self, direction: u32, frame: u32) -> Result<usize, DmiError> {
        if direction >= self.dir_count() || frame >= self.frames {
            return Err(DmiError::FrameIndexOutOfRange {
                direction,
                frame,
                dirs: self.dir_count(),
                frames: self.frames,
            });
        }
        Ok((frame * self.dir_count() + direction) as usize)
    }

    /// Get the image for `(direction, frame)`.
    pub fn frame(&self, direction: u32, frame: u32) -> Option<&RgbaImage> {
        self.index(direction, frame)
            .ok()
            .and_then(|index| self.images.get(index))
    }

    /// Replace the image for `(direction, frame)`.
    ///
    /// # Errors
    ///
    /// Returns `DmiError::FrameIndexOutOfRange` for an invalid address and
    /// `DmiError::FrameSizeMismatch` if the image is not the frame size.
    pub fn set_frame(
        &mut self,
        direction: u32,
        frame: u32,
        image: RgbaImage,
    ) -> Result<(), DmiError> {
        let index = self.index(direction, frame)?;
        if image.dimensions() != (self.frame_width, self.frame_height) {
            return Err(DmiError::FrameSizeMismatch {
                expected_width: self.frame_width,
                expected_height: self.frame_height,
                width: image.width(),
                height: image.height(),
            });
        }
        self.images[index] = image;
        Ok(())
    }
}

/// An ordered collection of icon states sharing one frame size.
#[derive(Debug, Clone)]
pub struct DmiFile {
    /// Description format version, usually `4.0`.
    pub version: String,
    frame_width: u32,
    frame_height: u32,
    states: Vec<DmiState>,
    total_frames: u32,
}

impl DmiFile {
    /// Create an empty container with the given frame size.
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            frame_width,
            frame_height,
            states: Vec::new(),
            total_frames: 0,
        }
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    /// States in container order.
    pub fn states(&self) -> &[DmiState] {
        &self.states
    }

    /// Number of frame cells across all states.
    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Mutable access to the states. The slice cannot grow or shrink.
    pub fn states_mut(&mut self) -> &mut [DmiState] {
        &mut self.states
    }

    /// Append a state.
    ///
    /// # Errors
    ///
    /// Returns `DmiError::FrameSizeMismatch` if the state's frame size differs
    /// from the container's, and `DmiError::TooManyFrames` if the container
    /// would hold more than `u32::MAX` frame cells.
    pub fn add_state(&mut self, state: DmiState) -> Result<(), DmiError> {
        if (state.frame_width, state.frame_height) != (self.frame_width, self.frame_height) {
            return Err(DmiError::FrameSizeMismatch {
                expected_width: self.frame_width,
                expected_height: self.frame_height,
                width: state.frame_width,
                height: state.frame_height,
            });
        }
        let cells = state.frame_count_total();
        self.total_frames = self.total_frames.checked_add(cells).ok_or_else(|| {
            DmiError::TooManyFrames(u64::from(self.total_frames) + u64::from(cells))
        })?;
        self.states.push(state);
        Ok(())
    }
}
