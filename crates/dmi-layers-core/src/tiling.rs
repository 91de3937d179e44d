//! Frame tiling arithmetic for packed sprite sheets.
//!
//! Every frame of a DMI container lives in a uniform, row-major grid of
//! equally sized cells. This module maps a linear frame number to the pixel
//! position of its cell and defines the canonical order in which frames are
//! numbered.
//!
//! # Canonical Order
//!
//! Frames are numbered by walking:
//! 1. States in container order
//! 2. Animation frames `0..frames` of the state
//! 3. Directions `0..dirs` of each frame
//!
//! A single counter spans the whole container and restarts at 0 for every
//! pipeline run. [`canonical_slots`] yields that counter explicitly, so no
//! caller needs to keep one of its own.

use crate::dmi::DmiFile;

/// Compute the top-left pixel offset of a frame inside a packed sheet.
///
/// `frames_per_row` is `total_width / frame_width` using integer division,
/// so any remainder columns on the right edge are never addressed.
///
/// No bounds checking is performed: a frame number past the last row yields
/// an offset outside the sheet. Use [`locate_frame`] when the result must be
/// validated. `frame_width` must be non-zero and no wider than `total_width`.
///
/// # Example
///
/// ```
/// use dmi_layers_core::tiling::frame_offset;
///
/// assert_eq!(frame_offset(0, 96, 32, 32, 32), (0, 0));
/// assert_eq!(frame_offset(2, 96, 32, 32, 32), (64, 0));
/// assert_eq!(frame_offset(3, 64, 64, 32, 32), (32, 32));
/// ```
#[inline]
pub fn frame_offset(
    frame_number: u32,
    total_width: u32,
    _total_height: u32,
    frame_width: u32,
    frame_height: u32,
) -> (u32, u32) {
    let per_row = total_width / frame_width;
    let row = frame_number / per_row;
    let col = frame_number % per_row;
    (col * frame_width, row * frame_height)
}

/// Number of whole frames that fit in one row of a sheet.
///
/// Returns 0 when the frame is wider than the sheet or has zero width.
#[inline]
pub fn frames_per_row(total_width: u32, frame_width: u32) -> u32 {
    if frame_width == 0 {
        return 0;
    }
    total_width / frame_width
}

/// A frame cell inside a sheet, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameRect {
    /// Check whether the cell lies entirely inside a `width x height` buffer.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        // u64 so that offsets near u32::MAX cannot wrap
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

/// Locate a frame cell and verify it lies inside the sheet.
///
/// Returns `None` if the frame size is zero, wider than the sheet, or if the
/// computed cell extends past the right or bottom edge.
pub fn locate_frame(
    frame_number: u32,
    total_width: u32,
    total_height: u32,
    frame_width: u32,
    frame_height: u32,
) -> Option<FrameRect> {
    if frame_height == 0 || frames_per_row(total_width, frame_width) == 0 {
        return None;
    }

    let per_row = total_width / frame_width;
    let x = (frame_number % per_row) * frame_width;
    let y = u64::from(frame_number / per_row) * u64::from(frame_height);
    if y > u64::from(u32::MAX) {
        return None;
    }

    let rect = FrameRect {
        x,
        y: y as u32,
        width: frame_width,
        height: frame_height,
    };
    rect.fits_within(total_width, total_height).then_some(rect)
}

/// Side length of the square grid used when synthesizing a sheet from
/// `count` cells: the smallest `k` with `k * k >= count`.
///
/// This is `ceil(sqrt(count))`, computed without floating point.
pub fn synthesis_grid(count: u32) -> u32 {
    if count == 0 {
        return 0;
    }
    let mut k = (count as f64).sqrt() as u32;
    while u64::from(k) * u64::from(k) < u64::from(count) {
        k += 1;
    }
    while k > 1 && u64::from(k - 1) * u64::from(k - 1) >= u64::from(count) {
        k -= 1;
    }
    k
}

/// Column and row count of a freshly packed sheet holding `total_frames`.
///
/// Always at least 1x1 so that an empty container still produces a valid
/// image.
pub fn sheet_grid(total_frames: u32) -> (u32, u32) {
    let columns = synthesis_grid(total_frames).max(1);
    let rows = total_frames.div_ceil(columns).max(1);
    (columns, rows)
}

/// Total number of frame cells a container occupies:
/// the sum of `frames * dirs` over all states.
///
/// The running total is checked as states are added, so this never wraps.
pub fn total_frame_count(dmi: &DmiFile) -> u32 {
    dmi.total_frames()
}

/// Number of whole frame cells a sheet can hold.
///
/// Frames `0..capacity` are exactly the ones [`locate_frame`] places inside
/// the sheet.
pub fn frame_capacity(
    total_width: u32,
    total_height: u32,
    frame_width: u32,
    frame_height: u32,
) -> u64 {
    if frame_height == 0 {
        return 0;
    }
    u64::from(frames_per_row(total_width, frame_width)) * u64::from(total_height / frame_height)
}

/// One step of the canonical frame walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    /// Index of the owning state in container order.
    pub state_index: usize,
    /// Animation frame within the state.
    pub frame: u32,
    /// Direction index within the frame.
    pub direction: u32,
    /// Container-wide frame number, the input to [`frame_offset`].
    pub frame_number: u32,
}

/// Iterator over every frame of a container in canonical order.
///
/// The iterator owns a copy of each state's shape, so the container can be
/// mutated while slots are consumed.
#[derive(Debug, Clone)]
pub struct FrameSlots {
    shapes: Vec<(u32, u32)>,
    state_index: usize,
    frame: u32,
    direction: u32,
    frame_number: u32,
}

impl FrameSlots {
    /// Build a walk over explicit `(frames, dirs)` shapes.
    pub fn from_shapes(shapes: Vec<(u32, u32)>) -> Self {
        Self {
            shapes,
            state_index: 0,
            frame: 0,
            direction: 0,
            frame_number: 0,
        }
    }
}

impl Iterator for FrameSlots {
    type Item = FrameSlot;

    fn next(&mut self) -> Option<FrameSlot> {
        loop {
            let &(frames, dirs) = self.shapes.get(self.state_index)?;
            if self.frame >= frames || dirs == 0 {
                self.state_index += 1;
                self.frame = 0;
                self.direction = 0;
                continue;
            }

            let slot = FrameSlot {
                state_index: self.state_index,
                frame: self.frame,
                direction: self.direction,
                frame_number: self.frame_number,
            };

            self.frame_number += 1;
            self.direction += 1;
            if self.direction >= dirs {
                self.direction = 0;
                self.frame += 1;
            }
            return Some(slot);
        }
    }
}

/// Walk every frame of `dmi` in canonical order.
pub fn canonical_slots(dmi: &DmiFile) -> FrameSlots {
    FrameSlots::from_shapes(
        dmi.states()
            .iter()
            .map(|state| (state.frames(), state.dir_count()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmi::{DirectionDepth, DmiState};

    #[test]
    fn test_offset_first_frame_is_origin() {
        assert_eq!(frame_offset(0, 128, 64, 32, 32), (0, 0));
    }

    #[test]
    fn test_offset_single_row() {
        // 2 states: A (2 frames), B (1 frame), 32x32 on a 96x32 sheet
        assert_eq!(frame_offset(0, 96, 32, 32, 32), (0, 0));
        assert_eq!(frame_offset(1, 96, 32, 32, 32), (32, 0));
        assert_eq!(frame_offset(2, 96, 32, 32, 32), (64, 0));
    }

    #[test]
    fn test_offset_wraps_rows() {
        assert_eq!(frame_offset(2, 64, 64, 32, 32), (0, 32));
        assert_eq!(frame_offset(3, 64, 64, 32, 32), (32, 32));
    }

    #[test]
    fn test_offset_ignores_remainder_columns() {
        // 100 / 32 = 3 frames per row, 4 spare pixels never addressed
        assert_eq!(frame_offset(3, 100, 64, 32, 32), (0, 32));
    }

    #[test]
    fn test_offset_non_square_frames() {
        assert_eq!(frame_offset(5, 48, 64, 16, 8), (32, 8));
    }

    #[test]
    fn test_frames_per_row_zero_width() {
        assert_eq!(frames_per_row(64, 0), 0);
        assert_eq!(frames_per_row(16, 32), 0);
        assert_eq!(frames_per_row(100, 32), 3);
    }

    #[test]
    fn test_locate_frame_in_bounds() {
        let rect = locate_frame(3, 64, 64, 32, 32).unwrap();
        assert_eq!(
            rect,
            FrameRect {
                x: 32,
                y: 32,
                width: 32,
                height: 32
            }
        );
    }

    #[test]
    fn test_locate_frame_past_last_row() {
        assert!(locate_frame(4, 64, 64, 32, 32).is_none());
    }

    #[test]
    fn test_locate_frame_degenerate_sizes() {
        assert!(locate_frame(0, 64, 64, 0, 32).is_none());
        assert!(locate_frame(0, 64, 64, 32, 0).is_none());
        assert!(locate_frame(0, 16, 64, 32, 32).is_none());
        assert!(locate_frame(0, 64, 16, 32, 32).is_none());
    }

    #[test]
    fn test_frame_capacity() {
        assert_eq!(frame_capacity(96, 32, 32, 32), 3);
        assert_eq!(frame_capacity(70, 70, 32, 32), 4);
        assert_eq!(frame_capacity(31, 64, 32, 32), 0);
        assert_eq!(frame_capacity(64, 64, 0, 32), 0);
        assert_eq!(frame_capacity(64, 64, 32, 0), 0);
        // 1x1 cells on the largest sheet exceed u32
        assert_eq!(
            frame_capacity(u32::MAX, u32::MAX, 1, 1),
            u64::from(u32::MAX) * u64::from(u32::MAX)
        );
    }

    #[test]
    fn test_synthesis_grid() {
        assert_eq!(synthesis_grid(0), 0);
        assert_eq!(synthesis_grid(1), 1);
        assert_eq!(synthesis_grid(2), 2);
        assert_eq!(synthesis_grid(4), 2);
        assert_eq!(synthesis_grid(5), 3);
        assert_eq!(synthesis_grid(9), 3);
        assert_eq!(synthesis_grid(10), 4);
        assert_eq!(synthesis_grid(u32::MAX), 65536);
    }

    #[test]
    fn test_sheet_grid() {
        assert_eq!(sheet_grid(0), (1, 1));
        assert_eq!(sheet_grid(1), (1, 1));
        assert_eq!(sheet_grid(3), (2, 2));
        assert_eq!(sheet_grid(5), (3, 2));
        assert_eq!(sheet_grid(9), (3, 3));
    }

    #[test]
    fn test_canonical_order_frame_then_direction() {
        let slots: Vec<_> = FrameSlots::from_shapes(vec![(2, 4), (1, 1)]).collect();
        assert_eq!(slots.len(), 9);

        // frame 0 of state 0 covers directions 0..4 first
        assert_eq!((slots[0].frame, slots[0].direction), (0, 0));
        assert_eq!((slots[3].frame, slots[3].direction), (0, 3));
        assert_eq!((slots[4].frame, slots[4].direction), (1, 0));

        let last = slots[8];
        assert_eq!(last.state_index, 1);
        assert_eq!(last.frame_number, 8);

        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.frame_number, i as u32);
        }
    }

    #[test]
    fn test_canonical_slots_skip_empty_shapes() {
        let slots: Vec<_> = FrameSlots::from_shapes(vec![(0, 1), (1, 0), (1, 1)]).collect();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].state_index, 2);
        assert_eq!(slots[0].frame_number, 0);
    }

    #[test]
    fn test_canonical_slots_over_container() {
        let mut dmi = DmiFile::new(32, 32);
        dmi.add_state(DmiState::new("walk", DirectionDepth::Four, 2, 32, 32).unwrap())
            .unwrap();
        dmi.add_state(DmiState::new("idle", DirectionDepth::One, 1, 32, 32).unwrap())
            .unwrap();

        assert_eq!(total_frame_count(&dmi), 9);
        assert_eq!(canonical_slots(&dmi).count(), 9);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
