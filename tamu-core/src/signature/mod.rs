//! Signature pad state machine.
//!
//! The kiosk UI forwards raw pointer events; this module owns the stroke
//! lifecycle and the backing raster:
//!
//! ```text
//!             press (inside surface)            release
//!    Idle ──────────────────────────▶ Drawing ──────────▶ Idle + Saved(data URI)
//!     ▲                                  │
//!     └──────────────── clear ◀──────────┘
//!            (clear also fires from Idle and wipes the canvas)
//! ```
//!
//! While a stroke is active the pad latches the first pointer id; events
//! from other pointers are ignored until that pointer releases. A pad with
//! no mounted surface ignores everything, so the host can keep forwarding
//! events while the UI is mid-layout without special-casing.

pub mod raster;

use crate::error::Result;
use raster::StrokeCanvas;

/// Coarse pad state, mostly useful for assertions and UI affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadState {
    Idle,
    Drawing,
}

/// Outcome of a completed pad interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureEvent {
    /// A stroke finished; carries the full canvas as a PNG data URI.
    Saved(String),
    /// The canvas was wiped.
    Cleared,
}

struct ActiveStroke {
    pointer: u64,
    last: (f32, f32),
}

/// Pointer-driven signature surface.
pub struct SignaturePad {
    surface: Option<StrokeCanvas>,
    stroke: Option<ActiveStroke>,
}

impl SignaturePad {
    pub fn new() -> Self {
        Self {
            surface: None,
            stroke: None,
        }
    }

    /// Attach a drawing surface of the given pixel size, wiping any previous
    /// ink. A zero-area size leaves the pad unmounted.
    pub fn mount(&mut self, width: u32, height: u32) {
        self.stroke = None;
        if width == 0 || height == 0 {
            self.surface = None;
        } else {
            self.surface = Some(StrokeCanvas::new(width, height));
        }
    }

    /// Detach the surface. All subsequent events are ignored until the next
    /// `mount`.
    pub fn unmount(&mut self) {
        self.surface = None;
        self.stroke = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn state(&self) -> PadState {
        if self.stroke.is_some() {
            PadState::Drawing
        } else {
            PadState::Idle
        }
    }

    /// Pointer down. Starts a stroke when the pad is mounted, idle, and the
    /// point lies inside the surface. No ink lands yet; ink follows movement.
    pub fn press(&mut self, pointer: u64, x: f32, y: f32) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        if self.stroke.is_some() {
            return;
        }
        if x < 0.0 || y < 0.0 || x >= surface.width() as f32 || y >= surface.height() as f32 {
            return;
        }
        self.stroke = Some(ActiveStroke {
            pointer,
            last: (x, y),
        });
    }

    /// Pointer move. Extends the active stroke with a segment from the last
    /// position; segments are clipped at the surface bounds.
    pub fn move_to(&mut self, pointer: u64, x: f32, y: f32) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let Some(stroke) = self.stroke.as_mut() else {
            return;
        };
        if stroke.pointer != pointer {
            return;
        }
        surface.stamp_segment(stroke.last, (x, y));
        stroke.last = (x, y);
    }

    /// Pointer up. Ends the active stroke and emits the whole canvas as a
    /// PNG data URI, even when the pointer never moved. A release without a
    /// matching press is a no-op.
    pub fn release(&mut self, pointer: u64) -> Result<Option<SignatureEvent>> {
        let Some(surface) = self.surface.as_ref() else {
            return Ok(None);
        };
        match self.stroke.as_ref() {
            Some(stroke) if stroke.pointer == pointer => {
                self.stroke = None;
                let uri = surface.to_png_data_uri()?;
                Ok(Some(SignatureEvent::Saved(uri)))
            }
            _ => Ok(None),
        }
    }

    /// Wipe the canvas and cancel any stroke in progress. Valid from both
    /// states; emits `Cleared` whenever a surface is mounted.
    pub fn clear(&mut self) -> Option<SignatureEvent> {
        self.stroke = None;
        let surface = self.surface.as_mut()?;
        surface.clear();
        Some(SignatureEvent::Cleared)
    }

    /// Read-only view of the raster, for tests and previews.
    pub fn canvas(&self) -> Option<&StrokeCanvas> {
        self.surface.as_ref()
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawn_pad() -> SignaturePad {
        let mut pad = SignaturePad::new();
        pad.mount(64, 32);
        pad.press(1, 5.0, 5.0);
        pad.move_to(1, 40.0, 20.0);
        pad
    }

    #[test]
    fn press_draw_release_emits_png_data_uri() {
        let mut pad = drawn_pad();
        let event = pad.release(1).unwrap().unwrap();
        match event {
            SignatureEvent::Saved(uri) => {
                assert!(uri.starts_with("data:image/png;base64,"));
            }
            other => panic!("expected Saved, got {other:?}"),
        }
        assert_eq!(pad.state(), PadState::Idle);
        assert!(!pad.canvas().unwrap().is_blank());
    }

    #[test]
    fn release_without_press_is_a_noop() {
        let mut pad = SignaturePad::new();
        pad.mount(64, 32);
        assert_eq!(pad.release(1).unwrap(), None);
        assert_eq!(pad.state(), PadState::Idle);
    }

    #[test]
    fn press_release_without_movement_still_saves() {
        let mut pad = SignaturePad::new();
        pad.mount(64, 32);
        pad.press(1, 10.0, 10.0);
        let event = pad.release(1).unwrap();
        assert!(matches!(event, Some(SignatureEvent::Saved(_))));
        // No movement means no ink; the saved image is the blank canvas.
        assert!(pad.canvas().unwrap().is_blank());
    }

    #[test]
    fn clear_fires_from_both_states() {
        let mut pad = drawn_pad();
        assert_eq!(pad.state(), PadState::Drawing);
        assert_eq!(pad.clear(), Some(SignatureEvent::Cleared));
        assert_eq!(pad.state(), PadState::Idle);
        assert!(pad.canvas().unwrap().is_blank());

        // And again while idle.
        assert_eq!(pad.clear(), Some(SignatureEvent::Cleared));
    }

    #[test]
    fn unmounted_pad_ignores_everything() {
        let mut pad = SignaturePad::new();
        pad.press(1, 5.0, 5.0);
        pad.move_to(1, 20.0, 20.0);
        assert_eq!(pad.release(1).unwrap(), None);
        assert_eq!(pad.clear(), None);
        assert_eq!(pad.state(), PadState::Idle);
    }

    #[test]
    fn second_pointer_is_ignored_while_drawing() {
        let mut pad = SignaturePad::new();
        pad.mount(64, 32);
        pad.press(1, 5.0, 5.0);
        pad.press(2, 30.0, 10.0);
        pad.move_to(2, 50.0, 25.0);
        assert_eq!(pad.release(2).unwrap(), None);
        assert_eq!(pad.state(), PadState::Drawing);

        // Pointer 2 never inked anything.
        assert!(pad.canvas().unwrap().is_blank());
        assert!(matches!(
            pad.release(1).unwrap(),
            Some(SignatureEvent::Saved(_))
        ));
    }

    #[test]
    fn press_outside_surface_is_ignored() {
        let mut pad = SignaturePad::new();
        pad.mount(64, 32);
        pad.press(1, 100.0, 5.0);
        assert_eq!(pad.state(), PadState::Idle);
        pad.press(1, -1.0, 5.0);
        assert_eq!(pad.state(), PadState::Idle);
    }

    #[test]
    fn remount_wipes_previous_ink() {
        let mut pad = drawn_pad();
        pad.release(1).unwrap();
        pad.mount(64, 32);
        assert!(pad.canvas().unwrap().is_blank());
    }

    #[test]
    fn zero_area_mount_leaves_pad_unmounted() {
        let mut pad = SignaturePad::new();
        pad.mount(0, 32);
        assert!(!pad.is_mounted());
        pad.mount(64, 0);
        assert!(!pad.is_mounted());
    }
}
