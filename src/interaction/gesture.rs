//! Drag gesture state machine.
//!
//! ```text
//! Idle ──begin──▶ Dragging ──move──▶ Dragging
//!  ▲                 │
//!  │                 │ up / leave with no buttons / move with no buttons
//!  │                 ▼
//!  └──take────── Committed
//! ```
//!
//! Every move checks the held buttons: a release that happened outside the
//! surface shows up as the next move arriving with no buttons, which ends
//! the drag.

use glam::Vec2;

use super::drag_solver::DragAnchor;
use super::pointer::PointerButtons;

/// What a drag manipulates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragTarget {
    Orbit,
    Pan,
    /// Camera-relative rotation of one bone.
    Rotate { bone: usize },
    /// Drag-to-point on a grabbed anchor.
    Point { anchor: DragAnchor },
}

impl DragTarget {
    /// The bone being posed, if any.
    #[must_use]
    pub fn bone(&self) -> Option<usize> {
        match self {
            Self::Rotate { bone } => Some(*bone),
            Self::Point { anchor } => Some(anchor.bone),
            Self::Orbit | Self::Pan => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging {
        target: DragTarget,
        last: Vec2,
    },
    Committed {
        target: DragTarget,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureUpdate {
    Ignored,
    Moved {
        target: DragTarget,
        position: Vec2,
        delta: Vec2,
    },
    Released {
        target: DragTarget,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DragGesture {
    state: GestureState,
}

impl DragGesture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    #[must_use]
    pub fn target(&self) -> Option<DragTarget> {
        match self.state {
            GestureState::Dragging { target, .. } | GestureState::Committed { target } => Some(target),
            GestureState::Idle => None,
        }
    }

    /// Starts a drag. An unfinished drag is replaced.
    pub fn begin(&mut self, target: DragTarget, position: Vec2) {
        if let GestureState::Dragging { target: previous, .. } = self.state {
            log::debug!("Replacing unfinished drag on {previous:?}");
        }
        self.state = GestureState::Dragging { target, last: position };
    }

    pub fn pointer_move(&mut self, position: Vec2, buttons: PointerButtons) -> GestureUpdate {
        let GestureState::Dragging { target, last } = self.state else {
            return GestureUpdate::Ignored;
        };
        if buttons.is_empty() {
            log::debug!("Pointer moved with no buttons held; releasing drag");
            return self.release();
        }
        self.state = GestureState::Dragging { target, last: position };
        GestureUpdate::Moved {
            target,
            position,
            delta: position - last,
        }
    }

    pub fn pointer_up(&mut self) -> GestureUpdate {
        self.release()
    }

    /// Leaving with a button held keeps the drag alive; the release is
    /// picked up by the next move.
    pub fn pointer_leave(&mut self, buttons: PointerButtons) -> GestureUpdate {
        if buttons.is_empty() {
            self.release()
        } else {
            GestureUpdate::Ignored
        }
    }

    /// Consumes a committed gesture, returning to idle.
    pub fn take_committed(&mut self) -> Option<DragTarget> {
        match self.state {
            GestureState::Committed { target } => {
                self.state = GestureState::Idle;
                Some(target)
            }
            _ => None,
        }
    }

    /// Drops any gesture without committing.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    fn release(&mut self) -> GestureUpdate {
        match self.state {
            GestureState::Dragging { target, .. } => {
                self.state = GestureState::Committed { target };
                GestureUpdate::Released { target }
            }
            _ => GestureUpdate::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_without_buttons_releases() {
        let mut gesture = DragGesture::new();
        gesture.begin(DragTarget::Rotate { bone: 3 }, Vec2::ZERO);

        let update = gesture.pointer_move(Vec2::new(4.0, 2.0), PointerButtons::PRIMARY);
        assert_eq!(
            update,
            GestureUpdate::Moved {
                target: DragTarget::Rotate { bone: 3 },
                position: Vec2::new(4.0, 2.0),
                delta: Vec2::new(4.0, 2.0),
            }
        );

        assert_eq!(gesture.pointer_leave(PointerButtons::PRIMARY), GestureUpdate::Ignored);
        assert!(gesture.is_dragging());

        let update = gesture.pointer_move(Vec2::new(9.0, 9.0), PointerButtons::empty());
        assert!(matches!(update, GestureUpdate::Released { .. }));
        assert!(!gesture.is_dragging());
        assert_eq!(gesture.take_committed(), Some(DragTarget::Rotate { bone: 3 }));
        assert_eq!(*gesture.state(), GestureState::Idle);
    }

    #[test]
    fn idle_ignores_moves() {
        let mut gesture = DragGesture::new();
        assert_eq!(gesture.pointer_move(Vec2::ONE, PointerButtons::PRIMARY), GestureUpdate::Ignored);
        assert_eq!(gesture.pointer_up(), GestureUpdate::Ignored);
        assert_eq!(gesture.take_committed(), None);
    }
}
