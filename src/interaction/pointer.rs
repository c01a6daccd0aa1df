use bitflags::bitflags;
use glam::Vec2;

bitflags! {
    /// Buttons held during a pointer event, using the DOM `buttons` bit layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerButtons: u8 {
        const PRIMARY   = 1 << 0;
        const SECONDARY = 1 << 1;
        const AUXILIARY = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Leave,
}

/// A pointer event in viewport pixels (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Vec2,
    /// Buttons still held after the event.
    pub buttons: PointerButtons,
}

impl PointerEvent {
    #[must_use]
    pub fn down(position: Vec2, buttons: PointerButtons) -> Self {
        Self {
            kind: PointerEventKind::Down,
            position,
            buttons,
        }
    }

    #[must_use]
    pub fn moved(position: Vec2, buttons: PointerButtons) -> Self {
        Self {
            kind: PointerEventKind::Move,
            position,
            buttons,
        }
    }

    #[must_use]
    pub fn up(position: Vec2) -> Self {
        Self {
            kind: PointerEventKind::Up,
            position,
            buttons: PointerButtons::empty(),
        }
    }

    #[must_use]
    pub fn leave(position: Vec2, buttons: PointerButtons) -> Self {
        Self {
            kind: PointerEventKind::Leave,
            position,
            buttons,
        }
    }
}
