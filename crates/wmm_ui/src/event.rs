use std::time::Duration;

use web_time::Instant;

use crate::Point;

/// Taps further apart than this never count as a double tap.
pub const DEFAULT_DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);

/// Maximum pointer travel (screen pixels) between taps of one multi-tap.
const TAP_POSITION_THRESHOLD: f32 = 10.0;

/// Events that views and the surface respond to.
#[derive(Debug, Clone)]
pub enum Event {
    /// Mouse button pressed.
    MousePressed {
        button: MouseButton,
        position: Point,
        modifiers: Modifiers,
    },
    /// Mouse button released.
    MouseReleased {
        button: MouseButton,
        position: Point,
        modifiers: Modifiers,
    },
    /// Mouse moved.
    MouseMoved { position: Point },
    /// Mouse wheel scrolled.
    MouseWheel { delta: f32, position: Point },
    /// Keyboard key pressed.
    KeyPressed { key: Key, modifiers: Modifiers },
    /// Keyboard key released.
    KeyReleased { key: Key, modifiers: Modifiers },
}

impl Event {
    /// Pointer position for pointer events.
    pub fn position(&self) -> Option<Point> {
        match self {
            Event::MousePressed { position, .. }
            | Event::MouseReleased { position, .. }
            | Event::MouseMoved { position }
            | Event::MouseWheel { position, .. } => Some(*position),
            Event::KeyPressed { .. } | Event::KeyReleased { .. } => None,
        }
    }
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Keyboard keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Space,
    Up,
    Down,
    Left,
    Right,
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Default::default()
        }
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Default::default()
        }
    }
}

/// Counts consecutive taps so a double click can be told apart from a click.
#[derive(Debug, Clone)]
pub struct TapTracker {
    window: Duration,
    last: Option<(Instant, Point)>,
    count: u32,
}

impl Default for TapTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DOUBLE_TAP_WINDOW)
    }
}

impl TapTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            count: 0,
        }
    }

    /// Record a tap and return how many taps form the current sequence.
    pub fn register(&mut self, position: Point, at: Instant) -> u32 {
        let continues = self.last.is_some_and(|(time, prev)| {
            at.checked_duration_since(time)
                .is_some_and(|elapsed| elapsed <= self.window)
                && (position.x - prev.x).abs() <= TAP_POSITION_THRESHOLD
                && (position.y - prev.y).abs() <= TAP_POSITION_THRESHOLD
        });

        self.count = if continues { self.count + 1 } else { 1 };
        self.last = Some((at, position));
        self.count
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_tap_inside_window_is_double() {
        let mut taps = TapTracker::default();
        let t0 = Instant::now();
        assert_eq!(taps.register(Point::new(5.0, 5.0), t0), 1);
        assert_eq!(
            taps.register(Point::new(6.0, 5.0), t0 + Duration::from_millis(120)),
            2
        );
    }

    #[test]
    fn test_tap_after_window_starts_over() {
        let mut taps = TapTracker::default();
        let t0 = Instant::now();
        taps.register(Point::new(5.0, 5.0), t0);
        assert_eq!(
            taps.register(Point::new(5.0, 5.0), t0 + Duration::from_millis(800)),
            1
        );
    }

    #[test]
    fn test_tap_far_away_starts_over() {
        let mut taps = TapTracker::default();
        let t0 = Instant::now();
        taps.register(Point::new(5.0, 5.0), t0);
        assert_eq!(
            taps.register(Point::new(50.0, 5.0), t0 + Duration::from_millis(50)),
            1
        );
    }
}
