//! Pointer input shared between event producers and the frame loop.
//!
//! Producers may live on any thread. The pointer position is a single
//! last-write-wins slot; clicks queue up until the next frame drains them.

use std::sync::{Arc, Mutex, MutexGuard};

use glam::Vec2;

use crate::renderer::viewer::Viewport;

/// Mouse button of a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// A discrete click notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Click {
    pub button: MouseButton,
}

#[derive(Debug, Default)]
struct InputState {
    pointer: Option<Vec2>,
    clicks: Vec<Click>,
}

/// Input sampled at the start of a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFrame {
    /// Latest pointer position in NDC, if the pointer has ever moved.
    pub pointer: Option<Vec2>,
    /// Clicks since the previous drain, oldest first.
    pub clicks: Vec<Click>,
}

/// Cloneable handle for input producers.
#[derive(Debug, Clone, Default)]
pub struct InputSink {
    state: Arc<Mutex<InputState>>,
}

impl InputSink {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking producer leaves plain data behind, so a poisoned lock is
    // still usable.
    fn lock(&self) -> MutexGuard<'_, InputState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store the pointer position in normalized device coordinates.
    pub fn pointer_moved(&self, ndc: Vec2) {
        self.lock().pointer = Some(ndc);
    }

    /// Store the pointer position from window pixels (origin top-left).
    pub fn pointer_moved_px(&self, x: f32, y: f32, viewport: Viewport) {
        self.pointer_moved(viewport.pixel_to_ndc(x, y));
    }

    /// The pointer left the window.
    pub fn pointer_left(&self) {
        self.lock().pointer = None;
    }

    pub fn clicked(&self, button: MouseButton) {
        self.lock().clicks.push(Click { button });
    }

    /// Take queued clicks and read the pointer slot.
    ///
    /// The pointer value stays in place for the next frame.
    pub fn drain(&self) -> InputFrame {
        let mut state = self.lock();
        InputFrame {
            pointer: state.pointer,
            clicks: std::mem::take(&mut state.clicks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_is_last_write_wins() {
        let sink = InputSink::new();
        assert_eq!(sink.drain().pointer, None);

        sink.pointer_moved(Vec2::new(0.1, 0.2));
        sink.pointer_moved(Vec2::new(-0.5, 0.5));
        assert_eq!(sink.drain().pointer, Some(Vec2::new(-0.5, 0.5)));
        // Still there next frame.
        assert_eq!(sink.drain().pointer, Some(Vec2::new(-0.5, 0.5)));

        sink.pointer_left();
        assert_eq!(sink.drain().pointer, None);
    }

    #[test]
    fn test_clicks_queue_and_drain_once() {
        let sink = InputSink::new();
        let producer = sink.clone();
        std::thread::spawn(move || {
            producer.clicked(MouseButton::Left);
            producer.clicked(MouseButton::Right);
        })
        .join()
        .unwrap();

        let frame = sink.drain();
        assert_eq!(
            frame.clicks,
            vec![
                Click { button: MouseButton::Left },
                Click { button: MouseButton::Right }
            ]
        );
        assert!(sink.drain().clicks.is_empty());
    }

    #[test]
    fn test_pixel_position_converted_to_ndc() {
        let sink = InputSink::new();
        sink.pointer_moved_px(0.0, 0.0, Viewport::new(800, 600));
        assert_eq!(sink.drain().pointer, Some(Vec2::new(-1.0, 1.0)));
    }
}
