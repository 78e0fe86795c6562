use std::sync::Arc;

use parking_lot::Mutex;

use super::picker::{PickRenderer, Viewport};

/// Source of interaction events the picking manager follows
pub trait Interactor {
    /// Display position of the last event, in pixels
    fn event_position(&self) -> (f32, f32);

    /// Counter advanced by every interaction event
    fn event_time(&self) -> u64;

    /// Renderer under display position `(x, y)`
    fn poked_renderer(&self, x: f32, y: f32) -> Option<&dyn PickRenderer>;
}

pub type SharedInteractor = Arc<Mutex<dyn Interactor + Send>>;

/// Interactor over a single viewport, fed with pointer positions
#[derive(Debug, Clone)]
pub struct ViewportInteractor {
    viewport: Viewport,
    position: (f32, f32),
    time: u64,
}

impl ViewportInteractor {
    pub fn new(viewport: Viewport) -> ViewportInteractor {
        ViewportInteractor {
            viewport,
            position: (0.0, 0.0),
            time: 0,
        }
    }

    /// Record a pointer event
    pub fn set_event_position(&mut self, x: f32, y: f32) {
        self.position = (x, y);
        self.time += 1;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        self.time += 1;
        &mut self.viewport
    }
}

impl Interactor for ViewportInteractor {
    fn event_position(&self) -> (f32, f32) {
        self.position
    }

    fn event_time(&self) -> u64 {
        self.time
    }

    fn poked_renderer(&self, x: f32, y: f32) -> Option<&dyn PickRenderer> {
        let res = self.viewport.resolution;
        let inside = (0.0..res.x as f32).contains(&x) && (0.0..res.y as f32).contains(&y);
        if inside {
            Some(&self.viewport)
        } else {
            None
        }
    }
}
