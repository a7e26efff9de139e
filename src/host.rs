use std::cell::Cell;

/// Live pointer coordinates supplied by the host display/input layer.
pub trait PointerSource {
    fn pointer_position(&self) -> (i32, i32);
}

/// Pointer position shared between the frontend, which updates it as host
/// input arrives, and the emulated devices that sample it.
#[derive(Debug, Default)]
pub struct HostPointer {
    x: Cell<i32>,
    y: Cell<i32>,
}

impl HostPointer {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x: Cell::new(x),
            y: Cell::new(y),
        }
    }

    pub fn set_position(&self, x: i32, y: i32) {
        self.x.set(x);
        self.y.set(y);
    }

    pub fn move_by(&self, dx: i32, dy: i32) {
        self.x.set(self.x.get().wrapping_add(dx));
        self.y.set(self.y.get().wrapping_add(dy));
    }
}

impl PointerSource for HostPointer {
    fn pointer_position(&self) -> (i32, i32) {
        (self.x.get(), self.y.get())
    }
}
