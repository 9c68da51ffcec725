use std::ops::{Add, Sub};

/// A point in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Target {
    pub x: f64,
    pub y: f64,
}

impl Target {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Target {
    type Output = Target;
    fn add(self, rhs: Target) -> Target {
        Target::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Target {
    type Output = Target;
    fn sub(self, rhs: Target) -> Target {
        Target::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Camera of one view: where it looks, how far it is zoomed and which
/// external request produced it.
///
/// `zoom` is a base-2 exponent: one image pixel covers `2^zoom` screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub target: Target,
    pub zoom: f64,
    pub version: u64,
}

impl CameraState {
    pub fn new(target: Target, zoom: f64, version: u64) -> Self {
        Self {
            target,
            zoom,
            version,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.target.is_finite() && self.zoom.is_finite()
    }

    /// Screen pixels per image pixel.
    pub fn scale(&self) -> f64 {
        self.zoom.exp2()
    }
}
