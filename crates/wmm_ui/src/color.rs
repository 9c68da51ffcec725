//! 8-bit colors used for channels and overlay styling.

use serde::{Deserialize, Serialize};

/// A channel color as an RGB triple.
pub type Rgb = [u8; 3];

/// An RGBA color with 8-bit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Build a color from a 3- or 4-component slice. Anything else is rejected.
    pub fn from_components(components: &[u8]) -> Option<Self> {
        match *components {
            [r, g, b] => Some(Self::rgb(r, g, b)),
            [r, g, b, a] => Some(Self::rgba(r, g, b, a)),
            _ => None,
        }
    }

    /// Replace the alpha component.
    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.a = alpha;
        self
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<Rgb> for Color {
    fn from([r, g, b]: Rgb) -> Self {
        Self::rgb(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_components() {
        assert_eq!(Color::from_components(&[1, 2, 3]), Some(Color::rgba(1, 2, 3, 255)));
        assert_eq!(Color::from_components(&[1, 2, 3, 4]), Some(Color::rgba(1, 2, 3, 4)));
        assert_eq!(Color::from_components(&[1, 2]), None);
    }
}
