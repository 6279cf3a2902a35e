//! Integer pixel geometry and packed colors

/// Size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Size {
    /// Create a size
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero or negative
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Same size with width and height exchanged
    pub const fn transposed(&self) -> Self {
        Self { width: self.height, height: self.width }
    }
}

/// Axis-aligned rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Rect {
    /// Create a rectangle
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin with the given size
    pub const fn from_size(size: Size) -> Self {
        Self { x: 0, y: 0, width: size.width, height: size.height }
    }

    /// Width in pixels
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Set the width, keeping the origin
    pub fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    /// Set the height, keeping the origin
    pub fn set_height(&mut self, height: i32) {
        self.height = height;
    }

    /// Size of the rectangle
    pub const fn size(&self) -> Size {
        Size { width: self.width, height: self.height }
    }

    /// True when the rectangle covers no pixels
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Packed `0xAARRGGBB` color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self(0x0000_0000);
    /// Opaque black
    pub const BLACK: Self = Self(0xFF00_0000);
    /// Opaque white
    pub const WHITE: Self = Self(0xFFFF_FFFF);

    /// Pack a color from its channels
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Alpha channel
    pub const fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel
    pub const fn red(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel
    pub const fn green(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel
    pub const fn blue(&self) -> u8 {
        self.0 as u8
    }

    /// True when the alpha channel is zero
    pub const fn is_transparent(&self) -> bool {
        self.alpha() == 0
    }
}
