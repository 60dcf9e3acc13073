//! Packed bitmaps.

/// A packed bitmap with `n` bits per pixel.
///
/// Rows are padded to a 32-bit boundary, so the stride in bytes is
/// `((n * width + 31) & !31) / 8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    n: u32,
    xres: u32,
    yres: u32,
    samples: Vec<u8>,
}

/// Dimensions reported by [`Bitmap::details`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitmapDetails {
    pub width: u32,
    pub height: u32,
    pub n: u32,
    /// Bytes per row.
    pub stride: usize,
}

impl Bitmap {
    /// Create a zero-filled bitmap.
    pub fn new(width: u32, height: u32, n: u32, xres: u32, yres: u32) -> Self {
        let stride = Self::stride_for(width, n);
        Self {
            width,
            height,
            n,
            xres,
            yres,
            samples: vec![0; stride * height as usize],
        }
    }

    fn stride_for(width: u32, n: u32) -> usize {
        let bits = u64::from(n) * u64::from(width);
        (((bits + 31) & !31) / 8) as usize
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        Self::stride_for(self.width, self.n)
    }

    /// Horizontal and vertical resolution in dpi.
    pub fn resolution(&self) -> (u32, u32) {
        (self.xres, self.yres)
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn details(&self) -> BitmapDetails {
        BitmapDetails {
            width: self.width,
            height: self.height,
            n: self.n,
            stride: self.stride(),
        }
    }
}
