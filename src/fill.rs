//! Canvas flood fill for the coloring exercise
//!
//! Pixels are packed `0xAARRGGBB`. Similarity ignores alpha.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Tolerance used by the coloring canvas
pub const DEFAULT_FILL_TOLERANCE: u32 = 12;

/// Row-major ARGB pixel buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// A buffer of `width * height` pixels set to `color`
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u32>) -> Result<Self, ComputeError> {
        if pixels.len() != width * height {
            return Err(ComputeError::ParseError(format!(
                "expected {} pixels for {width}x{height}, got {}",
                width * height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn set(&mut self, x: usize, y: usize, color: u32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }
}

/// Sum of absolute RGB channel differences
pub fn color_distance(a: u32, b: u32) -> u32 {
    [16u32, 8, 0]
        .iter()
        .map(|shift| {
            let ca = (a >> shift) & 0xFF;
            let cb = (b >> shift) & 0xFF;
            ca.abs_diff(cb)
        })
        .sum()
}

/// Paint the 4-connected region similar to the seed pixel with `new_color`.
///
/// Returns the number of pixels painted. A seed outside the buffer, or one
/// already equal to `new_color`, paints nothing.
pub fn flood_fill(
    buffer: &mut PixelBuffer,
    x: usize,
    y: usize,
    new_color: u32,
    tolerance: u32,
) -> usize {
    let Some(start) = buffer.index(x, y) else {
        return 0;
    };
    let base = buffer.pixels[start];
    if base == new_color {
        return 0;
    }

    let width = buffer.width;
    let mut visited = vec![false; buffer.pixels.len()];
    let mut stack = vec![start];
    let mut painted = 0;

    while let Some(idx) = stack.pop() {
        if visited[idx] || color_distance(buffer.pixels[idx], base) > tolerance {
            continue;
        }
        visited[idx] = true;
        buffer.pixels[idx] = new_color;
        painted += 1;

        let col = idx % width;
        if col > 0 {
            stack.push(idx - 1);
        }
        if col + 1 < width {
            stack.push(idx + 1);
        }
        if idx >= width {
            stack.push(idx - width);
        }
        if idx + width < buffer.pixels.len() {
            stack.push(idx + width);
        }
    }

    tracing::debug!(x, y, painted, "flood fill");
    painted
}
