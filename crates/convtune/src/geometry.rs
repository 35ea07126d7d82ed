use derive_new::new;
use serde::{Deserialize, Serialize};

/// Round `value` up to the next multiple of `padding`.
///
/// A `padding` of zero disables rounding. Every row stride in the system,
/// host side and generated code alike, goes through this function.
pub fn pad(value: u32, padding: u32) -> u32 {
    if padding == 0 {
        value
    } else {
        value.next_multiple_of(padding)
    }
}

/// Problem geometry of one run: output extents, filter extents, and the
/// stride-alignment unit applied to every buffer.
///
/// The input buffer is pre-extended with a `filter_width - 1` by
/// `filter_height - 1` halo and the convolution is "valid": output cell
/// `(x, y)` reads input rows `y..y + filter_height` and columns
/// `x..x + filter_width`, with no half-filter offset.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub filter_width: u32,
    pub filter_height: u32,
    pub padding: u32,
}

impl Geometry {
    /// Row stride of the halo-extended input buffer.
    pub fn input_stride(&self) -> u32 {
        pad(self.width + (self.filter_width - 1), self.padding)
    }

    /// Row stride of the output buffer.
    pub fn output_stride(&self) -> u32 {
        pad(self.width, self.padding)
    }

    /// Number of elements in the input buffer, halo rows included.
    pub fn input_len(&self) -> usize {
        ((self.height + (self.filter_height - 1)) * self.input_stride()) as usize
    }

    /// Number of elements in the output buffer, padding columns included.
    pub fn output_len(&self) -> usize {
        (self.height * self.output_stride()) as usize
    }

    pub fn filter_len(&self) -> usize {
        (self.filter_width * self.filter_height) as usize
    }

    /// Filter area, the normalization factor of the box filter.
    pub fn filter_area(&self) -> u32 {
        self.filter_width * self.filter_height
    }

    /// Floating point operations of one full convolution: a multiply and
    /// an add per filter tap, plus the final average per output cell.
    pub fn flop(&self) -> u64 {
        let cells = self.width as u64 * self.height as u64;
        cells * self.filter_width as u64 * self.filter_height as u64 * 2 + cells
    }
}
