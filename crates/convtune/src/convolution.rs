use num_traits::Float;

use crate::geometry::Geometry;

/// Sequential box convolution, the correctness oracle for every generated
/// kernel.
///
/// `input` must hold `geometry.input_len()` elements (the pre-extended
/// halo included) and `output` must hold `geometry.output_len()`. The
/// accumulated sum of each window is averaged over the filter area.
/// Undersized slices are a caller contract violation and panic on
/// indexing.
pub fn convolution<E: Float>(geometry: &Geometry, input: &[E], output: &mut [E], filter: &[E]) {
    let in_stride = geometry.input_stride() as usize;
    let out_stride = geometry.output_stride() as usize;
    let filter_width = geometry.filter_width as usize;
    let area = E::from(geometry.filter_area()).expect("filter area fits the scalar type");

    for y in 0..geometry.height as usize {
        for x in 0..geometry.width as usize {
            let mut sum = E::zero();
            for f_y in 0..geometry.filter_height as usize {
                for f_x in 0..filter_width {
                    sum = sum
                        + input[((y + f_y) * in_stride) + (x + f_x)]
                            * filter[(f_y * filter_width) + f_x];
                }
            }
            output[(y * out_stride) + x] = sum / area;
        }
    }
}
