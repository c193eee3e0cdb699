use crate::map::{FeatureMap, Kernel};

/// Plain floating-point 2D convolution with boundary clipping: taps that
/// fall outside the frame contribute nothing. This is the correctness
/// baseline the tiled accelerator path is compared against; it never runs
/// in the driver loop.
pub fn convolve(input: &FeatureMap, kernel: &Kernel) -> FeatureMap {
    let size = input.size();
    let k = kernel.size();
    let pad = kernel.pad() as isize;

    FeatureMap::from_fn(size, |i, j| {
        let mut sum = 0.0f32;
        for m in 0..k {
            for n in 0..k {
                let x = i as isize + m as isize - pad;
                let y = j as isize + n as isize - pad;
                if x >= 0 && x < size as isize && y >= 0 && y < size as isize {
                    sum += kernel.get(m, n) * input.get(x as usize, y as usize);
                }
            }
        }
        sum
    })
}
