use crate::error::ConfigError;

pub const SUPPORTED_KERNEL_SIZES: [usize; 3] = [1, 3, 5];

/// Square row-major grid of real-valued samples.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMap {
    size: usize,
    data: Vec<f32>,
}

impl FeatureMap {
    pub fn zeroed(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    pub fn from_values(size: usize, data: Vec<f32>) -> Result<Self, ConfigError> {
        if data.len() != size * size {
            return Err(ConfigError::MapDataSizeMismatch {
                size,
                actual: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    pub fn from_fn(size: usize, mut sample: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                data.push(sample(row, col));
            }
        }
        Self { size, data }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.size + col] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copies the `side`x`side` window starting at (`row_start`, `col_start`)
    /// into `dst`, row-major. The scheduler guarantees windows stay in
    /// bounds, so a violation here is a programming error.
    pub fn copy_window(&self, row_start: usize, col_start: usize, side: usize, dst: &mut [f32]) {
        assert!(
            row_start + side <= self.size && col_start + side <= self.size,
            "window {side}x{side} at ({row_start},{col_start}) leaves {}x{} map",
            self.size,
            self.size
        );
        assert_eq!(dst.len(), side * side);
        for tx in 0..side {
            let src_row = (row_start + tx) * self.size + col_start;
            dst[tx * side..(tx + 1) * side].copy_from_slice(&self.data[src_row..src_row + side]);
        }
    }
}

/// Square grid of convolution weights, side 1, 3, or 5.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
}

impl Kernel {
    pub fn new(size: usize, weights: Vec<f32>) -> Result<Self, ConfigError> {
        if !SUPPORTED_KERNEL_SIZES.contains(&size) {
            return Err(ConfigError::UnsupportedKernelSize(size));
        }
        if weights.len() != size * size {
            return Err(ConfigError::KernelWeightCountMismatch {
                size,
                actual: weights.len(),
            });
        }
        Ok(Self { size, weights })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Halo width on each side of an output cell.
    pub fn pad(&self) -> usize {
        self.size / 2
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.weights[row * self.size + col]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn sample_1x1() -> Self {
        Self {
            size: 1,
            weights: vec![1.5],
        }
    }

    pub fn sample_3x3() -> Self {
        Self {
            size: 3,
            weights: vec![
                1.0, 5.0, -1.0,
                2.0, 0.5, -2.0,
                3.0, 0.5, -3.0,
            ],
        }
    }

    pub fn sample_5x5() -> Self {
        Self {
            size: 5,
            weights: vec![
                1.0, 5.0, -1.0, 0.5, 1.0,
                2.0, 0.5, -2.0, 0.5, 2.0,
                3.0, 0.5, -3.0, 0.5, 3.0,
                2.0, 0.5, -2.0, 0.5, 2.0,
                1.0, 0.5, -1.0, 0.5, 1.0,
            ],
        }
    }
}

/// Boolean grid parallel to an output map; a set cell means the raw
/// fixed-point result did not fit the transfer format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowMap {
    size: usize,
    flags: Vec<bool>,
}

impl OverflowMap {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            flags: vec![false; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.flags[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize) {
        self.flags[row * self.size + col] = true;
    }

    pub fn any(&self) -> bool {
        self.flags.iter().any(|&f| f)
    }

    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    /// Coordinates of all flagged cells, row-major.
    pub fn flagged_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, &f)| f)
            .map(|(idx, _)| (idx / self.size, idx % self.size))
    }
}
