use log::{trace, warn};

use crate::accel::{AcceleratorDriver, KernelSizeCode, STATUS_ACK};
use crate::error::AcceleratorError;
use crate::packing::{self, LaneOrder};
use crate::tiling::TileType;

/// In-process stand-in for the convolution accelerator. It performs the
/// same integer MAC the hardware does: Q8.8 x Q8.8 products accumulated in
/// i32, arithmetic-shifted back to Q8.8, with the low 16 bits stored and a
/// per-cell overflow bit raised when the shifted sum leaves the i16 range.
///
/// The tile type tells the MAC how the input window is aligned: flush-edge
/// tiles shift the window against the feature-map boundary, and taps that
/// would fall outside the frame on a flushed side contribute zero.
pub struct ModelAccelerator {
    tile_size: usize,
    kernel_size: Option<usize>,
    kernel: Vec<i16>,
    input_tile: Vec<i16>,
    input_loaded: bool,
}

impl ModelAccelerator {
    /// The 64-bit compute result register carries one overflow bit per
    /// output cell, so `tile_size * tile_size` must not exceed 64.
    pub fn new(tile_size: usize) -> Self {
        assert!(
            tile_size * tile_size <= 64,
            "tile {tile_size}x{tile_size} has more cells than the 64-bit overflow bitmap"
        );
        Self {
            tile_size,
            kernel_size: None,
            kernel: Vec::new(),
            input_tile: Vec::new(),
            input_loaded: false,
        }
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    fn input_tile_side(&self, kernel_size: usize) -> usize {
        self.tile_size + kernel_size - 1
    }
}

impl Default for ModelAccelerator {
    fn default() -> Self {
        Self::new(8)
    }
}

/// How one axis of the loaded window relates to the feature map: where the
/// output cell sits inside the window, and which side (if any) may have
/// taps outside the frame.
#[derive(Clone, Copy)]
struct AxisView {
    align: isize,
    clip_low: bool,
    clip_high: bool,
}

fn axis_views(tile_type: TileType, kernel_size: usize) -> (AxisView, AxisView) {
    let pad = (kernel_size / 2) as isize;
    let (row_min, row_max, col_min, col_max) = tile_type.edges();
    let view = |min: bool, max: bool| {
        if min {
            AxisView {
                align: 0,
                clip_low: true,
                clip_high: false,
            }
        } else if max {
            AxisView {
                align: kernel_size as isize - 1,
                clip_low: false,
                clip_high: true,
            }
        } else {
            AxisView {
                align: pad,
                clip_low: false,
                clip_high: false,
            }
        }
    };
    (view(row_min, row_max), view(col_min, col_max))
}

impl AcceleratorDriver for ModelAccelerator {
    fn configure_kernel_size(&mut self, code: KernelSizeCode) -> Result<u64, AcceleratorError> {
        self.kernel_size = Some(code.kernel_size());
        self.kernel.clear();
        self.input_loaded = false;
        Ok(STATUS_ACK)
    }

    fn load_kernel(&mut self, words: &[u64]) -> Result<u64, AcceleratorError> {
        let Some(kernel_size) = self.kernel_size else {
            warn!("kernel load before size configuration");
            return Ok(0);
        };
        let count = kernel_size * kernel_size;
        if words.len() != packing::packed_len(count) {
            warn!(
                "kernel load of {} words, expected {}",
                words.len(),
                packing::packed_len(count)
            );
            return Ok(0);
        }
        self.kernel = packing::unpack(words, LaneOrder::Lsb, count)
            .into_iter()
            .map(|fx| fx as i16)
            .collect();
        Ok(STATUS_ACK)
    }

    fn load_input(&mut self, words: &[u64]) -> Result<u64, AcceleratorError> {
        let Some(kernel_size) = self.kernel_size else {
            warn!("input load before size configuration");
            return Ok(0);
        };
        let side = self.input_tile_side(kernel_size);
        let count = side * side;
        // The input transfer length is a function of the tile geometry, so
        // an exact check catches a host driving a different tile size.
        if words.len() != packing::packed_len(count) {
            warn!(
                "input load of {} words, expected {}",
                words.len(),
                packing::packed_len(count)
            );
            return Ok(0);
        }
        self.input_tile = packing::unpack(words, LaneOrder::Lsb, count)
            .into_iter()
            .map(|fx| fx as i16)
            .collect();
        self.input_loaded = true;
        Ok(STATUS_ACK)
    }

    fn compute(
        &mut self,
        output: &mut [u64],
        tile_type: TileType,
    ) -> Result<u64, AcceleratorError> {
        let t = self.tile_size;
        let expected = packing::packed_len(t * t);
        if output.len() < expected {
            return Err(AcceleratorError::OutputBufferTooSmall {
                expected,
                actual: output.len(),
            });
        }
        let (Some(kernel_size), true) = (self.kernel_size, self.input_loaded) else {
            warn!("compute before kernel/input load, returning zeros");
            output.fill(0);
            return Ok(0);
        };

        let side = self.input_tile_side(kernel_size);
        let pad = (kernel_size / 2) as isize;
        let (rows, cols) = axis_views(tile_type, kernel_size);

        let mut lanes = vec![0u16; t * t];
        let mut bitmap: u64 = 0;
        for tx in 0..t {
            for ty in 0..t {
                let mut acc: i32 = 0;
                for m in 0..kernel_size {
                    for n in 0..kernel_size {
                        let lr = rows.align + (tx + m) as isize - pad;
                        let lc = cols.align + (ty + n) as isize - pad;
                        if (rows.clip_low && lr < 0) || (rows.clip_high && lr >= side as isize) {
                            continue;
                        }
                        if (cols.clip_low && lc < 0) || (cols.clip_high && lc >= side as isize) {
                            continue;
                        }
                        let weight = self.kernel[m * kernel_size + n] as i32;
                        let sample = self.input_tile[lr as usize * side + lc as usize] as i32;
                        acc += weight * sample;
                    }
                }
                // Q16.16 accumulator back to Q8.8; the transfer format keeps
                // the truncated low 16 bits either way.
                let raw = acc >> 8;
                if raw < i16::MIN as i32 || raw > i16::MAX as i32 {
                    bitmap |= 1 << (tx * t + ty);
                }
                lanes[tx * t + ty] = raw as u16;
            }
        }

        packing::pack_into(&lanes, LaneOrder::Lsb, &mut output[..expected]);
        trace!(
            "computed {} tile: overflow bitmap 0x{:016x}",
            tile_type.name(),
            bitmap
        );
        Ok(bitmap)
    }
}
