use std::sync::atomic::{fence, Ordering};

use log::debug;

use crate::accel::{AcceleratorDriver, KernelSizeCode, STATUS_ACK};
use crate::error::{AcceleratorError, ConfigError, ConvError, ProtocolError};
use crate::fixed;
use crate::map::{FeatureMap, Kernel, OverflowMap};
use crate::packing::{self, LaneOrder};
use crate::reassemble::Reassembler;
use crate::tiling::{Tile, TileGrid};

/// Width of the compute result register; one bit per output-tile cell.
pub const OVERFLOW_BITMAP_BITS: usize = 64;

/// Protocol position of the driver. The accelerator has no illegal-order
/// detection of its own, so the driver refuses out-of-order operations
/// before they reach the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Idle,
    KernelLoaded,
    TileLoaded,
    ComputeDone,
}

impl DriverState {
    fn name(self) -> &'static str {
        match self {
            DriverState::Idle => "idle",
            DriverState::KernelLoaded => "kernel-loaded",
            DriverState::TileLoaded => "tile-loaded",
            DriverState::ComputeDone => "compute-done",
        }
    }
}

/// Result of a full tiled convolution run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvOutput {
    pub output: FeatureMap,
    pub overflow: OverflowMap,
}

/// Drives one accelerator through the kernel-load / tile loop. Owns the
/// reusable packed transfer buffers; each is fully rewritten (zero-filled
/// by the packer) before every reuse so no lane survives from the
/// previous tile.
pub struct TileConvDriver<A: AcceleratorDriver> {
    accel: A,
    grid: TileGrid,
    size_code: KernelSizeCode,
    state: DriverState,
    packed_kernel: Vec<u64>,
    packed_input: Vec<u64>,
    packed_output: Vec<u64>,
    window: Vec<f32>,
    lanes: Vec<u16>,
}

impl<A: AcceleratorDriver> TileConvDriver<A> {
    pub fn new(
        accel: A,
        map_size: usize,
        tile_size: usize,
        kernel_size: usize,
    ) -> Result<Self, ConvError> {
        let size_code = KernelSizeCode::from_kernel_size(kernel_size)?;
        if tile_size != 0 && tile_size * tile_size > OVERFLOW_BITMAP_BITS {
            return Err(ConfigError::TileExceedsBitmap { tile_size }.into());
        }
        let grid = TileGrid::new(map_size, tile_size, kernel_size / 2)?;
        let window_len = grid.input_tile_size() * grid.input_tile_size();
        Ok(Self {
            accel,
            grid,
            size_code,
            state: DriverState::Idle,
            packed_kernel: vec![0; packing::packed_len(kernel_size * kernel_size)],
            packed_input: vec![0; packing::packed_len(window_len)],
            packed_output: vec![0; packing::packed_len(tile_size * tile_size)],
            window: vec![0.0; window_len],
            lanes: vec![0; window_len],
        })
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn into_inner(self) -> A {
        self.accel
    }

    /// Configures the kernel size and transfers the packed kernel. Valid
    /// only at the start of a run.
    pub fn load_kernel(&mut self, kernel: &Kernel) -> Result<(), ConvError> {
        self.expect(&[DriverState::Idle], "kernel load")?;
        if kernel.size() != self.size_code.kernel_size() {
            return Err(ConfigError::KernelSizeMismatch {
                expected: self.size_code.kernel_size(),
                actual: kernel.size(),
            }
            .into());
        }

        let status = self.accel.configure_kernel_size(self.size_code)?;
        if status != STATUS_ACK {
            return Err(AcceleratorError::ConfigureRejected { status }.into());
        }

        let count = kernel.size() * kernel.size();
        for (lane, &weight) in self.lanes.iter_mut().zip(kernel.weights()) {
            *lane = fixed::encode(weight)?;
        }
        packing::pack_into(&self.lanes[..count], LaneOrder::Lsb, &mut self.packed_kernel);

        // The packed buffer must be observable by the accelerator before
        // the load operation is issued.
        fence(Ordering::SeqCst);
        let status = self.accel.load_kernel(&self.packed_kernel)?;
        if status != STATUS_ACK {
            return Err(AcceleratorError::KernelLoadRejected { status }.into());
        }
        self.state = DriverState::KernelLoaded;
        debug!(
            "kernel {}x{} loaded ({} words)",
            kernel.size(),
            kernel.size(),
            self.packed_kernel.len()
        );
        Ok(())
    }

    /// Extracts, encodes, loads, and computes one tile, placing the result
    /// into `out`. Returns the tile's overflow bitmap.
    pub fn process_tile(
        &mut self,
        input: &FeatureMap,
        tile: &Tile,
        out: &mut Reassembler,
    ) -> Result<u64, ConvError> {
        self.expect(
            &[DriverState::KernelLoaded, DriverState::ComputeDone],
            "input load",
        )?;
        if input.size() != self.grid.map_size() {
            return Err(ConfigError::MapSizeMismatch {
                expected: self.grid.map_size(),
                actual: input.size(),
            }
            .into());
        }

        let side = self.grid.input_tile_size();
        input.copy_window(tile.in_row_start, tile.in_col_start, side, &mut self.window);
        for (lane, &sample) in self.lanes.iter_mut().zip(&self.window) {
            *lane = fixed::encode(sample)?;
        }
        packing::pack_into(&self.lanes, LaneOrder::Lsb, &mut self.packed_input);

        fence(Ordering::SeqCst);
        let status = self.accel.load_input(&self.packed_input)?;
        if status != STATUS_ACK {
            return Err(AcceleratorError::InputLoadRejected { status }.into());
        }
        self.state = DriverState::TileLoaded;

        self.packed_output.fill(0);
        fence(Ordering::SeqCst);
        let bitmap = self.accel.compute(&mut self.packed_output, tile.kind)?;
        // The host must not read the output buffer until the compute
        // results are visible.
        fence(Ordering::SeqCst);
        self.state = DriverState::ComputeDone;

        debug!(
            "tile ({},{}) {}: in=({},{}) out=({},{}) overflow=0x{:016x}",
            tile.grid_row,
            tile.grid_col,
            tile.kind.name(),
            tile.in_row_start,
            tile.in_col_start,
            tile.out_row_start,
            tile.out_col_start,
            bitmap
        );
        out.place_tile(tile, &self.packed_output, bitmap);
        Ok(bitmap)
    }

    /// Full run: kernel load, then every tile of the grid in row-major
    /// order. Leaves the driver idle so another run can follow.
    pub fn run(&mut self, input: &FeatureMap, kernel: &Kernel) -> Result<ConvOutput, ConvError> {
        self.load_kernel(kernel)?;
        let mut out = Reassembler::new(self.grid.map_size(), self.grid.tile_size());
        let tiles: Vec<Tile> = self.grid.tiles().collect();
        for tile in &tiles {
            self.process_tile(input, tile, &mut out)?;
        }
        self.state = DriverState::Idle;
        let (output, overflow) = out.finish();
        Ok(ConvOutput { output, overflow })
    }

    fn expect(
        &self,
        allowed: &[DriverState],
        operation: &'static str,
    ) -> Result<(), ProtocolError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ProtocolError::OutOfOrder {
                operation,
                state: self.state.name(),
            })
        }
    }
}

/// Convenience wrapper: one convolution run over a fresh driver.
pub fn convolve_tiled<A: AcceleratorDriver>(
    accel: A,
    input: &FeatureMap,
    kernel: &Kernel,
    tile_size: usize,
) -> Result<ConvOutput, ConvError> {
    let mut driver = TileConvDriver::new(accel, input.size(), tile_size, kernel.size())?;
    driver.run(input, kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelAccelerator;
    use crate::reference;
    use crate::tiling::TileType;

    const TOLERANCE: f32 = 1.0 / 256.0;

    fn assert_maps_match(got: &FeatureMap, expected: &FeatureMap) {
        assert_eq!(got.size(), expected.size());
        for r in 0..got.size() {
            for c in 0..got.size() {
                let g = got.get(r, c);
                let e = expected.get(r, c);
                assert!(
                    (g - e).abs() <= TOLERANCE,
                    "cell ({r},{c}): accelerator {g}, reference {e}"
                );
            }
        }
    }

    #[test]
    fn single_tile_run_matches_reference() {
        let input = FeatureMap::from_fn(8, |r, c| ((r * 8 + c) % 4) as f32);
        let kernel = Kernel::sample_1x1();
        let result = convolve_tiled(ModelAccelerator::new(8), &input, &kernel, 8).unwrap();
        assert!(!result.overflow.any());
        assert_maps_match(&result.output, &reference::convolve(&input, &kernel));
    }

    #[test]
    fn four_by_four_grid_run_matches_reference() {
        let input = FeatureMap::from_fn(32, |r, c| ((r * 32 + c) % 4) as f32);
        let kernel = Kernel::sample_3x3();
        let result = convolve_tiled(ModelAccelerator::new(8), &input, &kernel, 8).unwrap();
        assert!(!result.overflow.any());
        assert_maps_match(&result.output, &reference::convolve(&input, &kernel));
    }

    #[test]
    fn five_by_five_kernel_run_matches_reference() {
        let input = FeatureMap::from_fn(32, |r, c| ((r + 2 * c) % 3) as f32);
        let kernel = Kernel::sample_5x5();
        let result = convolve_tiled(ModelAccelerator::new(8), &input, &kernel, 8).unwrap();
        assert!(!result.overflow.any());
        assert_maps_match(&result.output, &reference::convolve(&input, &kernel));
    }

    #[test]
    fn overflow_cell_is_flagged_and_neighbors_are_not() {
        // 100 * 1.5 = 150 exceeds the 127.996 ceiling of Q8.8.
        let mut input = FeatureMap::from_fn(8, |_, _| 1.0);
        input.set(3, 4, 100.0);
        let kernel = Kernel::sample_1x1();
        let result = convolve_tiled(ModelAccelerator::new(8), &input, &kernel, 8).unwrap();

        assert!(result.overflow.get(3, 4));
        assert_eq!(result.overflow.count(), 1);
        let reference = reference::convolve(&input, &kernel);
        for r in 0..8 {
            for c in 0..8 {
                if (r, c) == (3, 4) {
                    continue;
                }
                assert!((result.output.get(r, c) - reference.get(r, c)).abs() <= TOLERANCE);
            }
        }
    }

    #[test]
    fn out_of_range_sample_aborts_the_run() {
        let mut input = FeatureMap::from_fn(8, |_, _| 0.0);
        input.set(0, 0, 200.0);
        let err = convolve_tiled(ModelAccelerator::new(8), &input, &Kernel::sample_1x1(), 8)
            .unwrap_err();
        assert!(matches!(err, ConvError::FixedPoint(_)));
    }

    #[test]
    fn tile_processing_before_kernel_load_is_a_protocol_violation() {
        let mut driver = TileConvDriver::new(ModelAccelerator::new(8), 32, 8, 3).unwrap();
        let input = FeatureMap::zeroed(32);
        let tile = driver.grid().tile(0, 0);
        let mut out = Reassembler::new(32, 8);
        let err = driver.process_tile(&input, &tile, &mut out).unwrap_err();
        assert_eq!(
            err,
            ConvError::Protocol(ProtocolError::OutOfOrder {
                operation: "input load",
                state: "idle",
            })
        );
    }

    #[test]
    fn double_kernel_load_is_a_protocol_violation() {
        let mut driver = TileConvDriver::new(ModelAccelerator::new(8), 32, 8, 3).unwrap();
        driver.load_kernel(&Kernel::sample_3x3()).unwrap();
        let err = driver.load_kernel(&Kernel::sample_3x3()).unwrap_err();
        assert!(matches!(err, ConvError::Protocol(_)));
    }

    #[test]
    fn driver_is_reusable_after_a_run() {
        let input = FeatureMap::from_fn(16, |r, c| ((r + c) % 3) as f32);
        let kernel = Kernel::sample_3x3();
        let mut driver = TileConvDriver::new(ModelAccelerator::new(8), 16, 8, 3).unwrap();
        let first = driver.run(&input, &kernel).unwrap();
        let second = driver.run(&input, &kernel).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_tile_is_rejected_up_front() {
        let err = TileConvDriver::new(ModelAccelerator::new(8), 32, 16, 3)
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConvError::Config(ConfigError::TileExceedsBitmap { tile_size: 16 })
        );
    }

    #[test]
    fn tile_narrower_than_the_halo_is_rejected_up_front() {
        // A 5x5 kernel's halo is 2; single-cell tiles cannot carry it.
        let err = convolve_tiled(
            ModelAccelerator::new(1),
            &FeatureMap::zeroed(8),
            &Kernel::sample_5x5(),
            1,
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            ConvError::Config(ConfigError::HaloExceedsTile {
                tile_size: 1,
                pad: 2
            })
        );
    }

    #[test]
    fn mismatched_input_map_is_rejected() {
        let mut driver = TileConvDriver::new(ModelAccelerator::new(8), 32, 8, 3).unwrap();
        driver.load_kernel(&Kernel::sample_3x3()).unwrap();
        let tile = driver.grid().tile(0, 0);
        let mut out = Reassembler::new(32, 8);
        let err = driver
            .process_tile(&FeatureMap::zeroed(16), &tile, &mut out)
            .unwrap_err();
        assert_eq!(
            err,
            ConvError::Config(ConfigError::MapSizeMismatch {
                expected: 32,
                actual: 16,
            })
        );
    }

    #[test]
    fn accelerator_with_a_different_tile_size_is_surfaced() {
        // The driver packs for 8-wide tiles but the accelerator expects
        // 4-wide ones; the mis-sized input transfer is not acknowledged.
        let input = FeatureMap::from_fn(32, |r, c| ((r + c) % 3) as f32);
        let err = convolve_tiled(ModelAccelerator::new(4), &input, &Kernel::sample_3x3(), 8)
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConvError::Accelerator(AcceleratorError::InputLoadRejected { status: 0 })
        );
    }

    /// Accelerator that never acknowledges, to exercise the rejection
    /// paths a real transport could hit.
    struct DeafAccelerator;

    impl AcceleratorDriver for DeafAccelerator {
        fn configure_kernel_size(&mut self, _code: KernelSizeCode) -> Result<u64, AcceleratorError> {
            Ok(0)
        }

        fn load_kernel(&mut self, _words: &[u64]) -> Result<u64, AcceleratorError> {
            Ok(0)
        }

        fn load_input(&mut self, _words: &[u64]) -> Result<u64, AcceleratorError> {
            Ok(0)
        }

        fn compute(
            &mut self,
            _output: &mut [u64],
            _tile_type: TileType,
        ) -> Result<u64, AcceleratorError> {
            Ok(0)
        }
    }

    #[test]
    fn unacknowledged_configure_is_surfaced() {
        let mut driver = TileConvDriver::new(DeafAccelerator, 32, 8, 3).unwrap();
        let err = driver.load_kernel(&Kernel::sample_3x3()).unwrap_err();
        assert_eq!(
            err,
            ConvError::Accelerator(AcceleratorError::ConfigureRejected { status: 0 })
        );
    }
}
