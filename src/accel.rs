use crate::error::{AcceleratorError, ConfigError};
use crate::tiling::TileType;

/// Acknowledge value returned by load-type operations.
pub const STATUS_ACK: u64 = 1;

/// Wire encoding of the supported kernel sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KernelSizeCode {
    Size1x1 = 0,
    Size3x3 = 1,
    Size5x5 = 2,
}

impl KernelSizeCode {
    pub fn from_kernel_size(size: usize) -> Result<Self, ConfigError> {
        match size {
            1 => Ok(KernelSizeCode::Size1x1),
            3 => Ok(KernelSizeCode::Size3x3),
            5 => Ok(KernelSizeCode::Size5x5),
            other => Err(ConfigError::UnsupportedKernelSize(other)),
        }
    }

    pub const fn as_u64(self) -> u64 {
        self as u64
    }

    pub const fn kernel_size(self) -> usize {
        match self {
            KernelSizeCode::Size1x1 => 1,
            KernelSizeCode::Size3x3 => 3,
            KernelSizeCode::Size5x5 => 5,
        }
    }
}

/// Synchronous call boundary to the convolution accelerator. Every
/// operation blocks until the accelerator's result register comes back;
/// there is no pipelining, cancellation, or timeout. The caller owns
/// ordering (kernel before input, input before compute) and memory
/// visibility barriers around the shared buffers.
pub trait AcceleratorDriver {
    /// One-shot per run. Returns the status register value.
    fn configure_kernel_size(&mut self, code: KernelSizeCode) -> Result<u64, AcceleratorError>;

    /// Transfers the packed kernel words. Returns the 0/1 acknowledge.
    fn load_kernel(&mut self, words: &[u64]) -> Result<u64, AcceleratorError>;

    /// Transfers one packed input tile. Returns the 0/1 acknowledge.
    fn load_input(&mut self, words: &[u64]) -> Result<u64, AcceleratorError>;

    /// Runs the MAC over the loaded kernel and tile, writing the packed
    /// output tile into `output`. The result register is the overflow
    /// bitmap: bit `tx*T + ty` set means that cell's raw result left the
    /// Q8.8 range.
    fn compute(&mut self, output: &mut [u64], tile_type: TileType)
        -> Result<u64, AcceleratorError>;
}
