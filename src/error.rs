use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedPointError {
    OutOfRange { value: f32 },
}

impl fmt::Display for FixedPointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedPointError::OutOfRange { value } => {
                write!(f, "value {:.4} out of range for 8.8 fixed-point", value)
            }
        }
    }
}

impl std::error::Error for FixedPointError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    UnsupportedKernelSize(usize),
    KernelWeightCountMismatch { size: usize, actual: usize },
    KernelSizeMismatch { expected: usize, actual: usize },
    ZeroTileSize,
    TileDoesNotDivideMap { map_size: usize, tile_size: usize },
    TileExceedsBitmap { tile_size: usize },
    HaloExceedsTile { tile_size: usize, pad: usize },
    HaloExceedsMap { map_size: usize, window: usize },
    MapSizeMismatch { expected: usize, actual: usize },
    MapDataSizeMismatch { size: usize, actual: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnsupportedKernelSize(size) => {
                write!(f, "unsupported kernel size {size}, must be 1, 3, or 5")
            }
            ConfigError::KernelWeightCountMismatch { size, actual } => write!(
                f,
                "kernel weight count mismatch: {size}x{size} kernel needs {} weights, got {actual}",
                size * size
            ),
            ConfigError::KernelSizeMismatch { expected, actual } => write!(
                f,
                "kernel size mismatch: driver configured for {expected}x{expected}, got {actual}x{actual}"
            ),
            ConfigError::ZeroTileSize => write!(f, "output tile size must be non-zero"),
            ConfigError::TileDoesNotDivideMap {
                map_size,
                tile_size,
            } => write!(
                f,
                "output tile size {tile_size} does not evenly divide map size {map_size}"
            ),
            ConfigError::TileExceedsBitmap { tile_size } => write!(
                f,
                "output tile {tile_size}x{tile_size} has more cells than the 64-bit overflow bitmap"
            ),
            ConfigError::HaloExceedsTile { tile_size, pad } => write!(
                f,
                "kernel halo {pad} is wider than the output tile size {tile_size}"
            ),
            ConfigError::HaloExceedsMap { map_size, window } => write!(
                f,
                "halo-inclusive input window {window} exceeds map size {map_size}"
            ),
            ConfigError::MapSizeMismatch { expected, actual } => write!(
                f,
                "feature map size mismatch: expected {expected}, got {actual}"
            ),
            ConfigError::MapDataSizeMismatch { size, actual } => write!(
                f,
                "feature map data length mismatch: {size}x{size} map needs {} samples, got {actual}",
                size * size
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorError {
    ConfigureRejected { status: u64 },
    KernelLoadRejected { status: u64 },
    InputLoadRejected { status: u64 },
    OutputBufferTooSmall { expected: usize, actual: usize },
}

impl fmt::Display for AcceleratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorError::ConfigureRejected { status } => write!(
                f,
                "accelerator rejected kernel-size configuration (status {status})"
            ),
            AcceleratorError::KernelLoadRejected { status } => {
                write!(f, "accelerator rejected kernel load (status {status})")
            }
            AcceleratorError::InputLoadRejected { status } => {
                write!(f, "accelerator rejected input tile load (status {status})")
            }
            AcceleratorError::OutputBufferTooSmall { expected, actual } => write!(
                f,
                "output buffer too small: accelerator needs {expected} words, got {actual}"
            ),
        }
    }
}

impl std::error::Error for AcceleratorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    OutOfOrder {
        operation: &'static str,
        state: &'static str,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::OutOfOrder { operation, state } => write!(
                f,
                "protocol violation: {operation} issued while driver is {state}"
            ),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ConvError {
    FixedPoint(FixedPointError),
    Config(ConfigError),
    Accelerator(AcceleratorError),
    Protocol(ProtocolError),
}

impl fmt::Display for ConvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvError::FixedPoint(err) => write!(f, "fixed-point error: {err}"),
            ConvError::Config(err) => write!(f, "configuration error: {err}"),
            ConvError::Accelerator(err) => write!(f, "accelerator error: {err}"),
            ConvError::Protocol(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConvError {}

impl From<FixedPointError> for ConvError {
    fn from(value: FixedPointError) -> Self {
        ConvError::FixedPoint(value)
    }
}

impl From<ConfigError> for ConvError {
    fn from(value: ConfigError) -> Self {
        ConvError::Config(value)
    }
}

impl From<AcceleratorError> for ConvError {
    fn from(value: AcceleratorError) -> Self {
        ConvError::Accelerator(value)
    }
}

impl From<ProtocolError> for ConvError {
    fn from(value: ProtocolError) -> Self {
        ConvError::Protocol(value)
    }
}
