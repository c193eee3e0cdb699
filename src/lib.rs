mod accel;
mod error;
mod fixed;
mod map;
mod model;
mod packing;
mod pipeline;
mod reassemble;
mod reference;
mod tiling;

pub use crate::accel::{AcceleratorDriver, KernelSizeCode, STATUS_ACK};
pub use crate::error::{
    AcceleratorError, ConfigError, ConvError, FixedPointError, ProtocolError,
};
pub use crate::fixed::{decode, encode, Q88_FRACTION_BITS, Q88_MAX, Q88_MIN, Q88_SCALE};
pub use crate::map::{FeatureMap, Kernel, OverflowMap, SUPPORTED_KERNEL_SIZES};
pub use crate::model::ModelAccelerator;
pub use crate::packing::{
    pack, pack_into, packed_len, unpack, unpack_into, LaneOrder, LANES_PER_WORD,
};
pub use crate::pipeline::{
    convolve_tiled, ConvOutput, TileConvDriver, OVERFLOW_BITMAP_BITS,
};
pub use crate::reassemble::Reassembler;
pub use crate::reference::convolve as reference_convolve;
pub use crate::tiling::{Tile, TileGrid, TileType};
