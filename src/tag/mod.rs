pub mod crc;
pub mod decoder;
pub mod frame;

#[cfg(test)]
pub(crate) mod fixtures;

pub use crc::{crc32, crc32_default};
pub use decoder::decode;
pub use frame::{FrameKind, FrameValidator, ValidatedFrame};
