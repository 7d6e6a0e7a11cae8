//! Recognition of asset-tag frames among arbitrary BLE broadcasts

use log::trace;

use crate::models::DeviceId;
use crate::tag::crc::crc32_default;

/// Flags AD structure: length 2, type 0x01, LE general discoverable / no BR/EDR
pub const FLAGS_AD: [u8; 3] = [0x02, 0x01, 0x06];
/// Manufacturer-specific AD type followed by company id 0x02FF, little-endian
pub const MANUFACTURER_AD: [u8; 3] = [0xFF, 0xFF, 0x02];
/// "SLBS" tag prepended to the CRC input
pub const CHECKSUM_TAG: [u8; 4] = *b"SLBS";

pub const FULL_LEN_WITH_CHECKSUM: usize = 31;
pub const LOW_POWER_LEN_WITH_CHECKSUM: usize = 19;
pub const FULL_LEN_WITHOUT_CHECKSUM: usize = 28;
pub const LOW_POWER_LEN_WITHOUT_CHECKSUM: usize = 15;

/// CRC input starts at the company id of the manufacturer AD
const CHECKSUM_OFFSET: usize = 5;
const LENGTH_OFFSET: usize = 3;
const DEVICE_ID_RANGE: std::ops::Range<usize> = 7..15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Full,
    LowPower,
}

/// A payload that passed every gate of the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFrame<'a> {
    payload: &'a [u8],
    device_id: DeviceId,
    kind: FrameKind,
    checksum: bool,
}

impl<'a> ValidatedFrame<'a> {
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Whether the frame was accepted in checksum mode
    pub fn checksum(&self) -> bool {
        self.checksum
    }

    /// Length declared by the manufacturer AD, minus its type and company id
    pub fn declared_len(&self) -> usize {
        usize::from(self.payload[LENGTH_OFFSET].saturating_sub(3))
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// Gatekeeper deciding which broadcasts are asset-tag frames
///
/// The checksum mode is fixed per deployment and must match the tag firmware:
/// tags built with CRC32 send 19/31-byte frames, the others 15/28.
#[derive(Debug, Clone, Copy)]
pub struct FrameValidator {
    use_checksum: bool,
    checksum_fn: fn(&[u8]) -> u32,
}

impl FrameValidator {
    pub fn new(use_checksum: bool) -> Self {
        Self::with_checksum_fn(use_checksum, crc32_default)
    }

    pub fn with_checksum_fn(use_checksum: bool, checksum_fn: fn(&[u8]) -> u32) -> Self {
        Self {
            use_checksum,
            checksum_fn,
        }
    }

    /// Classify a payload purely by its length
    pub fn frame_kind(&self, len: usize) -> Option<FrameKind> {
        match (self.use_checksum, len) {
            (true, FULL_LEN_WITH_CHECKSUM) | (false, FULL_LEN_WITHOUT_CHECKSUM) => {
                Some(FrameKind::Full)
            }
            (true, LOW_POWER_LEN_WITH_CHECKSUM) | (false, LOW_POWER_LEN_WITHOUT_CHECKSUM) => {
                Some(FrameKind::LowPower)
            }
            _ => None,
        }
    }

    /// Accept or reject a raw payload. Rejections are expected noise and are
    /// only traced.
    pub fn validate<'a>(&self, payload: &'a [u8]) -> Option<ValidatedFrame<'a>> {
        let kind = self.frame_kind(payload.len())?;

        if payload[..3] != FLAGS_AD || payload[4..7] != MANUFACTURER_AD {
            trace!("Dropping {}-byte frame: unexpected AD headers", payload.len());
            return None;
        }

        if self.use_checksum {
            let mut buffer = Vec::with_capacity(CHECKSUM_TAG.len() + payload.len() - CHECKSUM_OFFSET);
            buffer.extend_from_slice(&CHECKSUM_TAG);
            buffer.extend_from_slice(&payload[CHECKSUM_OFFSET..]);
            let residual = (self.checksum_fn)(&buffer);
            if residual != 0 {
                trace!("Dropping {}-byte frame: CRC residual {:#010x}", payload.len(), residual);
                return None;
            }
        }

        let mut id = [0u8; 8];
        id.copy_from_slice(&payload[DEVICE_ID_RANGE]);

        Some(ValidatedFrame {
            payload,
            device_id: DeviceId(id),
            kind,
            checksum: self.use_checksum,
        })
    }
}
