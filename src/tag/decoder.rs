//! Decoding of the packed harvester payload into typed telemetry
//!
//! Full frames carry, little-endian, right after the device id:
//! - i16 temperature in 0.01 °C
//! - u16 storage capacitor voltage in mV
//! - i16 capacitor voltage delta since the previous report in mV
//! - u8 harvested-energy intensity (0-255)
//! - i8 transmit power in 0.1 dBm
//! - u24 interval until the next report in ms
//! - mode/state: one shared status byte in checksum mode, two bytes otherwise

use crate::error::DecodeError;
use crate::models::{Measurements, PowerState, RawAdvertisement, TelemetryRecord};
use crate::tag::frame::{FrameKind, ValidatedFrame};

const MEASUREMENTS_OFFSET: usize = 15;

/// Little-endian cursor over the payload that reports truncation instead of panicking
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated {
                expected: end,
                actual: self.data.len(),
            })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    fn i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes(self.take::<1>()?))
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    fn i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.take::<2>()?))
    }

    fn u24(&mut self) -> Result<u32, DecodeError> {
        let [b0, b1, b2] = self.take::<3>()?;
        Ok(u32::from_le_bytes([b0, b1, b2, 0]))
    }
}

/// Split the mode/state encoding according to the validator mode
fn mode_and_state(reader: &mut Reader<'_>, checksum: bool) -> Result<(u8, u8), DecodeError> {
    if checksum {
        let status = reader.u8()?;
        Ok(((!status >> 4) & 0b11, status & 0b1111))
    } else {
        let mode = reader.u8()?;
        let state = reader.u8()?;
        Ok((mode, state ^ 0b11))
    }
}

/// Decode the measurement set of a full frame
pub fn decode_measurements(frame: &ValidatedFrame<'_>) -> Result<Measurements, DecodeError> {
    let mut reader = Reader::new(frame.payload(), MEASUREMENTS_OFFSET);

    let temperature = reader.i16()?;
    let vcap_mv = reader.u16()?;
    let delta_vcap_mv = reader.i16()?;
    let intensity = reader.u8()?;
    let power = reader.i8()?;
    let next_interval_ms = reader.u24()?;
    let (mode, state) = mode_and_state(&mut reader, frame.checksum())?;

    let state = PowerState::from_index(state).ok_or(DecodeError::StateOutOfRange { state })?;

    Ok(Measurements {
        temperature: f32::from(temperature) / 100.0,
        vcap_mv,
        delta_vcap_mv,
        intensity,
        power_dbm: f32::from(power) / 10.0,
        next_interval_ms,
        mode,
        state,
    })
}

/// Turn an accepted frame into a telemetry record for its source address
pub fn decode(
    frame: &ValidatedFrame<'_>,
    advertisement: &RawAdvertisement,
) -> Result<TelemetryRecord, DecodeError> {
    let measurements = match frame.kind() {
        FrameKind::Full => Some(decode_measurements(frame)?),
        FrameKind::LowPower => None,
    };

    Ok(TelemetryRecord {
        device_id: frame.device_id(),
        timestamp: advertisement.received_at,
        address: advertisement.address,
        address_kind: advertisement.address_kind,
        raw: advertisement.payload.clone(),
        payload_len: frame.declared_len(),
        measurements,
    })
}
