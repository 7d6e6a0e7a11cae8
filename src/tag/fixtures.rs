//! Literal frames captured from a CRC32-enabled tag firmware build.

/// Device `0102030405060708`: 25.50 °C, 2100 mV, -50 mV, intensity 42,
/// -3.5 dBm, next report in 500 ms, mode 1, state MEDIUM (status byte 0x22).
pub const FULL_FRAME: [u8; 31] = [
    0x02, 0x01, 0x06, 0x1B, 0xFF, 0xFF, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0xF6, 0x09, 0x34, 0x08, 0xCE, 0xFF, 0x2A, 0xDD, 0xF4, 0x01, 0x00, 0x22, 0x8C, 0xCA, 0x88,
    0xF3,
];

/// Device `0102030405060708` in low-power mode.
pub const LOW_POWER_FRAME: [u8; 19] = [
    0x02, 0x01, 0x06, 0x0F, 0xFF, 0xFF, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0x62, 0xFC, 0x00, 0xD4,
];

/// Device `05187a6525686bfe`: -12.34 °C, 1800 mV, +120 mV, intensity 200,
/// +4.0 dBm, next report in 12000 ms, mode 3, state MAX (status byte 0x04).
pub const REFERENCE_TAG_FRAME: [u8; 31] = [
    0x02, 0x01, 0x06, 0x1B, 0xFF, 0xFF, 0x02, 0x05, 0x18, 0x7A, 0x65, 0x25, 0x68, 0x6B, 0xFE,
    0x2E, 0xFB, 0x08, 0x07, 0x78, 0x00, 0xC8, 0x28, 0xE0, 0x2E, 0x00, 0x04, 0x66, 0x2B, 0xC2,
    0xF3,
];

/// Valid CRC but status byte 0x07: state index 7 is past the power table.
pub const BAD_STATE_FRAME: [u8; 31] = [
    0x02, 0x01, 0x06, 0x1B, 0xFF, 0xFF, 0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    0x2E, 0xFB, 0x08, 0x07, 0x78, 0x00, 0xC8, 0x28, 0xE0, 0x2E, 0x00, 0x07, 0xB2, 0x1F, 0x78,
    0x2B,
];
