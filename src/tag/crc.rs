/// Reflected CRC-32 used by the tags to mark their frames
pub const DEFAULT_POLYNOMIAL: u32 = 0x04C1_1DB7;
pub const DEFAULT_INITIAL: u32 = 0x0000_0000;
pub const DEFAULT_FINAL_XOR: u32 = 0x0000_0000;

/// Compute a CRC-32 with bit-reflected input bytes and a bit-reflected result
///
/// Each byte is reflected and shifted MSB-first through the register; the
/// final register is reflected and XORed with `final_xor`. With the default
/// parameters, a message followed by its own CRC (little-endian) leaves a
/// zero residual.
pub fn crc32(bytes: &[u8], polynomial: u32, initial: u32, final_xor: u32) -> u32 {
    let mut crc = initial;

    for &byte in bytes {
        crc ^= u32::from(byte.reverse_bits()) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ polynomial
            } else {
                crc << 1
            };
        }
    }

    crc.reverse_bits() ^ final_xor
}

pub fn crc32_default(bytes: &[u8]) -> u32 {
    crc32(bytes, DEFAULT_POLYNOMIAL, DEFAULT_INITIAL, DEFAULT_FINAL_XOR)
}
