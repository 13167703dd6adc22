//! CRC-32 used by the radio framing.
//!
//! MSB-first variant: polynomial 0x04C11DB7, initial value 0xFFFFFFFF,
//! no bit reflection, final XOR 0xFFFFFFFF. Both ends of the closed
//! protocol compute this exact sequence, so the usual reflected
//! (ISO-HDLC) tables do not apply.

const POLYNOMIAL: u32 = 0x04C1_1DB7;
const INIT: u32 = 0xFFFF_FFFF;
const XOR_OUT: u32 = 0xFFFF_FFFF;

/// Compute the checksum over `data`.
///
/// Frames below 64 bytes dominate this channel, so the bitwise form is
/// plenty and keeps the constant-by-constant match with the peer obvious.
#[must_use]
pub fn checksum(data: &[u8]) -> u32 {
    let mut crc = INIT;
    for &byte in data {
        crc ^= u32::from(byte) << 24;
        for _ in 0..8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc ^ XOR_OUT
}

#[cfg(test)]
mod tests {
    use super::checksum;

    #[test]
    fn known_check_value() {
        // Published check value for the CRC-32/BZIP2 parameter set.
        assert_eq!(checksum(b"123456789"), 0xFC89_1918);
    }

    #[test]
    fn empty_input() {
        // INIT ^ XOR_OUT with no data mixed in.
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn differs_from_reflected_variant() {
        // The reflected CRC-32 (ISO-HDLC) of the same input is 0xCBF43926.
        // Catching an accidental swap to a stock table matters more than
        // the exact value here.
        assert_ne!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn single_byte_sensitivity() {
        let a = checksum(&[0x00, 0x01, 0x02]);
        let b = checksum(&[0x00, 0x01, 0x03]);
        assert_ne!(a, b);
    }
}
