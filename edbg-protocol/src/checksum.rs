//! CRC-8/MAXIM checksum used to protect every frame

/// Lookup table for CRC-8/MAXIM (reflected polynomial 0x8C)
const CRC_TABLE: [u8; 256] = [
    0, 94, 188, 226, 97, 63, 221, 131, 194, 156, 126, 32, 163, 253, 31, 65,
    157, 195, 33, 127, 252, 162, 64, 30, 95, 1, 227, 189, 62, 96, 130, 220,
    35, 125, 159, 193, 66, 28, 254, 160, 225, 191, 93, 3, 128, 222, 60, 98,
    190, 224, 2, 92, 223, 129, 99, 61, 124, 34, 192, 158, 29, 67, 161, 255,
    70, 24, 250, 164, 39, 121, 155, 197, 132, 218, 56, 102, 229, 187, 89, 7,
    219, 133, 103, 57, 186, 228, 6, 88, 25, 71, 165, 251, 120, 38, 196, 154,
    101, 59, 217, 135, 4, 90, 184, 230, 167, 249, 27, 69, 198, 152, 122, 36,
    248, 166, 68, 26, 153, 199, 37, 123, 58, 100, 134, 216, 91, 5, 231, 185,
    140, 210, 48, 110, 237, 179, 81, 15, 78, 16, 242, 172, 47, 113, 147, 205,
    17, 79, 173, 243, 112, 46, 204, 146, 211, 141, 111, 49, 178, 236, 14, 80,
    175, 241, 19, 77, 206, 144, 114, 44, 109, 51, 209, 143, 12, 82, 176, 238,
    50, 108, 142, 208, 83, 13, 239, 177, 240, 174, 76, 18, 145, 207, 45, 115,
    202, 148, 118, 40, 171, 245, 23, 73, 8, 86, 180, 234, 105, 55, 213, 139,
    87, 9, 235, 181, 54, 104, 138, 212, 149, 203, 41, 119, 244, 170, 72, 22,
    233, 183, 85, 11, 136, 214, 52, 106, 43, 117, 151, 201, 74, 20, 246, 168,
    116, 42, 200, 150, 21, 75, 169, 247, 182, 232, 10, 84, 215, 137, 107, 53,
];

/// Calculate the CRC-8 of `data` (initial value 0)
pub fn crc8(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |crc, &byte| CRC_TABLE[(crc ^ byte) as usize])
}

/// Calculate the CRC of an assembled, unescaped frame
///
/// Covers `frame[1 .. len - 2]`: everything after STX, up to but excluding
/// the checksum byte and ETX. Frames shorter than three bytes have no
/// protected region and yield 0.
pub fn frame_crc(frame: &[u8]) -> u8 {
    if frame.len() < 3 {
        return 0;
    }
    crc8(&frame[1..frame.len() - 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_empty() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn test_crc_single_byte_is_table_lookup() {
        assert_eq!(crc8(&[0x01]), 94);
        assert_eq!(crc8(&[0xFF]), 53);
    }

    #[test]
    fn test_crc_maxim_check_value() {
        // CRC-8/MAXIM check value for "123456789"
        assert_eq!(crc8(b"123456789"), 0xA1);
    }

    #[test]
    fn test_frame_crc_skips_delimiters() {
        let body = [0x01, 0x02, 0x56];
        let crc = crc8(&body);
        let frame = [0x55, 0x01, 0x02, 0x56, crc, 0xAA];
        assert_eq!(frame_crc(&frame), crc);
    }

    #[test]
    fn test_frame_crc_short_input() {
        assert_eq!(frame_crc(&[0x55, 0xAA]), 0);
    }
}
