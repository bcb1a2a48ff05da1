// Variable-length quantities - MIDI delta-time encoding

/// Largest value a four-byte VLQ can hold (2^28 - 1)
pub const MAX_VLQ: u32 = 0x0FFF_FFFF;

/// Append `value` as a minimal big-endian VLQ
///
/// Every byte but the last carries the 0x80 continuation bit. Values above
/// `MAX_VLQ` take a fifth byte; track writers reject them before calling.
pub fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = [0u8; 5];
    let mut i = 4;
    bytes[i] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        bytes[i] = ((value & 0x7F) | 0x80) as u8;
        value >>= 7;
    }
    buf.extend_from_slice(&bytes[i..]);
}

pub fn encode(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4);
    write_vlq(&mut buf, value);
    buf
}

/// Read one VLQ from the front of `bytes`
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// input ends mid-quantity or runs past four bytes.
pub fn decode(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut value: u32 = 0;
    for (i, &byte) in bytes.iter().take(4).enumerate() {
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}
