//! CRC-16/CCITT-FALSE, the checksum carried in the terminal field (tag 63) of every EMV QR payload.
//!
//! The checksum covers everything before it *including* the CRC field's own tag and length, i.e. the literal `6304`.
use crate::qris::{tags, TlvPayload};

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;
/// Tag and length of the CRC field. The checksum value itself is always 4 hex digits.
pub const CRC_PREFIX: &str = "6304";

pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    data.iter().fold(INITIAL, |crc, byte| {
        (0..8).fold(crc ^ (u16::from(*byte) << 8), |crc, _| {
            if crc & 0x8000 == 0 {
                crc << 1
            } else {
                (crc << 1) ^ POLYNOMIAL
            }
        })
    })
}

/// Computes the checksum of `data` as 4 upper-case hex digits. `data` should already end with [`CRC_PREFIX`].
pub fn compute_crc16(data: &str) -> String {
    format!("{:04X}", crc16_ccitt_false(data.as_bytes()))
}

/// Appends a fresh CRC field to `body`, which must not already carry one.
pub fn seal_payload(body: &str) -> String {
    let mut sealed = String::with_capacity(body.len() + 8);
    sealed.push_str(body);
    sealed.push_str(CRC_PREFIX);
    let crc = compute_crc16(&sealed);
    sealed.push_str(&crc);
    sealed
}

impl TlvPayload {
    /// Drops any existing CRC field and serializes the payload with a freshly computed one.
    pub fn to_sealed_string(&self) -> String {
        let mut body = self.clone();
        body.remove(tags::CRC);
        seal_payload(&body.to_string())
    }
}

/// Checks that `payload` ends with a CRC field whose value matches the preceding content.
pub fn verify_crc(payload: &str) -> bool {
    if !payload.is_ascii() || payload.len() < CRC_PREFIX.len() + 4 {
        return false;
    }
    let (covered, crc) = payload.split_at(payload.len() - 4);
    covered.ends_with(CRC_PREFIX) && crc == compute_crc16(covered)
}
