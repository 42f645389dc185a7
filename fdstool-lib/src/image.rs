use crate::{Error, Result};

/// Size of the on-device firmware flash region. Every image written there
/// is exactly this long.
pub const IMAGE_SIZE: usize = 0x8000;

/// Trailer constant the device's self-programming logic checks for before
/// it accepts an image as complete.
pub const IMAGE_MAGIC: u32 = 0xDEAD_BEEF;

/// Largest firmware payload that fits ahead of the 8-byte trailer.
pub const MAX_PAYLOAD: usize = IMAGE_SIZE - 8;

/// A complete, checksummed firmware image ready to be written to the
/// device's staging area.
///
/// Layout: payload, zero padding, [`IMAGE_MAGIC`] as a little-endian word
/// at `IMAGE_SIZE - 8`, then the checksum word. The checksum is the XOR
/// fold of every other 32-bit little-endian word in the buffer, magic
/// included. Weak, but it is what the device's own verifier computes.
#[derive(Debug)]
pub struct FirmwareImage {
    data: Vec<u8>,
    payload_len: usize,
    checksum: u32,
}

impl FirmwareImage {
    /// Build an image from raw firmware bytes. Pure; fails only with
    /// [`Error::ImageTooLarge`] when the payload does not fit.
    pub fn build(payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::ImageTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        let mut data = vec![0u8; IMAGE_SIZE];
        data[..payload.len()].copy_from_slice(payload);
        data[IMAGE_SIZE - 8..IMAGE_SIZE - 4].copy_from_slice(&IMAGE_MAGIC.to_le_bytes());

        let checksum = xor_fold(&data[..IMAGE_SIZE - 4]);
        data[IMAGE_SIZE - 4..].copy_from_slice(&checksum.to_le_bytes());

        Ok(Self {
            data,
            payload_len: payload.len(),
            checksum,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Original firmware size, before padding.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Recompute the fold over everything but the stored checksum word and
    /// compare. Verification is idempotent with [`FirmwareImage::build`].
    pub fn verify_checksum(&self) -> bool {
        xor_fold(&self.data[..IMAGE_SIZE - 4]) == self.checksum
    }
}

fn xor_fold(data: &[u8]) -> u32 {
    data.chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .fold(0, |acc, word| acc ^ word)
}
