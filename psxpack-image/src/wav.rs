//! WAV header helpers for extracted audio tracks.
//!
//! CD audio is 44.1 kHz 16-bit stereo PCM, 2352 bytes per sector; the
//! ripper wraps it in a canonical 44-byte RIFF header and the builder
//! strips that header back off.

use std::io::{Read, Seek, SeekFrom};

use crate::error::ImageError;

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_SIZE: usize = 44;

const SAMPLE_RATE: u32 = 44_100;
const CHANNELS: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;

/// Build the canonical 44-byte header for `data_len` bytes of CD audio.
pub fn wav_header(data_len: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = SAMPLE_RATE * CHANNELS as u32 * BITS_PER_SAMPLE as u32 / 8;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;

    let mut out = [0u8; WAV_HEADER_SIZE];
    out[0..4].copy_from_slice(b"RIFF");
    out[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    out[8..12].copy_from_slice(b"WAVE");
    out[12..16].copy_from_slice(b"fmt ");
    out[16..20].copy_from_slice(&16u32.to_le_bytes());
    out[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    out[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    out[24..28].copy_from_slice(&SAMPLE_RATE.to_le_bytes());
    out[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    out[32..34].copy_from_slice(&block_align.to_le_bytes());
    out[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out[36..40].copy_from_slice(b"data");
    out[40..44].copy_from_slice(&data_len.to_le_bytes());
    out
}

/// Validate a WAV header and position the reader at the start of the data
/// chunk. Returns the data chunk length.
pub fn skip_wav_header<R: Read + Seek>(reader: &mut R) -> Result<u32, ImageError> {
    let mut riff = [0u8; 12];
    reader.read_exact(&mut riff)?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(ImageError::unsupported("not a RIFF/WAVE file"));
    }

    // Walk chunks until "data"; tolerates an oversized fmt chunk or
    // extra chunks some encoders insert.
    loop {
        let mut header = [0u8; 8];
        reader.read_exact(&mut header)?;
        let size = u32::from_le_bytes(header[4..8].try_into().unwrap());
        if &header[0..4] == b"data" {
            return Ok(size);
        }
        reader.seek(SeekFrom::Current(size as i64))?;
    }
}
