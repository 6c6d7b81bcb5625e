//! RIFF/WAVE header parsing.
//!
//! Chunk identifiers are compared as big-endian words, every other field
//! is little-endian. Only 16-bit PCM between 8 kHz and 192 kHz is
//! accepted.

use core::fmt;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

const RIFF_ID: u32 = 0x5249_4646; // "RIFF"
const WAVE_ID: u32 = 0x5741_5645; // "WAVE"
const FORMAT_ID: u32 = 0x666D_7420; // "fmt "
const FACT_ID: u32 = 0x6661_6374; // "fact"
const DATA_ID: u32 = 0x6461_7461; // "data"

const FORMAT_CHUNK_SIZE: u32 = 16;
pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const BITS_PER_SAMPLE_16: u16 = 16;
pub const CHANNEL_MONO: u16 = 1;
pub const CHANNEL_STEREO: u16 = 2;

const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 192_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaveError {
    InvalidRiffId,
    InvalidWaveFormat,
    InvalidFormatChunkId,
    UnsupportedFormatTag,
    UnsupportedChannelCount,
    UnsupportedSampleRate,
    UnsupportedBitsPerSample,
    UnsupportedExtraFormatBytes,
    InvalidFactChunkId,
    InvalidDataChunkId,
    /// The blob ends inside the header
    Truncated,
}

impl fmt::Display for WaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            WaveError::InvalidRiffId => "invalid RIFF id",
            WaveError::InvalidWaveFormat => "invalid WAVE format",
            WaveError::InvalidFormatChunkId => "invalid format chunk id",
            WaveError::UnsupportedFormatTag => "unsupported format tag",
            WaveError::UnsupportedChannelCount => "unsupported channel count",
            WaveError::UnsupportedSampleRate => "unsupported sample rate",
            WaveError::UnsupportedBitsPerSample => "unsupported bits per sample",
            WaveError::UnsupportedExtraFormatBytes => "unsupported extra format bytes",
            WaveError::InvalidFactChunkId => "invalid fact chunk id",
            WaveError::InvalidDataChunkId => "invalid data chunk id",
            WaveError::Truncated => "truncated header",
        };
        f.write_str(msg)
    }
}

/// Header fields of a WAVE file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WaveFormat {
    pub riff_chunk_size: u32,
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Size of the sample data in bytes
    pub data_size: u32,
    /// Offset of the first sample from the start of the file
    pub data_offset: usize,
}

/// Sequential reader over the header bytes
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WaveError> {
        let end = self.pos.checked_add(n).ok_or(WaveError::Truncated)?;
        let bytes = self.buf.get(self.pos..end).ok_or(WaveError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn skip(&mut self, n: usize) -> Result<(), WaveError> {
        self.take(n).map(|_| ())
    }

    fn id(&mut self) -> Result<u32, WaveError> {
        self.take(4).map(BigEndian::read_u32)
    }

    fn u32(&mut self) -> Result<u32, WaveError> {
        self.take(4).map(LittleEndian::read_u32)
    }

    fn u16(&mut self) -> Result<u16, WaveError> {
        self.take(2).map(LittleEndian::read_u16)
    }

    fn expect_id(&mut self, id: u32, err: WaveError) -> Result<(), WaveError> {
        if self.id()? == id {
            Ok(())
        } else {
            Err(err)
        }
    }
}

/// Parses the header of the WAVE file held in `buf`.
pub fn parse(buf: &[u8]) -> Result<WaveFormat, WaveError> {
    let mut c = Cursor::new(buf);

    c.expect_id(RIFF_ID, WaveError::InvalidRiffId)?;
    let riff_chunk_size = c.u32()?;
    c.expect_id(WAVE_ID, WaveError::InvalidWaveFormat)?;
    c.expect_id(FORMAT_ID, WaveError::InvalidFormatChunkId)?;
    let extra_format_bytes = c.u32()? != FORMAT_CHUNK_SIZE;

    let format_tag = c.u16()?;
    if format_tag != WAVE_FORMAT_PCM {
        return Err(WaveError::UnsupportedFormatTag);
    }

    let channels = c.u16()?;
    if channels != CHANNEL_MONO && channels != CHANNEL_STEREO {
        return Err(WaveError::UnsupportedChannelCount);
    }

    let sample_rate = c.u32()?;
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(WaveError::UnsupportedSampleRate);
    }

    let byte_rate = c.u32()?;
    let block_align = c.u16()?;
    let bits_per_sample = c.u16()?;
    if bits_per_sample != BITS_PER_SAMPLE_16 {
        return Err(WaveError::UnsupportedBitsPerSample);
    }

    if extra_format_bytes {
        if c.u16()? != 0 {
            return Err(WaveError::UnsupportedExtraFormatBytes);
        }
        c.expect_id(FACT_ID, WaveError::InvalidFactChunkId)?;
        let fact_size = c.u32()?;
        c.skip(fact_size as usize)?;
    }

    c.expect_id(DATA_ID, WaveError::InvalidDataChunkId)?;
    let data_size = c.u32()?;

    let format = WaveFormat {
        riff_chunk_size,
        format_tag,
        channels,
        sample_rate,
        byte_rate,
        block_align,
        bits_per_sample,
        data_size,
        data_offset: c.pos,
    };
    debug!(
        "wave: {=u16} ch, {=u32} Hz, {=u32} data bytes",
        format.channels,
        format.sample_rate,
        format.data_size
    );
    Ok(format)
}

/// Header builders shared with the audio player tests
#[cfg(test)]
pub(crate) mod test_files {
    pub fn header(channels: u16, sample_rate: u32, bits: u16, data: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(b"RIFF");
        v.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        v.extend_from_slice(b"WAVE");
        v.extend_from_slice(b"fmt ");
        v.extend_from_slice(&16u32.to_le_bytes());
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&channels.to_le_bytes());
        v.extend_from_slice(&sample_rate.to_le_bytes());
        v.extend_from_slice(&(sample_rate * u32::from(channels) * 2).to_le_bytes());
        v.extend_from_slice(&(channels * 2).to_le_bytes());
        v.extend_from_slice(&bits.to_le_bytes());
        v.extend_from_slice(b"data");
        v.extend_from_slice(&(data.len() as u32).to_le_bytes());
        v.extend_from_slice(data);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::test_files::header;
    use super::*;

    #[test]
    fn plain_pcm_header() {
        let file = header(2, 44_100, 16, &[1, 0, 2, 0]);
        let format = parse(&file).unwrap();

        assert_eq!(format.riff_chunk_size, 40);
        assert_eq!(format.format_tag, WAVE_FORMAT_PCM);
        assert_eq!(format.channels, 2);
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.byte_rate, 176_400);
        assert_eq!(format.block_align, 4);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.data_size, 4);
        assert_eq!(format.data_offset, 44);
    }

    #[test]
    fn fact_chunk_is_skipped() {
        let mut file = header(1, 8_000, 16, &[]);
        // fmt size 18, cbSize 0, then a 4 byte fact chunk before data
        file[16..20].copy_from_slice(&18u32.to_le_bytes());
        let mut extra = Vec::new();
        extra.extend_from_slice(&0u16.to_le_bytes());
        extra.extend_from_slice(b"fact");
        extra.extend_from_slice(&4u32.to_le_bytes());
        extra.extend_from_slice(&[0xAA; 4]);
        file.splice(36..36, extra);

        let format = parse(&file).unwrap();
        assert_eq!(format.channels, 1);
        assert_eq!(format.data_offset, 44 + 14);
    }

    #[test]
    fn extra_format_bytes_must_be_zero() {
        let mut file = header(1, 8_000, 16, &[]);
        file[16..20].copy_from_slice(&18u32.to_le_bytes());
        file.splice(36..36, [2u8, 0]);
        assert_eq!(parse(&file), Err(WaveError::UnsupportedExtraFormatBytes));

        let mut file = header(1, 8_000, 16, &[]);
        file[16..20].copy_from_slice(&18u32.to_le_bytes());
        file.splice(36..36, [0u8, 0]);
        // "data" where "fact" is expected
        assert_eq!(parse(&file), Err(WaveError::InvalidFactChunkId));
    }

    #[test]
    fn bad_identifiers() {
        let good = header(2, 48_000, 16, &[]);

        let mut f = good.clone();
        f[0] = b'X';
        assert_eq!(parse(&f), Err(WaveError::InvalidRiffId));

        let mut f = good.clone();
        f[8..12].copy_from_slice(b"AVI ");
        assert_eq!(parse(&f), Err(WaveError::InvalidWaveFormat));

        let mut f = good.clone();
        f[12..16].copy_from_slice(b"LIST");
        assert_eq!(parse(&f), Err(WaveError::InvalidFormatChunkId));

        let mut f = good;
        f[36..40].copy_from_slice(b"junk");
        assert_eq!(parse(&f), Err(WaveError::InvalidDataChunkId));
    }

    #[test]
    fn unsupported_formats() {
        let mut f = header(2, 48_000, 16, &[]);
        f[20] = 3; // IEEE float
        assert_eq!(parse(&f), Err(WaveError::UnsupportedFormatTag));

        assert_eq!(
            parse(&header(6, 48_000, 16, &[])),
            Err(WaveError::UnsupportedChannelCount)
        );
        assert_eq!(
            parse(&header(2, 7_999, 16, &[])),
            Err(WaveError::UnsupportedSampleRate)
        );
        assert_eq!(
            parse(&header(2, 192_001, 16, &[])),
            Err(WaveError::UnsupportedSampleRate)
        );
        assert!(parse(&header(2, 192_000, 16, &[])).is_ok());
        assert_eq!(
            parse(&header(2, 48_000, 8, &[])),
            Err(WaveError::UnsupportedBitsPerSample)
        );
    }

    #[test]
    fn bundled_clip() {
        let clip = include_bytes!("../assets/tone_8k_mono.wav");
        let format = parse(clip).unwrap();

        assert_eq!(format.channels, CHANNEL_MONO);
        assert_eq!(format.sample_rate, 8_000);
        assert_eq!(format.data_offset, 44);
        assert_eq!(format.data_size, 16_000);
        assert_eq!(format.data_offset + format.data_size as usize, clip.len());
    }

    #[test]
    fn truncated_header() {
        let file = header(2, 48_000, 16, &[]);
        assert_eq!(parse(&file[..3]), Err(WaveError::Truncated));
        assert_eq!(parse(&file[..30]), Err(WaveError::Truncated));
        assert_eq!(parse(&file[..43]), Err(WaveError::Truncated));
        assert_eq!(parse(&[]), Err(WaveError::Truncated));
    }
}
