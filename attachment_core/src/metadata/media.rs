//! Container header probing for media duration.
//!
//! Only the chunk and box headers are read; the reader seeks over payloads,
//! so probing a large video costs a handful of small reads.

use std::io::{Read, Seek, SeekFrom};

use crate::error::ExtractionError;

/// Containers whose duration can be read from headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaContainer {
    Wav,
    IsoBmff,
}

impl MediaContainer {
    pub fn for_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "audio/wav" => Some(MediaContainer::Wav),
            "video/mp4" | "video/quicktime" | "audio/mp4" | "video/3gpp" | "audio/3gpp" => {
                Some(MediaContainer::IsoBmff)
            }
            _ => None,
        }
    }
}

/// Reads the duration in seconds, or `None` when the content type has no supported container.
pub fn probe_duration<R: Read + Seek>(reader: &mut R, content_type: &str) -> Result<Option<f64>, ExtractionError> {
    match MediaContainer::for_content_type(content_type) {
        Some(MediaContainer::Wav) => wav_duration(reader).map(Some),
        Some(MediaContainer::IsoBmff) => iso_bmff_duration(reader).map(Some),
        None => Ok(None),
    }
}

fn read_array<R: Read, const N: usize>(reader: &mut R, format: &str, what: &str) -> Result<[u8; N], ExtractionError> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ExtractionError::corrupt(format, format!("truncated {}", what)),
        _ => ExtractionError::Io(e),
    })?;
    Ok(buf)
}

fn wav_duration<R: Read + Seek>(reader: &mut R) -> Result<f64, ExtractionError> {
    const FORMAT: &str = "WAV";

    reader.seek(SeekFrom::Start(0))?;
    let riff: [u8; 12] = read_array(reader, FORMAT, "RIFF header")?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(ExtractionError::corrupt(FORMAT, "missing RIFF/WAVE signature"));
    }

    let mut byte_rate: Option<u32> = None;
    let mut data_size: Option<u32> = None;

    while byte_rate.is_none() || data_size.is_none() {
        let header: [u8; 8] = match read_array(reader, FORMAT, "chunk header") {
            Ok(header) => header,
            Err(ExtractionError::CorruptHeader { .. }) => break,
            Err(e) => return Err(e),
        };
        let id = &header[0..4];
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        match id {
            b"fmt " => {
                if size < 16 {
                    return Err(ExtractionError::corrupt(FORMAT, "fmt chunk too short"));
                }
                let fmt: [u8; 16] = read_array(reader, FORMAT, "fmt chunk")?;
                byte_rate = Some(u32::from_le_bytes([fmt[8], fmt[9], fmt[10], fmt[11]]));
                skip(reader, u64::from(size - 16) + u64::from(size % 2))?;
            }
            b"data" => {
                data_size = Some(size);
                if byte_rate.is_none() {
                    skip(reader, u64::from(size) + u64::from(size % 2))?;
                }
            }
            _ => skip(reader, u64::from(size) + u64::from(size % 2))?,
        }
    }

    match (byte_rate, data_size) {
        (Some(0), _) => Err(ExtractionError::corrupt(FORMAT, "byte rate is zero")),
        (Some(rate), Some(size)) => Ok(f64::from(size) / f64::from(rate)),
        (None, _) => Err(ExtractionError::corrupt(FORMAT, "missing fmt chunk")),
        (_, None) => Err(ExtractionError::corrupt(FORMAT, "missing data chunk")),
    }
}

fn skip<R: Seek>(reader: &mut R, bytes: u64) -> Result<(), ExtractionError> {
    let offset = i64::try_from(bytes).map_err(|_| ExtractionError::corrupt("container", "chunk size overflow"))?;
    reader.seek(SeekFrom::Current(offset))?;
    Ok(())
}

struct BoxHeader {
    kind: [u8; 4],
    /// Payload size, `None` when the box runs to the end of its parent.
    payload: Option<u64>,
}

fn read_box_header<R: Read>(reader: &mut R) -> Result<Option<BoxHeader>, ExtractionError> {
    const FORMAT: &str = "MP4";

    let mut head = [0u8; 8];
    let mut filled = 0;
    while filled < head.len() {
        let n = reader.read(&mut head[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ExtractionError::corrupt(FORMAT, "truncated box header"));
        }
        filled += n;
    }

    let size = u32::from_be_bytes([head[0], head[1], head[2], head[3]]) as u64;
    let kind = [head[4], head[5], head[6], head[7]];

    let payload = match size {
        0 => None,
        1 => {
            let large: [u8; 8] = read_array(reader, FORMAT, "64-bit box size")?;
            let large = u64::from_be_bytes(large);
            if large < 16 {
                return Err(ExtractionError::corrupt(FORMAT, "64-bit box size smaller than header"));
            }
            Some(large - 16)
        }
        n if n < 8 => return Err(ExtractionError::corrupt(FORMAT, "box size smaller than header")),
        n => Some(n - 8),
    };

    Ok(Some(BoxHeader { kind, payload }))
}

fn iso_bmff_duration<R: Read + Seek>(reader: &mut R) -> Result<f64, ExtractionError> {
    const FORMAT: &str = "MP4";

    reader.seek(SeekFrom::Start(0))?;

    let moov_end = loop {
        let header = read_box_header(reader)?
            .ok_or_else(|| ExtractionError::corrupt(FORMAT, "no moov box"))?;
        if &header.kind == b"moov" {
            break header.payload.map(|len| reader.stream_position().map(|pos| pos + len)).transpose()?;
        }
        match header.payload {
            Some(len) => skip(reader, len)?,
            None => return Err(ExtractionError::corrupt(FORMAT, "no moov box")),
        }
    };

    loop {
        if let Some(end) = moov_end {
            if reader.stream_position()? >= end {
                return Err(ExtractionError::corrupt(FORMAT, "moov box has no mvhd"));
            }
        }

        let header = read_box_header(reader)?
            .ok_or_else(|| ExtractionError::corrupt(FORMAT, "moov box has no mvhd"))?;

        if &header.kind == b"mvhd" {
            return read_mvhd(reader);
        }
        match header.payload {
            Some(len) => skip(reader, len)?,
            None => return Err(ExtractionError::corrupt(FORMAT, "moov box has no mvhd")),
        }
    }
}

fn read_mvhd<R: Read>(reader: &mut R) -> Result<f64, ExtractionError> {
    const FORMAT: &str = "MP4";

    let version_flags: [u8; 4] = read_array(reader, FORMAT, "mvhd version")?;
    let (timescale, duration) = match version_flags[0] {
        0 => {
            let body: [u8; 16] = read_array(reader, FORMAT, "mvhd body")?;
            let timescale = u32::from_be_bytes([body[8], body[9], body[10], body[11]]);
            let duration = u32::from_be_bytes([body[12], body[13], body[14], body[15]]) as u64;
            (timescale, duration)
        }
        1 => {
            let body: [u8; 28] = read_array(reader, FORMAT, "mvhd body")?;
            let timescale = u32::from_be_bytes([body[16], body[17], body[18], body[19]]);
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&body[20..28]);
            (timescale, u64::from_be_bytes(raw))
        }
        v => return Err(ExtractionError::corrupt(FORMAT, format!("unknown mvhd version {}", v))),
    };

    if timescale == 0 {
        return Err(ExtractionError::corrupt(FORMAT, "mvhd timescale is zero"));
    }

    Ok(duration as f64 / f64::from(timescale))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn wav_bytes(sample_rate: u32, channels: u16, bits: u16, seconds: f64) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let byte_rate = sample_rate * u32::from(block_align);
        let data_len = (f64::from(byte_rate) * seconds) as u32;

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    pub(crate) fn mp4_bytes(timescale: u32, duration: u32) -> Vec<u8> {
        let mut ftyp = Vec::new();
        ftyp.extend_from_slice(&20u32.to_be_bytes());
        ftyp.extend_from_slice(b"ftyp");
        ftyp.extend_from_slice(b"isom");
        ftyp.extend_from_slice(&0u32.to_be_bytes());
        ftyp.extend_from_slice(b"mp41");

        let mut free = Vec::new();
        free.extend_from_slice(&16u32.to_be_bytes());
        free.extend_from_slice(b"free");
        free.extend_from_slice(&[0u8; 8]);

        let mut mvhd = Vec::new();
        mvhd.extend_from_slice(&(8u32 + 4 + 16).to_be_bytes());
        mvhd.extend_from_slice(b"mvhd");
        mvhd.extend_from_slice(&[0, 0, 0, 0]);
        mvhd.extend_from_slice(&0u32.to_be_bytes());
        mvhd.extend_from_slice(&0u32.to_be_bytes());
        mvhd.extend_from_slice(&timescale.to_be_bytes());
        mvhd.extend_from_slice(&duration.to_be_bytes());

        let mut moov = Vec::new();
        moov.extend_from_slice(&(8 + mvhd.len() as u32).to_be_bytes());
        moov.extend_from_slice(b"moov");
        moov.extend_from_slice(&mvhd);

        let mut out = ftyp;
        out.extend_from_slice(&free);
        out.extend_from_slice(&moov);
        out
    }

    #[test]
    fn test_wav_duration() {
        let bytes = wav_bytes(8000, 1, 16, 2.5);
        let duration = probe_duration(&mut Cursor::new(bytes), "audio/wav").unwrap();
        assert_eq!(duration, Some(2.5));
    }

    #[test]
    fn test_mp4_duration() {
        let bytes = mp4_bytes(1000, 12_340);
        let duration = probe_duration(&mut Cursor::new(bytes), "video/mp4").unwrap();
        assert_eq!(duration, Some(12.34));
    }

    #[test]
    fn test_unsupported_type_has_no_duration() {
        let duration = probe_duration(&mut Cursor::new(vec![0u8; 32]), "audio/mpeg").unwrap();
        assert_eq!(duration, None);
    }

    #[test]
    fn test_truncated_wav_is_corrupt() {
        let mut bytes = wav_bytes(8000, 1, 16, 1.0);
        bytes.truncate(20);
        let result = probe_duration(&mut Cursor::new(bytes), "audio/wav");
        assert!(matches!(result, Err(ExtractionError::CorruptHeader { .. })));
    }

    #[test]
    fn test_mp4_without_moov_is_corrupt() {
        let mut bytes = mp4_bytes(1000, 1000);
        bytes.truncate(36);
        let result = probe_duration(&mut Cursor::new(bytes), "video/mp4");
        assert!(matches!(result, Err(ExtractionError::CorruptHeader { .. })));
    }
}
