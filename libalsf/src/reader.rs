use tracing::warn;

use crate::core::{
    data_digest, AlsfFile, Frame, Header, IntChannelData, TocEntry, PREDICTOR_SILENT,
    TOC_ENTRY_SIZE,
};
use crate::error::{AlsfError, AlsfResult};
use crate::MAGIC;

/// Upper bound on samples in one frame; anything larger is corruption.
const MAX_FRAME_SAMPLES: u32 = 1 << 20;

/// binary reader for the alsf container
pub struct Reader;

impl Reader {
    /// new reader
    pub fn new() -> Self {
        Reader
    }

    /// read and parse an alsf stream
    pub fn read(&self, data: &[u8]) -> AlsfResult<AlsfFile> {
        let mut cursor = Cursor::new(data);

        // magic
        let magic = cursor.read_bytes(4)?;
        if magic != MAGIC {
            return Err(AlsfError::InvalidHeader("bad magic".to_string()));
        }

        // header
        let header = self.read_header(&mut cursor)?;
        self.check_sizes(&header, data.len())?;

        // toc
        let toc = self.read_toc(&mut cursor, header.toc_size as usize)?;

        // DATA chunk
        let frames = self.read_data_chunk(&mut cursor, &header, &toc)?;

        // META chunk
        let metadata = cursor.read_bytes(header.meta_size as usize)?;

        Ok(AlsfFile {
            header,
            toc,
            frames,
            metadata,
        })
    }

    /// Only the header, for quick inspection.
    pub fn read_header_only(&self, data: &[u8]) -> AlsfResult<Header> {
        let mut cursor = Cursor::new(data);
        if cursor.read_bytes(4)? != MAGIC {
            return Err(AlsfError::InvalidHeader("bad magic".to_string()));
        }
        self.read_header(&mut cursor)
    }

    /// Parse the stream and recompute the data digest.
    pub fn validate(&self, data: &[u8]) -> AlsfResult<AlsfFile> {
        let file = self.read(data)?;
        let start = file.header.data_offset();
        let end = start + file.header.data_size as usize;
        if data_digest(&data[start..end]) != file.header.data_digest {
            warn!("data digest mismatch");
            return Err(AlsfError::DigestMismatch);
        }
        Ok(file)
    }

    fn read_header(&self, cursor: &mut Cursor) -> AlsfResult<Header> {
        let header = Header {
            version_major: cursor.read_u8()?,
            version_minor: cursor.read_u8()?,
            flags: cursor.read_u16_le()?,
            sample_rate: cursor.read_u32_le()?,
            channels: cursor.read_u8()?,
            int_resolution: cursor.read_u8()?,
            frame_size: cursor.read_u32_le()?,
            random_access_interval: cursor.read_u16_le()?,
            total_samples: cursor.read_u64_le()?,
            data_digest: {
                let mut digest = [0u8; 32];
                digest.copy_from_slice(cursor.read_slice(32)?);
                digest
            },
            toc_size: cursor.read_u64_le()?,
            data_size: cursor.read_u64_le()?,
            meta_size: cursor.read_u64_le()?,
        };

        if header.version_major != crate::VERSION_MAJOR {
            return Err(AlsfError::InvalidHeader(format!(
                "unsupported version {}.{}",
                header.version_major, header.version_minor
            )));
        }
        if header.channels == 0 {
            return Err(AlsfError::InvalidHeader("zero channels".to_string()));
        }
        if !(crate::config::MIN_INT_RESOLUTION..=crate::config::MAX_INT_RESOLUTION)
            .contains(&header.int_resolution)
        {
            return Err(AlsfError::InvalidHeader(format!(
                "int resolution {}",
                header.int_resolution
            )));
        }
        Ok(header)
    }

    fn check_sizes(&self, header: &Header, len: usize) -> AlsfResult<()> {
        let total = (MAGIC.len() as u64 + crate::core::HEADER_SIZE)
            .checked_add(header.toc_size)
            .and_then(|t| t.checked_add(header.data_size))
            .and_then(|t| t.checked_add(header.meta_size));
        match total {
            Some(t) if t <= len as u64 => Ok(()),
            _ => Err(AlsfError::InvalidHeader(format!(
                "chunk sizes exceed the {len} byte stream"
            ))),
        }
    }

    fn read_toc(&self, cursor: &mut Cursor, toc_size: usize) -> AlsfResult<Vec<TocEntry>> {
        if toc_size < 4 {
            return Err(AlsfError::InvalidHeader("toc too small".to_string()));
        }

        let num_entries = cursor.read_u32_le()? as usize;
        if 4 + num_entries as u64 * TOC_ENTRY_SIZE != toc_size as u64 {
            return Err(AlsfError::InvalidHeader(format!(
                "{num_entries} toc entries do not fill {toc_size} bytes"
            )));
        }

        let mut entries = Vec::with_capacity(num_entries);
        for i in 0..num_entries {
            let entry = TocEntry {
                frame_index: cursor.read_u32_le()?,
                byte_offset: cursor.read_u64_le()?,
                frame_size: cursor.read_u32_le()?,
                sample_offset: cursor.read_u64_le()?,
                random_access: cursor.read_u8()? != 0,
            };
            if entry.frame_index as usize != i {
                return Err(AlsfError::InvalidHeader(format!(
                    "toc entry {i} names frame {}",
                    entry.frame_index
                )));
            }
            entries.push(entry);
        }

        Ok(entries)
    }

    fn read_data_chunk(
        &self,
        cursor: &mut Cursor,
        header: &Header,
        toc: &[TocEntry],
    ) -> AlsfResult<Vec<Frame>> {
        let data_start = cursor.pos;
        let data_end = data_start + header.data_size as usize;
        let mut frames = Vec::with_capacity(toc.len());

        for entry in toc {
            let past_end = || {
                AlsfError::InvalidHeader(format!(
                    "frame {} runs past the data chunk",
                    entry.frame_index
                ))
            };
            let frame_start = (data_start as u64)
                .checked_add(entry.byte_offset)
                .ok_or_else(past_end)?;
            let frame_end = frame_start
                .checked_add(entry.frame_size as u64)
                .ok_or_else(past_end)?;
            if frame_end > data_end as u64 {
                return Err(past_end());
            }

            cursor.pos = frame_start as usize;
            let frame = self.read_frame(cursor, header.channels, frame_end as usize)?;
            if frame.is_random_access() != entry.random_access {
                return Err(AlsfError::InvalidHeader(format!(
                    "frame {} random-access flag disagrees with the toc",
                    entry.frame_index
                )));
            }
            frames.push(frame);
        }

        cursor.pos = data_end;
        Ok(frames)
    }

    fn read_frame(&self, cursor: &mut Cursor, channels: u8, frame_end: usize) -> AlsfResult<Frame> {
        // frame header: flags(1) + samples(4)
        let flags = cursor.read_u8()?;
        let frame_samples = cursor.read_u32_le()?;
        if frame_samples > MAX_FRAME_SAMPLES {
            return Err(AlsfError::InvalidHeader(format!(
                "{frame_samples} samples in one frame"
            )));
        }

        let mut frame = Frame::new(flags, frame_samples);

        for _ in 0..channels {
            let ch_size = cursor.read_u32_le()? as usize;
            let ch_end = cursor.pos + ch_size;
            if ch_end > frame_end {
                return Err(AlsfError::InvalidHeader(
                    "channel block runs past its frame".to_string(),
                ));
            }
            frame.channels.push(self.read_channel_data(cursor, ch_end)?);
            cursor.pos = ch_end;
        }

        let float_size = cursor.read_u32_le()? as usize;
        if cursor.pos + float_size > frame_end {
            return Err(AlsfError::InvalidHeader(
                "float block runs past its frame".to_string(),
            ));
        }
        frame.float_data = cursor.read_bytes(float_size)?;

        cursor.pos = frame_end;
        Ok(frame)
    }

    fn read_channel_data(&self, cursor: &mut Cursor, channel_end: usize) -> AlsfResult<IntChannelData> {
        let predictor_order = cursor.read_u8()?;
        if predictor_order == PREDICTOR_SILENT {
            return Ok(IntChannelData::new_silence());
        }

        let wasted_bits = cursor.read_u8()?;
        let rice_parameter = cursor.read_u8()?;

        // rest is residuals
        let remaining = channel_end.saturating_sub(cursor.pos);
        let residuals = cursor.read_bytes(remaining)?;

        Ok(IntChannelData {
            predictor_order,
            wasted_bits,
            rice_parameter,
            residuals,
        })
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

// cursor helper

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn read_slice(&mut self, count: usize) -> AlsfResult<&'a [u8]> {
        let end = self.pos.checked_add(count).ok_or(AlsfError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(AlsfError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_bytes(&mut self, count: usize) -> AlsfResult<Vec<u8>> {
        self.read_slice(count).map(<[u8]>::to_vec)
    }

    fn read_array<const N: usize>(&mut self) -> AlsfResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> AlsfResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u16_le(&mut self) -> AlsfResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    fn read_u32_le(&mut self) -> AlsfResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_u64_le(&mut self) -> AlsfResult<u64> {
        self.read_array().map(u64::from_le_bytes)
    }
}
