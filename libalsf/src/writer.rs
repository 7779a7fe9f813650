use crate::config::EncoderConfig;
use crate::core::{data_digest, Frame, IntChannelData, HEADER_SIZE, TOC_ENTRY_SIZE};
use crate::error::{AlsfError, AlsfResult};
use crate::{MAGIC, VERSION_MAJOR, VERSION_MINOR};

/// binary writer for the alsf container
pub struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    /// new writer
    pub fn new() -> Self {
        Writer { buffer: Vec::new() }
    }

    /// write a complete alsf stream
    pub fn write(
        mut self,
        sample_rate: u32,
        channels: u8,
        config: &EncoderConfig,
        total_samples: u64,
        frames: &[Frame],
        metadata: &[u8],
    ) -> AlsfResult<Vec<u8>> {
        let frame_size = u32::try_from(config.frame_size)
            .map_err(|_| AlsfError::InvalidConfig("frame size".to_string()))?;

        // sizes
        let toc_size = 4 + frames.len() as u64 * TOC_ENTRY_SIZE;
        let data_chunk = self.build_data_chunk(frames);
        let data_size = data_chunk.len() as u64;
        let meta_size = metadata.len() as u64;

        let total = 4 + HEADER_SIZE + toc_size + data_size + meta_size;
        self.buffer
            .try_reserve_exact(total as usize)
            .map_err(|_| AlsfError::Allocation {
                bytes: total as usize,
            })?;

        // Magic "ALSF"
        self.buffer.extend_from_slice(&MAGIC);

        // Version (u8, u8), flags (u16 LE)
        self.buffer.push(VERSION_MAJOR);
        self.buffer.push(VERSION_MINOR);
        self.buffer.extend_from_slice(&0u16.to_le_bytes());

        self.buffer.extend_from_slice(&sample_rate.to_le_bytes());
        self.buffer.push(channels);
        self.buffer.push(config.int_resolution);
        self.buffer.extend_from_slice(&frame_size.to_le_bytes());
        self.buffer
            .extend_from_slice(&config.random_access_interval.to_le_bytes());
        self.buffer.extend_from_slice(&total_samples.to_le_bytes());

        // blake3 of the data chunk
        self.buffer.extend_from_slice(&data_digest(&data_chunk));

        // chunk sizes (u64 LE)
        self.buffer.extend_from_slice(&toc_size.to_le_bytes());
        self.buffer.extend_from_slice(&data_size.to_le_bytes());
        self.buffer.extend_from_slice(&meta_size.to_le_bytes());

        self.build_toc_chunk(frames);
        self.buffer.extend_from_slice(&data_chunk);
        self.buffer.extend_from_slice(metadata);

        Ok(self.buffer)
    }

    fn build_toc_chunk(&mut self, frames: &[Frame]) {
        // Number of entries (u32 LE)
        self.buffer
            .extend_from_slice(&(frames.len() as u32).to_le_bytes());

        let mut byte_offset = 0u64;
        let mut sample_offset = 0u64;

        for (i, frame) in frames.iter().enumerate() {
            let frame_size = frame.byte_size() as u32;

            self.buffer.extend_from_slice(&(i as u32).to_le_bytes());
            self.buffer.extend_from_slice(&byte_offset.to_le_bytes());
            self.buffer.extend_from_slice(&frame_size.to_le_bytes());
            self.buffer.extend_from_slice(&sample_offset.to_le_bytes());
            self.buffer.push(frame.is_random_access() as u8);

            byte_offset += frame_size as u64;
            sample_offset += frame.frame_samples as u64;
        }
    }

    fn build_data_chunk(&self, frames: &[Frame]) -> Vec<u8> {
        let mut data = Vec::with_capacity(frames.iter().map(Frame::byte_size).sum());

        for frame in frames {
            write_frame(&mut data, frame);
        }

        data
    }
}

fn write_frame(buffer: &mut Vec<u8>, frame: &Frame) {
    // frame header
    buffer.push(frame.flags);
    buffer.extend_from_slice(&frame.frame_samples.to_le_bytes());

    // integer channels with size prefix
    for ch in &frame.channels {
        buffer.extend_from_slice(&(ch.byte_size() as u32).to_le_bytes());
        write_channel_data(buffer, ch);
    }

    // diff-float block
    buffer.extend_from_slice(&(frame.float_data.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&frame.float_data);
}

fn write_channel_data(buffer: &mut Vec<u8>, ch: &IntChannelData) {
    buffer.push(ch.predictor_order);
    if ch.is_silent() {
        return;
    }
    buffer.push(ch.wasted_bits);
    buffer.push(ch.rice_parameter);
    buffer.extend_from_slice(&ch.residuals);
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}
