//! common types for the alsf container

// constants

/// Magic number "ALSF"
pub const MAGIC: [u8; 4] = [0x41, 0x4c, 0x53, 0x46];

/// header size (excludes magic)
pub const HEADER_SIZE: u64 = 4 + 4 + 1 + 1 + 4 + 2 + 8 + 32 + 8 + 8 + 8;

/// format version
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;

/// bytes per toc entry
pub const TOC_ENTRY_SIZE: u64 = 4 + 8 + 4 + 8 + 1;

/// frame flag: decodable without any earlier frame
pub const FRAME_FLAG_RANDOM_ACCESS: u8 = 0x01;

/// predictor marker for a channel whose integers are all zero
pub const PREDICTOR_SILENT: u8 = 0xFF;

// data structures

/// alsf stream header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: u16,
    pub sample_rate: u32,
    pub channels: u8,
    pub int_resolution: u8,
    pub frame_size: u32,
    pub random_access_interval: u16,
    pub total_samples: u64,
    pub data_digest: [u8; 32],
    pub toc_size: u64,
    pub data_size: u64,
    pub meta_size: u64,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            flags: 0,
            sample_rate: 44100,
            channels: 1,
            int_resolution: 24,
            frame_size: 2048,
            random_access_interval: 10,
            total_samples: 0,
            data_digest: [0; 32],
            toc_size: 0,
            data_size: 0,
            meta_size: 0,
        }
    }
}

impl Header {
    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.total_samples as f64 / self.sample_rate as f64
        }
    }

    /// Byte offset of the data chunk from the start of the stream.
    pub fn data_offset(&self) -> usize {
        (MAGIC.len() as u64 + HEADER_SIZE + self.toc_size) as usize
    }
}

/// toc entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub frame_index: u32,
    pub byte_offset: u64,
    pub frame_size: u32,
    pub sample_offset: u64,
    pub random_access: bool,
}

/// integer PCM of one channel within a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntChannelData {
    /// fixed predictor order 0-4, or `PREDICTOR_SILENT`
    pub predictor_order: u8,
    /// trailing zero bits shared by every integer, shifted out before coding
    pub wasted_bits: u8,
    pub rice_parameter: u8,
    pub residuals: Vec<u8>,
}

impl IntChannelData {
    pub fn new_silence() -> Self {
        IntChannelData {
            predictor_order: PREDICTOR_SILENT,
            wasted_bits: 0,
            rice_parameter: 0,
            residuals: vec![],
        }
    }

    pub fn is_silent(&self) -> bool {
        self.predictor_order == PREDICTOR_SILENT
    }

    /// serialized size without the size prefix
    pub fn byte_size(&self) -> usize {
        if self.is_silent() {
            1
        } else {
            3 + self.residuals.len()
        }
    }
}

/// one coded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flags: u8,
    pub frame_samples: u32,
    pub channels: Vec<IntChannelData>,
    /// diff-float block covering every channel
    pub float_data: Vec<u8>,
}

impl Frame {
    pub fn new(flags: u8, frame_samples: u32) -> Self {
        Frame {
            flags,
            frame_samples,
            channels: vec![],
            float_data: vec![],
        }
    }

    pub fn is_random_access(&self) -> bool {
        self.flags & FRAME_FLAG_RANDOM_ACCESS != 0
    }

    /// byte size of this frame
    pub fn byte_size(&self) -> usize {
        let mut size = 5; // flags + sample count
        for ch in &self.channels {
            size += 4 + ch.byte_size();
        }
        size + 4 + self.float_data.len()
    }
}

/// complete decoded alsf stream
#[derive(Debug, Clone)]
pub struct AlsfFile {
    pub header: Header,
    pub toc: Vec<TocEntry>,
    pub frames: Vec<Frame>,
    pub metadata: Vec<u8>,
}

/// Digest of a data chunk as stored in the header.
pub fn data_digest(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}
