use crate::config::AcfMode;

use super::quantize::{code_to_shift, shift_to_code};

/// Stored shift byte meaning "no shift sent since the last reset".
pub const SHIFT_UNSET: u8 = 255;

/// Longest wait between two failed multiplier searches, in frames.
pub const MAX_RETRY_COOLDOWN: u32 = 20;

/// What a channel carries from one frame to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFrameState {
    pub last_shift: u8,
    /// 0.0 searches on the next frame, 1.0 is the identity
    pub last_acf_gain: f32,
    pub acf_mode: AcfMode,
    /// failed searches in a row
    pub search_retry_count: u32,
    /// frames left before the next search
    pub retry_cooldown: u32,
}

impl ChannelFrameState {
    pub fn new(acf_mode: AcfMode) -> Self {
        ChannelFrameState {
            last_shift: SHIFT_UNSET,
            last_acf_gain: 0.0,
            acf_mode,
            search_retry_count: 0,
            retry_cooldown: 0,
        }
    }

    /// Back to the state of a stream start.
    pub fn reset(&mut self) {
        *self = Self::new(self.acf_mode);
    }

    pub fn shift(&self) -> Option<i32> {
        (self.last_shift != SHIFT_UNSET).then(|| code_to_shift(self.last_shift))
    }

    pub fn set_shift(&mut self, shift: i32) {
        self.last_shift = shift_to_code(shift);
    }

    /// A search (or reuse) found `a`.
    pub fn record_success(&mut self, a: f32) {
        self.last_acf_gain = a;
        self.search_retry_count = 0;
        self.retry_cooldown = 0;
    }

    /// A search found nothing: wait 1, 2, 4, ... frames before the next one.
    pub fn record_failure(&mut self) {
        self.last_acf_gain = 1.0;
        self.search_retry_count += 1;
        let wait = 1u32 << (self.search_retry_count - 1).min(5);
        self.retry_cooldown = wait.min(MAX_RETRY_COOLDOWN);
    }

    /// Count one frame off the cooldown; true while still waiting.
    pub fn cooling_down(&mut self) -> bool {
        if self.retry_cooldown == 0 {
            return false;
        }
        self.retry_cooldown -= 1;
        true
    }
}
