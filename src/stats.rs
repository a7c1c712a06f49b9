//! Encoding counters for a recorder

use std::sync::atomic::{AtomicU64, Ordering};

use crate::frame::EncodedFrame;

/// Counters tracked across a recorder's lifetime.
///
/// All fields use atomic operations; the video and audio workers update them
/// concurrently and callers may read them from any thread.
#[derive(Default)]
pub struct RecorderStats {
    /// Encoded frames fanned out to writers, per media type.
    video_frames: AtomicU64,
    audio_frames: AtomicU64,

    /// Keyframe blocks emitted.
    keyframes: AtomicU64,

    /// Total encoded payload bytes.
    bytes_encoded: AtomicU64,

    /// Frames dropped because the codec reported a failure.
    encode_failures: AtomicU64,
}

impl RecorderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_video_frame(&self, frame: &EncodedFrame) {
        self.video_frames.fetch_add(1, Ordering::Relaxed);
        self.record_blocks(frame);
    }

    pub(crate) fn record_audio_frame(&self, frame: &EncodedFrame) {
        self.audio_frames.fetch_add(1, Ordering::Relaxed);
        self.record_blocks(frame);
    }

    pub(crate) fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_blocks(&self, frame: &EncodedFrame) {
        self.bytes_encoded.fetch_add(frame.data.len() as u64, Ordering::Relaxed);
        let keyframes = frame.blocks.iter().filter(|b| b.keyframe).count() as u64;
        if keyframes > 0 {
            self.keyframes.fetch_add(keyframes, Ordering::Relaxed);
        }
    }

    pub fn video_frames(&self) -> u64 {
        self.video_frames.load(Ordering::Relaxed)
    }

    pub fn audio_frames(&self) -> u64 {
        self.audio_frames.load(Ordering::Relaxed)
    }

    pub fn keyframes(&self) -> u64 {
        self.keyframes.load(Ordering::Relaxed)
    }

    pub fn bytes_encoded(&self) -> u64 {
        self.bytes_encoded.load(Ordering::Relaxed)
    }

    pub fn encode_failures(&self) -> u64 {
        self.encode_failures.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            video_frames: self.video_frames(),
            audio_frames: self.audio_frames(),
            keyframes: self.keyframes(),
            bytes_encoded: self.bytes_encoded(),
            encode_failures: self.encode_failures(),
        }
    }
}

/// Snapshot of recorder counters.
#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub video_frames: u64,
    pub audio_frames: u64,
    pub keyframes: u64,
    pub bytes_encoded: u64,
    pub encode_failures: u64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} video frames, {} audio frames, {} keyframes, {} bytes, {} encode failures",
            self.video_frames, self.audio_frames, self.keyframes, self.bytes_encoded,
            self.encode_failures
        )
    }
}
