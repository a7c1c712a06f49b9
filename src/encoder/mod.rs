//! Encoder abstraction: codec-backend traits plus the stateful wrappers that
//! own timestamp bookkeeping and block gathering.

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

use anyhow::Result;

use crate::config::{AudioConfig, VideoConfig};
use crate::format::I420Planes;
use crate::frame::EncodedFrame;

/// Nominal frame interval substituted when two consecutive timestamps are
/// identical or out of order: one 60 Hz frame, in nanoseconds.
pub(crate) const DEFAULT_FRAME_INTERVAL_NS: i64 = 1_000_000_000 / 60;

/// Video codec selection. Decided once at construction, never re-dispatched
/// per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodecKind {
    Vp8,
    Vp9,
}

impl VideoCodecKind {
    /// Stable identifier used by writers for container track metadata.
    pub fn codec_id(self) -> &'static str {
        match self {
            VideoCodecKind::Vp8 => "V_VP8",
            VideoCodecKind::Vp9 => "V_VP9",
        }
    }
}

/// Audio codec selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodecKind {
    Vorbis,
    Opus,
}

impl AudioCodecKind {
    pub fn codec_id(self) -> &'static str {
        match self {
            AudioCodecKind::Vorbis => "A_VORBIS",
            AudioCodecKind::Opus => "A_OPUS",
        }
    }
}

/// One compressed block produced by a codec backend.
#[derive(Debug, Clone)]
pub struct CodecPacket {
    pub data: Vec<u8>,
    /// Presentation timestamp in nanoseconds.
    pub pts: i64,
    pub keyframe: bool,
}

/// Video bitstream backend (external collaborator).
///
/// Implementations own the codec state and bitstream internals; the pipeline
/// owns timestamps, durations and block gathering. A call may return zero or
/// more packets since codecs buffer internally and can emit packets from
/// earlier pictures. Never called concurrently on the same instance.
pub trait VideoCodec: Send {
    fn encode(
        &mut self,
        image: I420Planes<'_>,
        pts: i64,
        duration: i64,
        force_keyframe: bool,
    ) -> Result<Vec<CodecPacket>>;

    /// Force the codec to emit any internally buffered packets.
    fn flush(&mut self) -> Result<Vec<CodecPacket>>;
}

/// Audio bitstream backend (external collaborator).
pub trait AudioCodec: Send {
    fn encode(&mut self, samples: &[f32]) -> Result<Vec<CodecPacket>>;

    fn flush(&mut self) -> Result<Vec<CodecPacket>>;
}

/// Builds codec backends from the recorder configuration.
pub trait CodecFactory {
    fn create_video(&self, config: &VideoConfig) -> Result<Box<dyn VideoCodec>>;

    fn create_audio(&self, config: &AudioConfig) -> Result<Box<dyn AudioCodec>>;
}

/// Stateful video encoder: converts ingestion timestamps into the codec's
/// integer time base, computes per-sample durations and gathers emitted
/// packets into an [`EncodedFrame`].
pub struct VideoEncoder {
    codec: Box<dyn VideoCodec>,
    codec_id: &'static str,
    prev_timestamp: f64,
}

impl VideoEncoder {
    pub fn new(codec: Box<dyn VideoCodec>, kind: VideoCodecKind) -> Self {
        Self { codec, codec_id: kind.codec_id(), prev_timestamp: 0.0 }
    }

    pub fn codec_id(&self) -> &'static str {
        self.codec_id
    }

    /// Encode one picture at `timestamp` (seconds), appending any emitted
    /// blocks to `dst`.
    ///
    /// The sample duration is the delta from the previous timestamp; a zero
    /// or negative delta (duplicate or out-of-order timestamp) falls back to
    /// the nominal 60 Hz interval so no block ever carries a zero or negative
    /// duration.
    pub fn encode(
        &mut self,
        dst: &mut EncodedFrame,
        image: I420Planes<'_>,
        timestamp: f64,
        force_keyframe: bool,
    ) -> Result<()> {
        let pts = (timestamp * 1_000_000_000.0) as i64;
        let mut duration = ((timestamp - self.prev_timestamp) * 1_000_000_000.0) as i64;
        if duration <= 0 {
            duration = DEFAULT_FRAME_INTERVAL_NS;
        }
        self.prev_timestamp = timestamp;

        let packets = self.codec.encode(image, pts, duration, force_keyframe)?;
        gather(dst, packets);
        Ok(())
    }

    /// Drain codec-buffered frames without new input.
    pub fn flush(&mut self, dst: &mut EncodedFrame) -> Result<()> {
        let packets = self.codec.flush()?;
        gather(dst, packets);
        Ok(())
    }
}

/// Stateful audio encoder; same block and identifier contract as video, but
/// operates directly on raw interleaved samples.
pub struct AudioEncoder {
    codec: Box<dyn AudioCodec>,
    codec_id: &'static str,
}

impl AudioEncoder {
    pub fn new(codec: Box<dyn AudioCodec>, kind: AudioCodecKind) -> Self {
        Self { codec, codec_id: kind.codec_id() }
    }

    pub fn codec_id(&self) -> &'static str {
        self.codec_id
    }

    pub fn encode(&mut self, dst: &mut EncodedFrame, samples: &[f32]) -> Result<()> {
        let packets = self.codec.encode(samples)?;
        gather(dst, packets);
        Ok(())
    }

    pub fn flush(&mut self, dst: &mut EncodedFrame) -> Result<()> {
        let packets = self.codec.flush()?;
        gather(dst, packets);
        Ok(())
    }
}

fn gather(dst: &mut EncodedFrame, packets: Vec<CodecPacket>) {
    for packet in packets {
        dst.push_block(&packet.data, packet.pts, packet.keyframe);
    }
}
