//! Asynchronous encoding pipeline for live video and audio capture.
//!
//! A host application pushes raw frames through the [`Recorder`] ingestion
//! surface; dedicated per-media-type worker threads encode them and fan the
//! encoded output out to every registered [`FrameWriter`]. Producers are
//! throttled by a fixed-depth buffer pool instead of unbounded queueing, and
//! shutdown always drains pending work before the workers exit.

pub mod config;
pub mod encoder;
pub mod format;
pub mod frame;
pub mod pipeline;
pub mod pool;
pub mod state;
pub mod stats;
pub mod texture;
pub(crate) mod worker;
pub mod writer;

pub use config::{AudioConfig, RecorderConfig, VideoConfig};
pub use encoder::{
    AudioCodec, AudioCodecKind, AudioEncoder, CodecFactory, CodecPacket, VideoCodec,
    VideoCodecKind, VideoEncoder,
};
pub use format::{I420Image, I420Planes, PixelFormat, PixelNormalizer};
pub use frame::{EncodedBlock, EncodedFrame};
pub use pipeline::Recorder;
pub use state::RecorderState;
pub use stats::{RecorderStats, StatsSummary};
pub use texture::{TextureHandle, TextureReader};
pub use writer::FrameWriter;

#[cfg(feature = "ffmpeg")]
pub use encoder::ffmpeg::FfmpegCodecFactory;

#[cfg(test)]
pub(crate) mod testing;
