//! Pipeline orchestration: the [`Recorder`] owns the encoders, buffer pools,
//! worker threads and writer set, and exposes the ingestion surface and
//! lifecycle to the host application.

mod audio;
mod video;

use anyhow::{Context, Result};
use log::info;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::RecorderConfig;
use crate::encoder::CodecFactory;
use crate::format::{PixelFormat, PixelNormalizer};
use crate::state::RecorderState;
use crate::stats::{RecorderStats, StatsSummary};
use crate::texture::{TextureHandle, TextureReader};
use crate::writer::{FrameWriter, WriterSet};

use audio::AudioPipeline;
use video::VideoPipeline;

/// Bounded window after the workers join for writer-side asynchronous
/// completion to settle before the writers are dropped.
const WRITER_GRACE: Duration = Duration::from_millis(100);

/// Capture recorder: ingestion surface plus lifecycle.
///
/// One producer thread per media type pushes frames; a dedicated worker per
/// media type encodes them and fans the output out to every registered
/// writer. Within a media type frames are delivered in strict ingestion
/// order; across media types no ordering is guaranteed (writers track
/// per-track timestamps independently).
pub struct Recorder {
    video: Option<VideoPipeline>,
    audio: Option<AudioPipeline>,
    texture_reader: Option<Mutex<Box<dyn TextureReader>>>,
    writers: Arc<WriterSet>,
    stats: Arc<RecorderStats>,
    state: Mutex<RecorderState>,
    cancel: CancellationToken,
}

impl Recorder {
    /// Build the recorder and start its workers.
    ///
    /// For each enabled media type this constructs the codec backend through
    /// `codecs`, pre-fills the buffer pool and starts the worker thread.
    /// `normalizer` is required when video is enabled; `texture_reader` only
    /// for the texture ingestion path.
    pub fn new(
        config: RecorderConfig,
        codecs: &dyn CodecFactory,
        normalizer: Option<Box<dyn PixelNormalizer>>,
        texture_reader: Option<Box<dyn TextureReader>>,
    ) -> Result<Self> {
        config.validate()?;

        let writers = Arc::new(WriterSet::new());
        let stats = Arc::new(RecorderStats::new());

        let video = match &config.video {
            Some(video_config) => {
                let normalizer =
                    normalizer.context("video capture requires a pixel normalizer")?;
                let codec = codecs.create_video(video_config)?;
                Some(VideoPipeline::new(
                    video_config,
                    codec,
                    normalizer,
                    Arc::clone(&writers),
                    Arc::clone(&stats),
                )?)
            }
            None => None,
        };

        let audio = match &config.audio {
            Some(audio_config) => {
                let codec = codecs.create_audio(audio_config)?;
                Some(AudioPipeline::new(
                    audio_config,
                    codec,
                    Arc::clone(&writers),
                    Arc::clone(&stats),
                )?)
            }
            None => None,
        };

        info!(
            "recorder: running (video: {}, audio: {})",
            video.as_ref().map(|v| v.codec_id()).unwrap_or("off"),
            audio.as_ref().map(|a| a.codec_id()).unwrap_or("off"),
        );

        Ok(Self {
            video,
            audio,
            texture_reader: texture_reader.map(Mutex::new),
            writers,
            stats,
            state: Mutex::new(RecorderState::Running),
            cancel: CancellationToken::new(),
        })
    }

    /// Bind a new output sink. The currently configured codec identifiers
    /// are pushed to the writer immediately so it can emit correct track
    /// headers; it then receives every frame from this point forward (no
    /// backfill).
    pub fn add_output_stream(&self, mut writer: Box<dyn FrameWriter>) {
        if let Some(video) = &self.video {
            writer.bind_video_codec(video.codec_id());
        }
        if let Some(audio) = &self.audio {
            writer.bind_audio_codec(audio.codec_id());
        }
        self.writers.add(writer);
    }

    /// Read a frame out of a host texture and queue it for encoding.
    ///
    /// Blocks on buffer acquisition when all pooled buffers are in flight,
    /// and on the synchronous device readback. Returns false on a null
    /// handle, disabled video, missing texture reader or readback failure;
    /// in every failure case the pooled buffer is released and nothing is
    /// enqueued.
    pub fn add_video_frame_from_texture(
        &self,
        handle: TextureHandle,
        format: PixelFormat,
        timestamp: f64,
    ) -> bool {
        if self.cancel.is_cancelled() || handle.is_null() {
            return false;
        }
        let (Some(video), Some(reader)) = (&self.video, &self.texture_reader) else {
            return false;
        };
        let mut reader = reader.lock().unwrap();
        video.add_frame_from_texture(reader.as_mut(), handle, format, timestamp)
    }

    /// Copy a raw pixel frame and queue it for encoding. Blocks on buffer
    /// acquisition when the pool is exhausted.
    pub fn add_video_frame_from_pixels(
        &self,
        pixels: &[u8],
        format: PixelFormat,
        timestamp: f64,
    ) -> bool {
        if self.cancel.is_cancelled() || pixels.is_empty() {
            return false;
        }
        match &self.video {
            Some(video) => video.add_frame_from_pixels(pixels, format, timestamp),
            None => false,
        }
    }

    /// Copy an interleaved sample buffer and queue it for encoding.
    pub fn add_audio_frame(&self, samples: &[f32]) -> bool {
        if self.cancel.is_cancelled() || samples.is_empty() {
            return false;
        }
        match &self.audio {
            Some(audio) => audio.add_frame(samples),
            None => false,
        }
    }

    /// Queue a task that drains codec-buffered video frames through the
    /// normal fan-out path.
    pub fn flush_video(&self) {
        if let Some(video) = &self.video {
            video.flush();
        }
    }

    pub fn flush_audio(&self) {
        if let Some(audio) = &self.audio {
            audio.flush();
        }
    }

    /// Request that the next encoded video frame be an intra frame.
    pub fn request_keyframe(&self) {
        if let Some(video) = &self.video {
            video.request_keyframe();
        }
    }

    pub fn state(&self) -> RecorderState {
        *self.state.lock().unwrap()
    }

    pub fn stats(&self) -> StatsSummary {
        self.stats.summary()
    }

    /// Drain and stop.
    ///
    /// Queues a final flush for each enabled media type, closes the task
    /// queues and joins the workers; everything enqueued before this call is
    /// fully encoded and delivered before the workers exit. After a bounded
    /// grace period the writers are dropped. Idempotent.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.state.lock().unwrap();
            if !state.can_transition_to(&RecorderState::Flushing) {
                return;
            }
            *state = RecorderState::Flushing;
        }
        info!("recorder: shutting down, draining pipelines");

        // Flush tasks go in before the queues close, so they run last.
        self.flush_video();
        self.flush_audio();
        self.cancel.cancel();

        if let Some(mut video) = self.video.take() {
            video.stop();
        }
        if let Some(mut audio) = self.audio.take() {
            audio.stop();
        }

        thread::sleep(WRITER_GRACE);
        self.writers.clear();

        *self.state.lock().unwrap() = RecorderState::Stopped;
        info!("recorder: stopped ({})", self.stats.summary());
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}
