//! Video half of the pipeline: buffer pool, worker thread, normalization and
//! encode-then-fan-out.

use anyhow::Result;
use bytes::BytesMut;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::VideoConfig;
use crate::encoder::{VideoCodec, VideoEncoder};
use crate::format::{I420Image, I420Planes, PixelFormat, PixelNormalizer};
use crate::frame::EncodedFrame;
use crate::pool::{BufferPool, POOL_DEPTH};
use crate::stats::RecorderStats;
use crate::texture::{TextureHandle, TextureReader};
use crate::worker::TaskWorker;
use crate::writer::WriterSet;

pub(crate) enum VideoTask {
    Encode { buffer: BytesMut, format: PixelFormat, timestamp: f64 },
    Flush,
}

pub(crate) struct VideoPipeline {
    pool: BufferPool<BytesMut>,
    worker: TaskWorker<VideoTask>,
    force_keyframe: Arc<AtomicBool>,
    codec_id: &'static str,
    width: usize,
    height: usize,
}

impl VideoPipeline {
    pub fn new(
        config: &VideoConfig,
        codec: Box<dyn VideoCodec>,
        normalizer: Box<dyn PixelNormalizer>,
        writers: Arc<WriterSet>,
        stats: Arc<RecorderStats>,
    ) -> Result<Self> {
        let width = config.width as usize;
        let height = config.height as usize;
        let codec_id = config.codec.codec_id();
        let force_keyframe = Arc::new(AtomicBool::new(false));

        // Pre-size for the common RGBA case; other formats grow once.
        let pool = BufferPool::new(POOL_DEPTH, || {
            BytesMut::with_capacity(PixelFormat::Rgba8.frame_bytes(width, height))
        });

        let mut state = WorkerState {
            encoder: VideoEncoder::new(codec, config.codec),
            normalizer,
            rgba_scratch: BytesMut::new(),
            i420_scratch: I420Image::default(),
            frame: EncodedFrame::new(),
            writers,
            pool: pool.clone(),
            stats,
            force_keyframe: Arc::clone(&force_keyframe),
            width,
            height,
        };
        let worker = TaskWorker::spawn("framecast-video", move |task| state.handle(task))?;

        Ok(Self { pool, worker, force_keyframe, codec_id, width, height })
    }

    pub fn codec_id(&self) -> &'static str {
        self.codec_id
    }

    /// Next encode produces an intra frame.
    pub fn request_keyframe(&self) {
        self.force_keyframe.store(true, Ordering::Relaxed);
    }

    /// Read a host texture into a pooled buffer and queue the encode.
    ///
    /// The readback is synchronous; this blocks the producer for the device
    /// wait. On readback failure the buffer is released before returning,
    /// the same policy as every other pre-encode failure.
    pub fn add_frame_from_texture(
        &self,
        reader: &mut dyn TextureReader,
        handle: TextureHandle,
        format: PixelFormat,
        timestamp: f64,
    ) -> bool {
        let size = format.frame_bytes(self.width, self.height);
        let mut buffer = self.pool.acquire();
        buffer.resize(size, 0);

        if !reader.read(&mut buffer, handle, self.width, self.height, format) {
            debug!("video: texture readback failed, dropping frame at t={timestamp}");
            self.pool.release(buffer);
            return false;
        }

        self.enqueue_encode(buffer, format, timestamp)
    }

    /// Copy raw pixels into a pooled buffer and queue the encode.
    pub fn add_frame_from_pixels(
        &self,
        pixels: &[u8],
        format: PixelFormat,
        timestamp: f64,
    ) -> bool {
        let size = format.frame_bytes(self.width, self.height);
        if pixels.len() < size {
            return false;
        }

        let mut buffer = self.pool.acquire();
        buffer.clear();
        buffer.extend_from_slice(&pixels[..size]);

        self.enqueue_encode(buffer, format, timestamp)
    }

    pub fn flush(&self) {
        let _ = self.worker.enqueue(VideoTask::Flush);
    }

    /// Close the queue and wait for the worker to drain and exit.
    pub fn stop(&mut self) {
        self.worker.stop();
    }

    fn enqueue_encode(&self, buffer: BytesMut, format: PixelFormat, timestamp: f64) -> bool {
        match self.worker.enqueue(VideoTask::Encode { buffer, format, timestamp }) {
            Ok(()) => true,
            Err(VideoTask::Encode { buffer, .. }) => {
                // Worker already stopped; keep the pool invariant intact.
                self.pool.release(buffer);
                false
            }
            Err(VideoTask::Flush) => false,
        }
    }
}

/// State owned by the video worker thread.
struct WorkerState {
    encoder: VideoEncoder,
    normalizer: Box<dyn PixelNormalizer>,
    rgba_scratch: BytesMut,
    i420_scratch: I420Image,
    frame: EncodedFrame,
    writers: Arc<WriterSet>,
    pool: BufferPool<BytesMut>,
    stats: Arc<RecorderStats>,
    force_keyframe: Arc<AtomicBool>,
    width: usize,
    height: usize,
}

impl WorkerState {
    fn handle(&mut self, task: VideoTask) {
        match task {
            VideoTask::Encode { buffer, format, timestamp } => {
                self.encode(&buffer, format, timestamp);
                self.pool.release(buffer);
            }
            VideoTask::Flush => match self.encoder.flush(&mut self.frame) {
                Ok(()) => self.dispatch(),
                Err(err) => {
                    debug!("video: flush failed: {err}");
                    self.frame.clear();
                }
            },
        }
    }

    fn encode(&mut self, buffer: &[u8], format: PixelFormat, timestamp: f64) {
        let force_keyframe = self.force_keyframe.swap(false, Ordering::Relaxed);

        let image = match format {
            // Already planar: reinterpret in place, no copy.
            PixelFormat::I420 => I420Planes::split(buffer, self.width, self.height),
            // The encoder's natural intermediate format converts directly.
            PixelFormat::Rgba8 => {
                self.i420_scratch.resize(self.width, self.height);
                self.normalizer.rgba_to_i420(&mut self.i420_scratch, buffer, self.width, self.height);
                self.i420_scratch.planes()
            }
            // Two-step path: source -> RGBA8 -> I420, both scratches reused.
            other => {
                let pixel_count = self.width * self.height;
                self.rgba_scratch.resize(pixel_count * 4, 0);
                self.normalizer.convert(
                    &mut self.rgba_scratch,
                    PixelFormat::Rgba8,
                    buffer,
                    other,
                    pixel_count,
                );
                self.i420_scratch.resize(self.width, self.height);
                self.normalizer.rgba_to_i420(
                    &mut self.i420_scratch,
                    &self.rgba_scratch,
                    self.width,
                    self.height,
                );
                self.i420_scratch.planes()
            }
        };

        match self.encoder.encode(&mut self.frame, image, timestamp, force_keyframe) {
            Ok(()) => self.dispatch(),
            Err(err) => {
                // Frame is dropped; no partial data reaches any writer and
                // the worker moves on to the next task.
                debug!("video: encode failed at t={timestamp}: {err}");
                self.stats.record_encode_failure();
                self.frame.clear();
            }
        }
    }

    fn dispatch(&mut self) {
        self.writers.each(|writer| writer.add_video_frame(&self.frame));
        self.stats.record_video_frame(&self.frame);
        self.frame.clear();
    }
}
