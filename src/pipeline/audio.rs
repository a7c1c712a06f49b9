//! Audio half of the pipeline. Structurally the video half without the
//! normalization stage: samples are encoded as-is.

use anyhow::Result;
use log::debug;
use std::sync::Arc;

use crate::config::AudioConfig;
use crate::encoder::{AudioCodec, AudioEncoder};
use crate::frame::EncodedFrame;
use crate::pool::{BufferPool, POOL_DEPTH};
use crate::stats::RecorderStats;
use crate::worker::TaskWorker;
use crate::writer::WriterSet;

pub(crate) enum AudioTask {
    Encode { samples: Vec<f32> },
    Flush,
}

pub(crate) struct AudioPipeline {
    pool: BufferPool<Vec<f32>>,
    worker: TaskWorker<AudioTask>,
    codec_id: &'static str,
}

impl AudioPipeline {
    pub fn new(
        config: &AudioConfig,
        codec: Box<dyn AudioCodec>,
        writers: Arc<WriterSet>,
        stats: Arc<RecorderStats>,
    ) -> Result<Self> {
        let codec_id = config.codec.codec_id();

        // Room for ~20ms of samples at typical rates before the first grow.
        let sample_hint = config.sample_rate as usize * config.channels as usize / 50;
        let pool = BufferPool::new(POOL_DEPTH, || Vec::with_capacity(sample_hint));

        let mut state = WorkerState {
            encoder: AudioEncoder::new(codec, config.codec),
            frame: EncodedFrame::new(),
            writers,
            pool: pool.clone(),
            stats,
        };
        let worker = TaskWorker::spawn("framecast-audio", move |task| state.handle(task))?;

        Ok(Self { pool, worker, codec_id })
    }

    pub fn codec_id(&self) -> &'static str {
        self.codec_id
    }

    /// Copy a sample buffer into a pooled buffer and queue the encode.
    pub fn add_frame(&self, samples: &[f32]) -> bool {
        if samples.is_empty() {
            return false;
        }

        let mut buffer = self.pool.acquire();
        buffer.clear();
        buffer.extend_from_slice(samples);

        match self.worker.enqueue(AudioTask::Encode { samples: buffer }) {
            Ok(()) => true,
            Err(AudioTask::Encode { samples }) => {
                self.pool.release(samples);
                false
            }
            Err(AudioTask::Flush) => false,
        }
    }

    pub fn flush(&self) {
        let _ = self.worker.enqueue(AudioTask::Flush);
    }

    pub fn stop(&mut self) {
        self.worker.stop();
    }
}

struct WorkerState {
    encoder: AudioEncoder,
    frame: EncodedFrame,
    writers: Arc<WriterSet>,
    pool: BufferPool<Vec<f32>>,
    stats: Arc<RecorderStats>,
}

impl WorkerState {
    fn handle(&mut self, task: AudioTask) {
        match task {
            AudioTask::Encode { samples } => {
                match self.encoder.encode(&mut self.frame, &samples) {
                    Ok(()) => self.dispatch(),
                    Err(err) => {
                        debug!("audio: encode failed: {err}");
                        self.stats.record_encode_failure();
                        self.frame.clear();
                    }
                }
                self.pool.release(samples);
            }
            AudioTask::Flush => match self.encoder.flush(&mut self.frame) {
                Ok(()) => self.dispatch(),
                Err(err) => {
                    debug!("audio: flush failed: {err}");
                    self.frame.clear();
                }
            },
        }
    }

    fn dispatch(&mut self) {
        self.writers.each(|writer| writer.add_audio_frame(&self.frame));
        self.stats.record_audio_frame(&self.frame);
        self.frame.clear();
    }
}
