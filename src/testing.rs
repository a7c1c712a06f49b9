//! Shared test doubles: scripted codec backends, a recording writer and
//! trivial normalizer/readback stand-ins.

use anyhow::{Context, Result, anyhow};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::{AudioConfig, VideoConfig};
use crate::encoder::{AudioCodec, CodecFactory, CodecPacket, VideoCodec};
use crate::format::{I420Image, I420Planes, PixelFormat, PixelNormalizer};
use crate::frame::EncodedFrame;
use crate::texture::{TextureHandle, TextureReader};
use crate::writer::FrameWriter;

/// One recorded call into [`MockVideoCodec::encode`].
#[derive(Debug, Clone)]
pub(crate) struct EncodeCall {
    pub pts: i64,
    pub duration: i64,
    pub force_keyframe: bool,
    /// First bytes of the luma plane, to trace which pixels reached the codec.
    pub luma_head: [u8; 4],
}

/// Scripted video backend: records every call and emits one packet per
/// picture (keyframe on the first picture or when forced).
pub(crate) struct MockVideoCodec {
    calls: Arc<Mutex<Vec<EncodeCall>>>,
    delay: Option<Duration>,
    fail_on: Option<usize>,
    buffering: bool,
    held: Vec<CodecPacket>,
    encoded: usize,
}

impl MockVideoCodec {
    pub fn new() -> (Self, Arc<Mutex<Vec<EncodeCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let codec = Self {
            calls: Arc::clone(&calls),
            delay: None,
            fail_on: None,
            buffering: false,
            held: Vec::new(),
            encoded: 0,
        };
        (codec, calls)
    }

    /// Sleep this long inside every encode call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the encode call with this zero-based index.
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on = Some(call);
        self
    }

    /// Withhold packets until `flush`, like a codec with lookahead.
    pub fn buffering_one(mut self) -> Self {
        self.buffering = true;
        self
    }
}

impl VideoCodec for MockVideoCodec {
    fn encode(
        &mut self,
        image: I420Planes<'_>,
        pts: i64,
        duration: i64,
        force_keyframe: bool,
    ) -> Result<Vec<CodecPacket>> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        let mut luma_head = [0u8; 4];
        let head = image.y.len().min(4);
        luma_head[..head].copy_from_slice(&image.y[..head]);
        self.calls.lock().unwrap().push(EncodeCall { pts, duration, force_keyframe, luma_head });

        let index = self.encoded;
        self.encoded += 1;
        if self.fail_on == Some(index) {
            return Err(anyhow!("scripted encode failure on call {index}"));
        }

        let packet = CodecPacket {
            data: vec![index as u8; 16],
            pts,
            keyframe: index == 0 || force_keyframe,
        };
        if self.buffering {
            self.held.push(packet);
            Ok(Vec::new())
        } else {
            Ok(vec![packet])
        }
    }

    fn flush(&mut self) -> Result<Vec<CodecPacket>> {
        Ok(std::mem::take(&mut self.held))
    }
}

/// Scripted audio backend: records the sample count of every call and emits
/// one packet per buffer.
pub(crate) struct MockAudioCodec {
    calls: Arc<Mutex<Vec<usize>>>,
    encoded: usize,
}

impl MockAudioCodec {
    pub fn new() -> (Self, Arc<Mutex<Vec<usize>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (Self { calls: Arc::clone(&calls), encoded: 0 }, calls)
    }
}

impl AudioCodec for MockAudioCodec {
    fn encode(&mut self, samples: &[f32]) -> Result<Vec<CodecPacket>> {
        self.calls.lock().unwrap().push(samples.len());
        let index = self.encoded;
        self.encoded += 1;
        Ok(vec![CodecPacket {
            data: vec![0xAA; 8],
            pts: index as i64 * 20_000_000,
            keyframe: true,
        }])
    }

    fn flush(&mut self) -> Result<Vec<CodecPacket>> {
        Ok(Vec::new())
    }
}

/// Hands out pre-staged mock backends, once each.
pub(crate) struct MockCodecFactory {
    video: Mutex<Option<MockVideoCodec>>,
    audio: Mutex<Option<MockAudioCodec>>,
}

impl MockCodecFactory {
    pub fn new() -> Self {
        Self { video: Mutex::new(None), audio: Mutex::new(None) }
    }

    pub fn with_video(codec: MockVideoCodec) -> Self {
        let factory = Self::new();
        *factory.video.lock().unwrap() = Some(codec);
        factory
    }

    pub fn and_audio(self, codec: MockAudioCodec) -> Self {
        *self.audio.lock().unwrap() = Some(codec);
        self
    }
}

impl CodecFactory for MockCodecFactory {
    fn create_video(&self, _config: &VideoConfig) -> Result<Box<dyn VideoCodec>> {
        let codec = self.video.lock().unwrap().take().context("no video codec staged")?;
        Ok(Box::new(codec))
    }

    fn create_audio(&self, _config: &AudioConfig) -> Result<Box<dyn AudioCodec>> {
        let codec = self.audio.lock().unwrap().take().context("no audio codec staged")?;
        Ok(Box::new(codec))
    }
}

/// Everything a [`MockWriter`] has been handed.
#[derive(Default)]
pub(crate) struct WriterLog {
    pub video: Vec<EncodedFrame>,
    pub audio: Vec<EncodedFrame>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

/// Writer that clones every delivery into a shared log.
pub(crate) struct MockWriter {
    log: Arc<Mutex<WriterLog>>,
}

impl MockWriter {
    pub fn new() -> (Self, Arc<Mutex<WriterLog>>) {
        let log = Arc::new(Mutex::new(WriterLog::default()));
        (Self { log: Arc::clone(&log) }, log)
    }
}

impl FrameWriter for MockWriter {
    fn bind_video_codec(&mut self, codec_id: &str) {
        self.log.lock().unwrap().video_codec = Some(codec_id.to_owned());
    }

    fn bind_audio_codec(&mut self, codec_id: &str) {
        self.log.lock().unwrap().audio_codec = Some(codec_id.to_owned());
    }

    fn add_video_frame(&mut self, frame: &EncodedFrame) {
        self.log.lock().unwrap().video.push(frame.clone());
    }

    fn add_audio_frame(&mut self, frame: &EncodedFrame) {
        self.log.lock().unwrap().audio.push(frame.clone());
    }
}

/// Byte-shuffling normalizer stand-in. Not colorimetrically meaningful, just
/// deterministic: packed conversion keeps the leading byte of each channel,
/// RGBA to I420 maps R to luma and the top-left G/B of each 2x2 to chroma.
pub(crate) struct NaiveNormalizer;

impl PixelNormalizer for NaiveNormalizer {
    fn convert(
        &mut self,
        dst: &mut [u8],
        dst_format: PixelFormat,
        src: &[u8],
        src_format: PixelFormat,
        pixel_count: usize,
    ) {
        let dst_bpp = dst_format.bytes_per_pixel().unwrap();
        let src_bpp = src_format.bytes_per_pixel().unwrap();
        let src_channel = src_bpp / 4;
        for px in 0..pixel_count {
            for ch in 0..4 {
                dst[px * dst_bpp + ch] = src[px * src_bpp + ch * src_channel];
            }
        }
    }

    fn rgba_to_i420(&mut self, dst: &mut I420Image, rgba: &[u8], width: usize, height: usize) {
        dst.resize(width, height);
        for i in 0..width * height {
            dst.y[i] = rgba[i * 4];
        }
        let half_width = width / 2;
        for cy in 0..height / 2 {
            for cx in 0..half_width {
                let src = (cy * 2 * width + cx * 2) * 4;
                dst.u[cy * half_width + cx] = rgba[src + 1];
                dst.v[cy * half_width + cx] = rgba[src + 2];
            }
        }
    }
}

/// Readback stand-in that fills the destination with a marker byte.
pub(crate) struct FillReader(pub u8);

impl TextureReader for FillReader {
    fn read(
        &mut self,
        dst: &mut [u8],
        _handle: TextureHandle,
        _width: usize,
        _height: usize,
        _format: PixelFormat,
    ) -> bool {
        dst.fill(self.0);
        true
    }
}

/// Readback stand-in that always fails.
pub(crate) struct FailingReader;

impl TextureReader for FailingReader {
    fn read(
        &mut self,
        _dst: &mut [u8],
        _handle: TextureHandle,
        _width: usize,
        _height: usize,
        _format: PixelFormat,
    ) -> bool {
        false
    }
}
