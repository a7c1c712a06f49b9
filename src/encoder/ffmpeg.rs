//! FFmpeg-backed codec backends (libvpx for video, libvorbis/libopus for
//! audio). Only compiled with the `ffmpeg` feature; the rest of the crate has
//! no native dependencies.

use ac_ffmpeg::codec::audio::frame::get_sample_format;
use ac_ffmpeg::codec::audio::{AudioFrameMut, ChannelLayout};
use ac_ffmpeg::codec::video::frame::{PictureType, get_pixel_format};
use ac_ffmpeg::codec::video::{self as video, VideoFrameMut};
use ac_ffmpeg::codec::{Encoder, audio};
use ac_ffmpeg::time::{TimeBase, Timestamp};
use anyhow::{Context, Result};
use log::info;

use crate::config::{AudioConfig, VideoConfig};
use crate::encoder::{
    AudioCodec, AudioCodecKind, CodecFactory, CodecPacket, VideoCodec, VideoCodecKind,
};
use crate::format::I420Planes;

/// One-pass realtime libvpx settings: no lookahead, no alt-ref lag, quality
/// traded for speed.
const VPX_OPTIONS: &[(&str, &str)] = &[
    ("deadline", "realtime"),
    ("cpu-used", "8"),
    ("lag-in-frames", "0"),
];

pub struct FfmpegCodecFactory;

impl CodecFactory for FfmpegCodecFactory {
    fn create_video(&self, config: &VideoConfig) -> Result<Box<dyn VideoCodec>> {
        let codec_name = match config.codec {
            VideoCodecKind::Vp8 => "libvpx",
            VideoCodecKind::Vp9 => "libvpx-vp9",
        };
        // Nanosecond time base, so frame pts values pass through unscaled.
        let time_base = TimeBase::new(1, 1_000_000_000);
        let pixel_format = get_pixel_format("yuv420p");

        let mut builder = video::VideoEncoder::builder(codec_name)
            .with_context(|| format!("codec {codec_name} not available"))?
            .pixel_format(pixel_format)
            .width(config.width as usize)
            .height(config.height as usize)
            .time_base(time_base)
            .set_option("b", &config.bitrate.to_string());
        for (k, v) in VPX_OPTIONS {
            builder = builder.set_option(k, v);
        }
        let encoder = builder
            .build()
            .with_context(|| format!("failed to initialize {codec_name}"))?;
        info!("video backend: {codec_name} {}x{}", config.width, config.height);

        Ok(Box::new(FfmpegVideoCodec {
            encoder,
            time_base,
            pixel_format,
            width: config.width as usize,
            height: config.height as usize,
        }))
    }

    fn create_audio(&self, config: &AudioConfig) -> Result<Box<dyn AudioCodec>> {
        // libvorbis only takes planar floats; libopus takes interleaved.
        let (codec_name, sample_format, planar) = match config.codec {
            AudioCodecKind::Vorbis => ("libvorbis", "fltp", true),
            AudioCodecKind::Opus => ("libopus", "flt", false),
        };
        let channels = config.channels as u32;
        let encoder = audio::AudioEncoder::builder(codec_name)
            .with_context(|| format!("codec {codec_name} not available"))?
            .sample_rate(config.sample_rate)
            .channel_layout(
                ChannelLayout::from_channels(channels)
                    .with_context(|| format!("unsupported channel count {channels}"))?,
            )
            .sample_format(get_sample_format(sample_format))
            .set_option("b", &config.bitrate.to_string())
            .build()
            .with_context(|| format!("failed to initialize {codec_name}"))?;
        let frame_samples = encoder
            .samples_per_frame()
            .unwrap_or(config.sample_rate as usize / 50);
        info!("audio backend: {codec_name} {} Hz, {channels}ch", config.sample_rate);

        Ok(Box::new(FfmpegAudioCodec {
            encoder,
            planar,
            channels: channels as usize,
            sample_rate: config.sample_rate as u64,
            frame_samples,
            pending: Vec::new(),
            samples_encoded: 0,
        }))
    }
}

pub struct FfmpegVideoCodec {
    encoder: video::VideoEncoder,
    time_base: TimeBase,
    pixel_format: video::frame::PixelFormat,
    width: usize,
    height: usize,
}

// Owned by a single worker thread; nothing aliases the FFmpeg context.
unsafe impl Send for FfmpegVideoCodec {}

impl FfmpegVideoCodec {
    fn drain(&mut self, out: &mut Vec<CodecPacket>) -> Result<()> {
        while let Some(packet) = self.encoder.take()? {
            out.push(CodecPacket {
                data: packet.data().to_vec(),
                pts: packet.pts().timestamp(),
                keyframe: packet.is_key(),
            });
        }
        Ok(())
    }
}

impl VideoCodec for FfmpegVideoCodec {
    fn encode(
        &mut self,
        image: I420Planes<'_>,
        pts: i64,
        _duration: i64,
        force_keyframe: bool,
    ) -> Result<Vec<CodecPacket>> {
        let picture_type = if force_keyframe { PictureType::I } else { PictureType::None };
        let mut frame = VideoFrameMut::black(self.pixel_format, self.width, self.height)
            .with_time_base(self.time_base)
            .with_pts(Timestamp::new(pts, self.time_base))
            .with_picture_type(picture_type);

        copy_plane(&mut frame, 0, image.y, self.width, self.height);
        copy_plane(&mut frame, 1, image.u, self.width / 2, self.height / 2);
        copy_plane(&mut frame, 2, image.v, self.width / 2, self.height / 2);

        self.encoder.push(frame.freeze())?;
        let mut packets = Vec::new();
        self.drain(&mut packets)?;
        Ok(packets)
    }

    fn flush(&mut self) -> Result<Vec<CodecPacket>> {
        self.encoder.flush()?;
        let mut packets = Vec::new();
        self.drain(&mut packets)?;
        Ok(packets)
    }
}

/// Copy one source plane into the frame, honoring the encoder's line size
/// (frame rows may carry alignment padding).
fn copy_plane(frame: &mut VideoFrameMut, index: usize, src: &[u8], width: usize, rows: usize) {
    let mut planes = frame.planes_mut();
    let dst = planes[index].data_mut();
    let line_size = dst.len() / rows;

    if line_size == width {
        dst[..width * rows].copy_from_slice(&src[..width * rows]);
        return;
    }
    for row in 0..rows {
        dst[row * line_size..row * line_size + width]
            .copy_from_slice(&src[row * width..(row + 1) * width]);
    }
}

pub struct FfmpegAudioCodec {
    encoder: audio::AudioEncoder,
    planar: bool,
    channels: usize,
    sample_rate: u64,
    /// Samples per channel the codec consumes per push.
    frame_samples: usize,
    /// Interleaved samples accumulated until a full codec frame is available.
    pending: Vec<f32>,
    samples_encoded: u64,
}

unsafe impl Send for FfmpegAudioCodec {}

impl FfmpegAudioCodec {
    /// Push one codec frame taken from the head of `pending`.
    fn push_frame(&mut self, out: &mut Vec<CodecPacket>) -> Result<()> {
        let frame_len = self.frame_samples * self.channels;
        let params = self.encoder.codec_parameters();
        let mut frame = AudioFrameMut::silence(
            params.channel_layout(),
            params.sample_format(),
            params.sample_rate(),
            self.frame_samples,
        );

        if self.planar {
            for ch in 0..self.channels {
                let plane = &mut frame.planes_mut()[ch];
                let data = plane.data_mut();
                for (i, sample) in data.chunks_exact_mut(4).enumerate().take(self.frame_samples) {
                    sample.copy_from_slice(&self.pending[i * self.channels + ch].to_ne_bytes());
                }
            }
        } else {
            let plane = &mut frame.planes_mut()[0];
            let data = plane.data_mut();
            for (i, sample) in data.chunks_exact_mut(4).enumerate().take(frame_len) {
                sample.copy_from_slice(&self.pending[i].to_ne_bytes());
            }
        }
        self.pending.drain(..frame_len);

        let pts = (self.samples_encoded * 1_000_000_000 / self.sample_rate) as i64;
        self.samples_encoded += self.frame_samples as u64;

        self.encoder.push(frame.freeze())?;
        self.drain(pts, out)
    }

    fn drain(&mut self, pts: i64, out: &mut Vec<CodecPacket>) -> Result<()> {
        while let Some(packet) = self.encoder.take()? {
            out.push(CodecPacket { data: packet.data().to_vec(), pts, keyframe: true });
        }
        Ok(())
    }
}

impl AudioCodec for FfmpegAudioCodec {
    fn encode(&mut self, samples: &[f32]) -> Result<Vec<CodecPacket>> {
        self.pending.extend_from_slice(samples);

        let mut packets = Vec::new();
        let frame_len = self.frame_samples * self.channels;
        while self.pending.len() >= frame_len {
            self.push_frame(&mut packets)?;
        }
        Ok(packets)
    }

    fn flush(&mut self) -> Result<Vec<CodecPacket>> {
        let mut packets = Vec::new();
        let frame_len = self.frame_samples * self.channels;
        if !self.pending.is_empty() {
            // Zero-pad the tail to a full codec frame.
            self.pending.resize(frame_len, 0.0);
            self.push_frame(&mut packets)?;
        }

        self.encoder.flush()?;
        let pts = (self.samples_encoded * 1_000_000_000 / self.sample_rate) as i64;
        self.drain(pts, &mut packets)?;
        Ok(packets)
    }
}
