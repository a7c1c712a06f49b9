use crate::encoder::{AudioCodecKind, VideoCodecKind};
use anyhow::{Result, ensure};

/// Recorder configuration. Either media half can be disabled independently;
/// the configuration is immutable once a [`crate::Recorder`] is created.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub video: Option<VideoConfig>,
    pub audio: Option<AudioConfig>,
}

#[derive(Debug, Clone)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
    pub codec: VideoCodecKind,
}

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
    pub codec: AudioCodecKind,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.video.is_some() || self.audio.is_some(),
            "at least one media type must be enabled"
        );
        if let Some(video) = &self.video {
            video.validate()?;
        }
        if let Some(audio) = &self.audio {
            audio.validate()?;
        }
        Ok(())
    }
}

impl VideoConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.width > 0 && self.height > 0, "video dimensions must be non-zero");
        // I420 chroma planes are quarter size, so both dimensions must be even.
        ensure!(
            self.width % 2 == 0 && self.height % 2 == 0,
            "video dimensions must be even for 4:2:0 output"
        );
        ensure!(self.bitrate > 0, "video bitrate must be non-zero");
        Ok(())
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.sample_rate > 0, "audio sample rate must be non-zero");
        ensure!(self.channels > 0, "audio channel count must be non-zero");
        ensure!(self.bitrate > 0, "audio bitrate must be non-zero");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_fully_disabled_config() {
        let config = RecorderConfig { video: None, audio: None };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_odd_video_dimensions() {
        let config = VideoConfig {
            width: 641,
            height: 480,
            bitrate: 2_000_000,
            codec: VideoCodecKind::Vp9,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_audio_only() {
        let config = RecorderConfig {
            video: None,
            audio: Some(AudioConfig {
                sample_rate: 48_000,
                channels: 2,
                bitrate: 128_000,
                codec: AudioCodecKind::Opus,
            }),
        };
        assert!(config.validate().is_ok());
    }
}
