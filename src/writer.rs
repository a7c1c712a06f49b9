use std::sync::Mutex;

use crate::frame::EncodedFrame;

/// Output sink collaborator.
///
/// Each writer is bound to exactly one output sink. It receives the encoder
/// codec identifiers before the first frame so it can emit correct container
/// track headers, then every encoded frame in delivery order until teardown.
/// Writers only ever see complete frames; a failed encode never reaches them.
pub trait FrameWriter: Send {
    /// Push the video track's codec identifier (e.g. `"V_VP9"`).
    fn bind_video_codec(&mut self, codec_id: &str);

    /// Push the audio track's codec identifier (e.g. `"A_OPUS"`).
    fn bind_audio_codec(&mut self, codec_id: &str);

    fn add_video_frame(&mut self, frame: &EncodedFrame);

    fn add_audio_frame(&mut self, frame: &EncodedFrame);
}

/// The registered writers, shared between the video and audio workers.
///
/// The lock is scoped to registration and fan-out only; encode work never
/// runs under it. Writers added after streaming has begun receive only frames
/// from that point forward.
pub(crate) struct WriterSet {
    writers: Mutex<Vec<Box<dyn FrameWriter>>>,
}

impl WriterSet {
    pub fn new() -> Self {
        Self { writers: Mutex::new(Vec::new()) }
    }

    pub fn add(&self, writer: Box<dyn FrameWriter>) {
        self.writers.lock().unwrap().push(writer);
    }

    /// Fan one artifact out to every registered writer.
    pub fn each(&self, mut body: impl FnMut(&mut dyn FrameWriter)) {
        let mut writers = self.writers.lock().unwrap();
        for writer in writers.iter_mut() {
            body(writer.as_mut());
        }
    }

    pub fn len(&self) -> usize {
        self.writers.lock().unwrap().len()
    }

    /// Drop all writers. Called at teardown, after the workers have drained.
    pub fn clear(&self) {
        self.writers.lock().unwrap().clear();
    }
}
