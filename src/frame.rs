use bytes::BytesMut;

/// Metadata for one encoded bitstream block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedBlock {
    /// Size of the block's payload in bytes.
    pub size: usize,
    /// Presentation timestamp in nanoseconds.
    pub pts: i64,
    /// Whether the block is decodable without reference to earlier blocks.
    pub keyframe: bool,
}

/// One encoder output unit: an ordered block list plus the concatenated
/// bitstream payload.
///
/// A single encode call may append zero or more blocks, since codecs buffer
/// internally and can emit blocks from earlier calls. The frame object is
/// cleared and reused after dispatch instead of reallocated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedFrame {
    pub data: BytesMut,
    pub blocks: Vec<EncodedBlock>,
}

impl EncodedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one encoded block and its payload.
    pub fn push_block(&mut self, payload: &[u8], pts: i64, keyframe: bool) {
        self.data.extend_from_slice(payload);
        self.blocks.push(EncodedBlock { size: payload.len(), pts, keyframe });
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Reset for reuse. Keeps the payload allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.blocks.clear();
    }
}
