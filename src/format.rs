use bytes::BytesMut;

/// Pixel formats accepted at the ingestion surface.
///
/// The pipeline only needs to know each format's storage size and how to get
/// it into planar 4:2:0; the conversion math itself lives behind
/// [`PixelNormalizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, the encoder's native layout.
    I420,
    /// 8-bit RGBA, the natural intermediate format.
    Rgba8,
    /// 16-bit half-float RGBA.
    RgbaF16,
    /// 32-bit float RGBA.
    RgbaF32,
    /// 32-bit integer RGBA.
    RgbaI32,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats. `None` for planar layouts.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::I420 => None,
            PixelFormat::Rgba8 => Some(4),
            PixelFormat::RgbaF16 => Some(8),
            PixelFormat::RgbaF32 | PixelFormat::RgbaI32 => Some(16),
        }
    }

    /// Total storage for one frame at the given dimensions.
    pub fn frame_bytes(self, width: usize, height: usize) -> usize {
        let pixels = width * height;
        match self.bytes_per_pixel() {
            Some(bpp) => pixels * bpp,
            // Full-size luma plane plus two quarter-size chroma planes.
            None => pixels + pixels / 2,
        }
    }
}

/// Borrowed view of one I420 picture: three contiguous planes.
#[derive(Debug, Clone, Copy)]
pub struct I420Planes<'a> {
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
}

impl<'a> I420Planes<'a> {
    /// Reinterpret a single contiguous I420 buffer as its three planes.
    ///
    /// No copy: the planes are `[0, fs)`, `[fs, fs + fs/4)` and
    /// `[fs + fs/4, fs + fs/2)` for `fs = width * height`.
    pub fn split(buffer: &'a [u8], width: usize, height: usize) -> Self {
        let frame_size = width * height;
        let chroma_size = frame_size / 4;
        let (y, rest) = buffer.split_at(frame_size);
        let (u, rest) = rest.split_at(chroma_size);
        let v = &rest[..chroma_size];
        Self { y, u, v }
    }
}

/// Owned I420 scratch image, reused across conversions to avoid reallocation.
#[derive(Debug, Default)]
pub struct I420Image {
    pub y: BytesMut,
    pub u: BytesMut,
    pub v: BytesMut,
}

impl I420Image {
    /// Resize the planes for the given picture dimensions. Existing capacity
    /// is reused; contents are unspecified afterwards.
    pub fn resize(&mut self, width: usize, height: usize) {
        let frame_size = width * height;
        self.y.resize(frame_size, 0);
        self.u.resize(frame_size / 4, 0);
        self.v.resize(frame_size / 4, 0);
    }

    pub fn planes(&self) -> I420Planes<'_> {
        I420Planes { y: &self.y, u: &self.u, v: &self.v }
    }
}

/// Pixel-format conversion collaborator.
///
/// The pipeline calls this from the video worker thread to bring arbitrary
/// input formats into the encoder's planar layout. Implementations own the
/// conversion kernels; the pipeline only owns the scratch buffers.
pub trait PixelNormalizer: Send {
    /// Convert `pixel_count` pixels between packed formats.
    fn convert(
        &mut self,
        dst: &mut [u8],
        dst_format: PixelFormat,
        src: &[u8],
        src_format: PixelFormat,
        pixel_count: usize,
    );

    /// Convert packed 8-bit RGBA into a planar 4:2:0 image.
    fn rgba_to_i420(&mut self, dst: &mut I420Image, rgba: &[u8], width: usize, height: usize);
}
