//! Decoded image handle shared between downloaders, callbacks and views

use imgbind_errors::FetchError;
use std::fmt;
use std::sync::Arc;

pub use image::DynamicImage;

/// Image encodings accepted from the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageEncoding {
    Png,
    Jpeg,
}

impl ImageEncoding {
    /// MIME types accepted in the `Content-Type` response header
    pub const SUPPORTED_MIME_TYPES: [&'static str; 3] = ["image/jpeg", "image/pjpeg", "image/png"];

    /// Map a MIME essence (no parameters, lower-case) to an encoding
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/pjpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    fn format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// A decoded image
///
/// Cloning is cheap: clones share the same pixel buffer. Two handles are
/// the "same image" when [`Image::ptr_eq`] holds.
#[derive(Clone)]
pub struct Image {
    inner: Arc<DynamicImage>,
}

impl Image {
    /// Wrap an already decoded image
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            inner: Arc::new(image),
        }
    }

    /// Decode raw bytes using the decoder for `encoding`
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ImageDecodeFailed`] if the bytes are not a valid
    /// image of the given encoding.
    pub fn decode(bytes: &[u8], encoding: ImageEncoding) -> Result<Self, FetchError> {
        image::load_from_memory_with_format(bytes, encoding.format())
            .map(Self::from_dynamic)
            .map_err(|e| FetchError::ImageDecodeFailed(e.to_string()))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Borrow the underlying pixels
    #[must_use]
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.inner
    }

    /// Whether both handles point at the same decoded buffer
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl From<DynamicImage> for Image {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}
