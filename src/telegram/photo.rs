//! Photo sources and JPEG re-encoding.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageDecoder, ImageReader};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Longest side of a re-encoded photo, in pixels.
pub const MAX_DIMENSION: u32 = 4096;

/// JPEG quality used when re-encoding.
pub const JPEG_QUALITY: u8 = 85;

/// Errors that can occur while preparing a photo.
#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Failed to read photo: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode or encode photo: {0}")]
    Image(#[from] image::ImageError),

    #[error("Re-encoding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Where a funnel photo comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// Sent by URL; Telegram fetches it.
    Remote(Url),
    /// Uploaded from the local filesystem.
    Local(PathBuf),
}

impl PhotoSource {
    /// Resolves a configured photo value.
    ///
    /// `http(s)://` values are remote; absolute paths are kept; anything else
    /// is taken relative to `assets_dir`. Empty values mean "no photo".
    #[must_use]
    pub fn resolve(raw: &str, assets_dir: &Path) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return match Url::parse(raw) {
                Ok(url) => Some(Self::Remote(url)),
                Err(e) => {
                    warn!(source = raw, error = %e, "Ignoring unparseable photo URL");
                    None
                }
            };
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            Some(Self::Local(path.to_path_buf()))
        } else {
            Some(Self::Local(assets_dir.join(path)))
        }
    }

    /// Returns the local path, if this is a local photo.
    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Remote(_) => None,
            Self::Local(path) => Some(path),
        }
    }
}

impl fmt::Display for PhotoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Re-encodes an image file to a baseline JPEG.
///
/// EXIF orientation is applied, the image is converted to RGB and scaled
/// down so that neither side exceeds [`MAX_DIMENSION`].
pub fn reencode_to_jpeg(path: &Path) -> Result<Vec<u8>, PhotoError> {
    let mut decoder = ImageReader::open(path)?.with_guessed_format()?.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);

    let mut image = DynamicImage::ImageRgb8(image.to_rgb8());
    if image.width().max(image.height()) > MAX_DIMENSION {
        image = image.thumbnail(MAX_DIMENSION, MAX_DIMENSION);
    }

    let mut out = Cursor::new(Vec::new());
    image.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;

    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        bytes = out.get_ref().len(),
        "Re-encoded photo to JPEG"
    );
    Ok(out.into_inner())
}

/// Runs [`reencode_to_jpeg`] on the blocking pool.
pub async fn reencode_to_jpeg_blocking(path: PathBuf) -> Result<Vec<u8>, PhotoError> {
    tokio::task::spawn_blocking(move || reencode_to_jpeg(&path)).await?
}
