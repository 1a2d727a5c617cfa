use std::path::Path;

use image::ImageFormat;

use crate::error::AnalysisError;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const UNSUPPORTED_TYPE: &str = "File type not supported. Please upload a JPG, PNG, or WEBP image.";

/// An image accepted for upload: raw bytes plus the MIME type sent upstream.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Read and vet an image file from disk.
    ///
    /// The size limit is checked against file metadata before reading.
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let read_error = |e: std::io::Error| {
            AnalysisError::InvalidImage(format!(
                "Error reading file {}: {}. Please try a different image.",
                path.display(),
                e
            ))
        };

        let size = std::fs::metadata(path).map_err(read_error)?.len();
        if size > MAX_IMAGE_BYTES as u64 {
            return Err(too_large());
        }

        let bytes = std::fs::read(path).map_err(read_error)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let fallback = ImageFormat::from_path(path).ok();
        Self::from_bytes(file_name, bytes, fallback)
    }

    /// Vet in-memory image bytes. The format is sniffed from the content;
    /// `fallback` (usually derived from the file extension) is used only when
    /// sniffing fails.
    pub fn from_bytes(
        file_name: String,
        bytes: Vec<u8>,
        fallback: Option<ImageFormat>,
    ) -> Result<Self, AnalysisError> {
        if bytes.is_empty() {
            return Err(AnalysisError::InvalidImage(
                "Error reading file: the image is empty. Please try a different image.".to_string(),
            ));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(too_large());
        }

        let format = image::guess_format(&bytes).ok().or(fallback);
        let mime_type = match format {
            Some(ImageFormat::Jpeg) => "image/jpeg",
            Some(ImageFormat::Png) => "image/png",
            Some(ImageFormat::WebP) => "image/webp",
            _ => return Err(AnalysisError::InvalidImage(UNSUPPORTED_TYPE.to_string())),
        };

        tracing::debug!(file = %file_name, mime = mime_type, size = bytes.len(), "image accepted");

        Ok(ImageUpload {
            file_name,
            mime_type,
            bytes,
        })
    }
}

fn too_large() -> AnalysisError {
    AnalysisError::InvalidImage(format!(
        "Image file size exceeds limit of {}MB.",
        MAX_IMAGE_BYTES / (1024 * 1024)
    ))
}

#[cfg(test)]
pub(crate) const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
