//! Image diagnosis: upload decoding, ViT preprocessing and ONNX inference

pub mod preprocess;
pub mod vit;
pub mod weights;

pub use vit::VitClassifier;
pub use weights::ModelWeights;

use std::path::Path;

use image::DynamicImage;

use crate::error::{DoctorError, Result};

/// File types accepted by the upload control
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A pretrained image classifier that returns the top-scoring class index
pub trait ImageClassifier {
    fn classify(&mut self, image: &DynamicImage) -> Result<usize>;
}

/// An uploaded file, decoded and ready for classification
#[derive(Debug, Clone)]
pub struct UploadedImage {
    name: String,
    bytes: Vec<u8>,
    image: DynamicImage,
}

impl UploadedImage {
    /// Validate the extension, read and decode the file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        check_extension(path)?;
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, bytes)
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let image = image::load_from_memory(&bytes)?;
        Ok(Self {
            name: name.into(),
            bytes,
            image,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Reject anything that is not a jpg, jpeg or png file
pub fn check_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(DoctorError::UnsupportedImage(extension))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// A small PNG with a horizontal gradient
    pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
        });
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_check_extension_accepts_supported_types() {
        for name in ["rash.jpg", "rash.JPEG", "rash.png", "dir.v2/rash.Png"] {
            assert!(check_extension(&PathBuf::from(name)).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_check_extension_rejects_others() {
        let err = check_extension(&PathBuf::from("scan.gif")).unwrap_err();
        assert!(matches!(err, DoctorError::UnsupportedImage(ref ext) if ext == "gif"));
        assert!(check_extension(&PathBuf::from("no_extension")).is_err());
    }

    #[test]
    fn test_open_decodes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skin.png");
        std::fs::write(&path, test_support::gradient_png(32, 16)).unwrap();

        let upload = UploadedImage::open(&path).unwrap();
        assert_eq!(upload.name(), "skin.png");
        assert_eq!(upload.dimensions(), (32, 16));
    }

    #[test]
    fn test_corrupt_data_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = UploadedImage::open(&path).unwrap_err();
        assert!(matches!(err, DoctorError::Decode(_)));
        assert!(err.is_upload_error());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = UploadedImage::open(Path::new("/nonexistent/mrdoc/skin.png")).unwrap_err();
        assert!(matches!(err, DoctorError::Io(_)));
    }
}
