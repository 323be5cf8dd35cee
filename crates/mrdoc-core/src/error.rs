use thiserror::Error;

/// Errors raised while serving a consultation turn or an image upload.
#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("{provider} API key not configured")]
    MissingApiKey { provider: &'static str },

    #[error("{provider} API error {status}: {body}")]
    Provider {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unsupported image type {0:?} (expected jpg, jpeg or png)")]
    UnsupportedImage(String),

    #[error("no image was requested in this conversation")]
    ImageNotRequested,

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model returned no logits")]
    EmptyLogits,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DoctorError {
    /// True for failures that happen before the classifier sees the image.
    /// The upload panel stays open after these so the user can pick another file.
    pub fn is_upload_error(&self) -> bool {
        matches!(
            self,
            DoctorError::UnsupportedImage(_) | DoctorError::Decode(_) | DoctorError::Io(_)
        )
    }
}

pub type Result<T, E = DoctorError> = std::result::Result<T, E>;
