use std::path::Path;

use image::DynamicImage;
use ort::session::Session;
use ort::value::Tensor;

use super::preprocess::{argmax, pixel_values};
use super::ImageClassifier;
use crate::error::{DoctorError, Result};

const INPUT_NAME: &str = "pixel_values";
const OUTPUT_NAME: &str = "logits";

/// Vision transformer classifier running on ONNX Runtime
pub struct VitClassifier {
    session: Session,
}

impl VitClassifier {
    /// Load an ONNX export of the ViT image classifier
    pub fn load(model_path: &Path) -> Result<Self> {
        tracing::info!(path = %model_path.display(), "loading image classifier");

        let session = Session::builder()
            .map_err(|e| DoctorError::Inference(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| DoctorError::Inference(e.to_string()))?;

        Ok(Self { session })
    }
}

impl ImageClassifier for VitClassifier {
    fn classify(&mut self, image: &DynamicImage) -> Result<usize> {
        let input = Tensor::from_array(pixel_values(image))
            .map_err(|e| DoctorError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input])
            .map_err(|e| DoctorError::Inference(e.to_string()))?;

        let (_shape, logits) = outputs[OUTPUT_NAME]
            .try_extract_tensor::<f32>()
            .map_err(|e| DoctorError::Inference(e.to_string()))?;

        let class_index = argmax(logits).ok_or(DoctorError::EmptyLogits)?;
        tracing::debug!(class_index, classes = logits.len(), "image classified");
        Ok(class_index)
    }
}
