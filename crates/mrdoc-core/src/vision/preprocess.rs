use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Side length of the square ViT input
pub const INPUT_SIZE: u32 = 224;

// ViT-base image processor normalization, identical for all three channels
const MEAN: f32 = 0.5;
const STD: f32 = 0.5;

/// Convert an image into the `[1, 3, 224, 224]` pixel tensor the ViT expects:
/// RGB, bilinear resize, rescale to [0, 1], then normalize to [-1, 1].
pub fn pixel_values(image: &DynamicImage) -> Array4<f32> {
    let size = INPUT_SIZE as usize;
    let resized = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            tensor[[0, channel, y as usize, x as usize]] = (value - MEAN) / STD;
        }
    }
    tensor
}

/// Index of the highest logit. Ties go to the lowest index and NaN never wins.
pub fn argmax(logits: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in logits.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}
