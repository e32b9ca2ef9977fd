// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the palm classifier
//!
//! The classifier is a MobileNetV2 fine-tune exported to ONNX. It expects a
//! channels-last batch of one 224x224 RGB image with values in [-1, 1].

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Square input size expected by the classifier
pub const INPUT_SIZE: u32 = 224;

/// RGB channels
pub const INPUT_CHANNELS: usize = 3;

/// Tensor shape fed to the classifier (NHWC)
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, INPUT_CHANNELS];

/// Scale a single 8-bit channel value into [-1, 1]
///
/// MobileNetV2 convention: `v / 127.5 - 1`.
#[inline]
pub fn scale_pixel(value: u8) -> f32 {
    value as f32 / 127.5 - 1.0
}

/// Preprocess an image for classification
///
/// Steps:
/// 1. Convert to RGB (alpha dropped, grayscale expanded)
/// 2. Resize to exactly INPUT_SIZE x INPUT_SIZE with nearest-neighbour
///    sampling (aspect ratio is not preserved)
/// 3. Scale pixels with `scale_pixel`
/// 4. Emit NHWC tensor `[1, 224, 224, 3]`
pub fn preprocess_image(image: &DynamicImage) -> Array4<f32> {
    let rgb = if image.width() == INPUT_SIZE && image.height() == INPUT_SIZE {
        image.to_rgb8()
    } else {
        image
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Nearest)
            .to_rgb8()
    };

    let mut tensor = Array4::zeros(INPUT_SHAPE);

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..INPUT_CHANNELS {
            tensor[[0, y as usize, x as usize, c]] = scale_pixel(pixel[c]);
        }
    }

    tensor
}
