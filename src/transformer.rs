use enum_dispatch::enum_dispatch;
use image::imageops::{resize, FilterType};
use image::{GrayImage, ImageBuffer, Pixel, RgbImage};
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::tract_ndarray::Array3;

use crate::config::{FilterOption, ImageSize};
use crate::error::{OcrError, Result};

/// Intermediate value passed between transform steps.
pub enum ImageTransformResult {
    RgbImage(RgbImage),
    GrayImage(GrayImage),
    /// Channel-first `(C, H, W)` pixel data.
    Array3(Array3<f32>),
}

impl From<RgbImage> for ImageTransformResult {
    fn from(image: RgbImage) -> Self {
        ImageTransformResult::RgbImage(image)
    }
}

impl From<GrayImage> for ImageTransformResult {
    fn from(image: GrayImage) -> Self {
        ImageTransformResult::GrayImage(image)
    }
}

#[enum_dispatch]
#[derive(Clone, Serialize, Deserialize)]
pub enum ImageTransform {
    ResizeImage(ResizeImage),
    SwapRedBlue(SwapRedBlue),
    ToArray(ToArray),
}

#[enum_dispatch(ImageTransform)]
pub trait GenericTransform {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult>;
}

/// Returns true when an image of `(height, width)` must be resized to fit `target`.
pub fn needs_resize(dims: (usize, usize), target: &ImageSize) -> bool {
    dims != (target.height, target.width)
}

/// Resizes to `image_size`, leaving images that already match untouched.
#[derive(Clone, Serialize, Deserialize)]
pub struct ResizeImage {
    pub image_size: ImageSize,
    #[serde(with = "FilterOption")]
    pub filter: FilterType,
}

impl ResizeImage {
    fn apply<P>(&self, image: ImageBuffer<P, Vec<P::Subpixel>>) -> ImageBuffer<P, Vec<P::Subpixel>>
    where
        P: Pixel + 'static,
        P::Subpixel: 'static,
    {
        let dims = (image.height() as usize, image.width() as usize);
        if !needs_resize(dims, &self.image_size) {
            return image;
        }
        resize(
            &image,
            self.image_size.width as u32,
            self.image_size.height as u32,
            self.filter,
        )
    }
}

impl GenericTransform for ResizeImage {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult> {
        match input {
            ImageTransformResult::RgbImage(image) => Ok(self.apply(image).into()),
            ImageTransformResult::GrayImage(image) => Ok(self.apply(image).into()),
            ImageTransformResult::Array3(_) => {
                Err(OcrError::Transform("image resize not implemented for Array3"))
            }
        }
    }
}

/// Reorders RGB pixels to BGR. Single channel images pass through.
#[derive(Clone, Serialize, Deserialize)]
pub struct SwapRedBlue {}

impl GenericTransform for SwapRedBlue {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult> {
        match input {
            ImageTransformResult::RgbImage(mut image) => {
                for pixel in image.pixels_mut() {
                    pixel.0.swap(0, 2);
                }
                Ok(image.into())
            }
            ImageTransformResult::GrayImage(image) => Ok(image.into()),
            ImageTransformResult::Array3(_) => {
                Err(OcrError::Transform("channel swap not implemented for Array3"))
            }
        }
    }
}

/// HWC u8 image to CHW f32 array, raw pixel values.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToArray {}

impl GenericTransform for ToArray {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult> {
        match input {
            ImageTransformResult::RgbImage(image) => {
                let (width, height) = image.dimensions();
                let arr = Array3::from_shape_fn((3, height as usize, width as usize), |(c, y, x)| {
                    image[(x as _, y as _)][c] as f32
                });
                Ok(ImageTransformResult::Array3(arr))
            }
            ImageTransformResult::GrayImage(image) => {
                let (width, height) = image.dimensions();
                let arr = Array3::from_shape_fn((1, height as usize, width as usize), |(_, y, x)| {
                    image[(x as _, y as _)][0] as f32
                });
                Ok(ImageTransformResult::Array3(arr))
            }
            // already an array
            arr @ ImageTransformResult::Array3(_) => Ok(arr),
        }
    }
}
