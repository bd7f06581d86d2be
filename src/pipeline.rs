use std::path::Path;

use image::DynamicImage;
use tract_onnx::prelude::tract_ndarray::{s, Array3, Array4};
use tracing::{info, warn};

use crate::config::{ChannelOrder, InputShape, OcrConfig};
use crate::error::{OcrError, Result};
use crate::transformer::{needs_resize, GenericTransform, ImageTransform, ImageTransformResult};
use crate::transformer::{ResizeImage, SwapRedBlue, ToArray};

/// Turns input images into the `(N, C, H, W)` batch fed to the model.
pub struct TransformationPipeline {
    steps: Vec<ImageTransform>,
    input_shape: InputShape,
}

impl TransformationPipeline {
    pub fn new(config: &OcrConfig) -> Self {
        let mut steps: Vec<ImageTransform> = vec![ResizeImage {
            image_size: config.input_shape.image_size(),
            filter: config.resize_filter,
        }
        .into()];
        if config.channel_order == ChannelOrder::Bgr {
            steps.push(SwapRedBlue {}.into());
        }
        steps.push(ToArray {}.into());

        TransformationPipeline {
            steps,
            input_shape: config.input_shape,
        }
    }

    /// Runs every step on `image` and returns its `(C, H, W)` array.
    pub fn transform_image(&self, image: DynamicImage) -> Result<Array3<f32>> {
        let mut result = if self.input_shape.channels == 1 {
            ImageTransformResult::GrayImage(image.into_luma8())
        } else {
            ImageTransformResult::RgbImage(image.into_rgb8())
        };

        for step in &self.steps {
            result = step.transform(result)?;
        }

        match result {
            ImageTransformResult::Array3(arr) => Ok(arr),
            _ => Err(OcrError::Transform("should be converted to array already")),
        }
    }

    /// Loads every image and stacks them into one batch, in input order.
    pub fn build_batch<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Array4<f32>> {
        let [n, c, h, w] = self.input_shape.batch_shape(paths.len());
        let target = self.input_shape.image_size();
        let mut batch = Array4::<f32>::zeros((n, c, h, w));

        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let image = image::open(path).map_err(|source| OcrError::ImageLoad {
                path: path.to_path_buf(),
                source,
            })?;
            let dims = (image.height() as usize, image.width() as usize);
            if needs_resize(dims, &target) {
                warn!(
                    "Image {} is resized from {:?} to {:?}",
                    path.display(),
                    dims,
                    (h, w)
                );
            }
            let arr = self.transform_image(image)?;
            batch.slice_mut(s![i, .., .., ..]).assign(&arr);
        }

        info!("Batch size is {}", n);
        Ok(batch)
    }
}
