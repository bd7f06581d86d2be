use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{read_file, OcrError, Result};

#[derive(Serialize, Deserialize)]
#[serde(remote = "FilterType")]
pub(crate) enum FilterOption {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

/// Spatial size of an image, in pixels.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

/// Per-image input geometry expected by the model, i.e. `(C, H, W)`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct InputShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Default for InputShape {
    fn default() -> Self {
        InputShape {
            channels: 3,
            height: 32,
            width: 100,
        }
    }
}

impl InputShape {
    pub fn image_size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Full batch shape `(N, C, H, W)`.
    pub fn batch_shape(&self, batch_size: usize) -> [usize; 4] {
        [batch_size, self.channels, self.height, self.width]
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    #[default]
    Bgr,
}

/// Axis order of the recognition output.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `(T, N, K)`
    #[default]
    TimeMajor,
    /// `(N, T, K)`
    BatchMajor,
}

/// Preprocessing and decoding settings.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct OcrConfig {
    pub input_shape: InputShape,
    #[serde(with = "FilterOption")]
    pub resize_filter: FilterType,
    pub channel_order: ChannelOrder,
    pub output_layout: OutputLayout,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            input_shape: InputShape::default(),
            resize_filter: FilterType::Triangle,
            channel_order: ChannelOrder::default(),
            output_layout: OutputLayout::default(),
        }
    }
}

impl OcrConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = read_file("config", path)?;
        let config: OcrConfig =
            serde_json::from_str(&content).map_err(|source| OcrError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let shape = &self.input_shape;
        if shape.channels != 1 && shape.channels != 3 {
            return Err(OcrError::config(format!(
                "input_shape.channels must be 1 or 3, got {}",
                shape.channels
            )));
        }
        if shape.height == 0 || shape.width == 0 {
            return Err(OcrError::config("input_shape height and width must be non-zero"));
        }
        Ok(())
    }
}

/// Target device names accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
    Fpga,
    Myriad,
    Hetero,
}

impl FromStr for Device {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.to_uppercase();
        match upper.as_str() {
            "CPU" => Ok(Device::Cpu),
            "GPU" => Ok(Device::Gpu),
            "FPGA" => Ok(Device::Fpga),
            "MYRIAD" => Ok(Device::Myriad),
            _ if upper.starts_with("HETERO") => Ok(Device::Hetero),
            _ => Err(OcrError::config(format!(
                "unsupported device: {s}. Supported devices: CPU, GPU, FPGA, MYRIAD, HETERO"
            ))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Device::Cpu => "CPU",
            Device::Gpu => "GPU",
            Device::Fpga => "FPGA",
            Device::Myriad => "MYRIAD",
            Device::Hetero => "HETERO",
        };
        f.write_str(name)
    }
}

impl Device {
    /// True when `spec` names the CPU, alone or inside a HETERO list.
    pub fn requests_cpu(spec: &str) -> bool {
        spec.to_uppercase()
            .split(|c| c == ':' || c == ',')
            .any(|name| name.trim() == "CPU")
    }

    /// tract only executes on the host CPU.
    pub fn resolve(self) -> Device {
        if self != Device::Cpu {
            warn!("{self} requested but only CPU execution is available. Falling back to CPU.");
        }
        Device::Cpu
    }
}
