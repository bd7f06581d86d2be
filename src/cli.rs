use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments of the benchmark.
#[derive(Parser, Debug, Clone)]
#[command(name = "lstm-ocr-bench")]
#[command(about = "Benchmarks an LSTM OCR model over a fixed image batch and decodes its output")]
pub struct Args {
    /// Path to an .onnx file with a trained model
    #[arg(short, long)]
    pub model: PathBuf,

    /// Paths to the input images, one batch entry each
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Shared library with custom CPU kernels
    #[arg(short = 'l', long)]
    pub cpu_extension: Option<PathBuf>,

    /// Path to a plugin folder
    #[arg(short = 'p', long)]
    pub plugin_dir: Option<PathBuf>,

    /// Target device to infer on: CPU, GPU, FPGA, MYRIAD or HETERO
    #[arg(short, long, default_value = "CPU")]
    pub device: String,

    /// Labels mapping file, one character per line
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Number of top classes logged per time step
    #[arg(short = 't', long, default_value_t = 10)]
    pub number_top: usize,

    /// Number of inference iterations
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub number_iter: usize,

    /// Report performance counters
    #[arg(short = 'c', long)]
    pub perf_counts: bool,

    /// Directory for the progress, result and stats files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Character dictionary, ordinal to character
    #[arg(long, default_value = "Config/char_dict.json")]
    pub char_dict: PathBuf,

    /// Ordinal map, class index to ordinal
    #[arg(long, default_value = "Config/ord_map.json")]
    pub ord_map: PathBuf,

    /// JSON file overriding preprocessing and decoding settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["lstm-ocr-bench", "-m", "crnn.onnx", "-i", "a.png"]).unwrap();
        assert_eq!(args.device, "CPU");
        assert_eq!(args.number_iter, 1000);
        assert_eq!(args.number_top, 10);
        assert!(!args.perf_counts);
        assert!(args.output_dir.is_none());
        assert_eq!(args.char_dict, PathBuf::from("Config/char_dict.json"));
    }

    #[test]
    fn several_inputs_and_flags() {
        let args = Args::try_parse_from([
            "lstm-ocr-bench",
            "-m",
            "crnn.onnx",
            "-i",
            "a.png",
            "b.png",
            "-n",
            "5",
            "-c",
            "-o",
            "out",
            "-d",
            "gpu",
        ])
        .unwrap();
        assert_eq!(args.input, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert_eq!(args.number_iter, 5);
        assert!(args.perf_counts);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert_eq!(args.device, "gpu");
    }

    #[test]
    fn model_and_input_are_required() {
        assert!(Args::try_parse_from(["lstm-ocr-bench", "-i", "a.png"]).is_err());
        assert!(Args::try_parse_from(["lstm-ocr-bench", "-m", "crnn.onnx"]).is_err());
    }
}
