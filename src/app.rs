//! Wires argument intake, model load, the timed loop and reporting together.

use std::fs;
use std::path::Path;

use tract_onnx::prelude::Tensor;
use tracing::{debug, info};

use crate::bench::{run_benchmark, BenchOutcome};
use crate::cli::Args;
use crate::codec::CharCodec;
use crate::config::{Device, OcrConfig};
use crate::decode::{decode, top_classes};
use crate::engine::{check_extensions, log_perf_counts, InferenceEngine, TractEngine};
use crate::error::{OcrError, Result};
use crate::pipeline::TransformationPipeline;
use crate::report::{job_id_from_env, write_reports, ProgressFile};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Decoded text of every batch element, in input order.
    pub texts: Vec<String>,
    pub average_latency_ms: f64,
    pub iterations: usize,
}

impl RunSummary {
    /// Text of the first image, the one that gets reported.
    pub fn result(&self) -> &str {
        self.texts.first().map(String::as_str).unwrap_or_default()
    }
}

pub fn load_codec(args: &Args) -> Result<CharCodec> {
    match &args.labels {
        Some(labels) => CharCodec::from_labels(labels),
        None => CharCodec::from_json(&args.char_dict, &args.ord_map),
    }
}

pub fn run(args: &Args) -> Result<RunSummary> {
    let job_id = job_id_from_env();
    let config = match &args.config {
        Some(path) => OcrConfig::from_path(path)?,
        None => OcrConfig::default(),
    };
    if args.number_iter == 0 {
        return Err(OcrError::config("number of iterations must be at least 1"));
    }

    let device: Device = args.device.parse()?;
    check_extensions(
        Device::requests_cpu(&args.device),
        args.cpu_extension.as_ref(),
        args.plugin_dir.as_ref(),
    )?;
    let device = device.resolve();
    let codec = load_codec(args)?;

    let engine = TractEngine::load(&args.model, config.input_shape, args.input.len())?;
    info!("Using device {}", device);

    info!("Preparing input blobs");
    let pipeline = TransformationPipeline::new(&config);
    let batch: Tensor = pipeline.build_batch(&args.input)?.into();

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)?;
    }
    let outcome = benchmark(
        &engine,
        &batch,
        args.number_iter,
        args.output_dir.as_deref(),
        job_id.as_deref(),
    )?;

    if args.perf_counts {
        log_perf_counts(&engine.perf_counts(&batch)?);
    }

    report(&outcome, &config, &codec, args.number_top, args.output_dir.as_deref())
}

/// Timed loop, with the progress side file kept current when `output_dir` is set.
pub fn benchmark<E: InferenceEngine + ?Sized>(
    engine: &E,
    batch: &Tensor,
    iterations: usize,
    output_dir: Option<&Path>,
    job_id: Option<&str>,
) -> Result<BenchOutcome> {
    match output_dir {
        Some(dir) => {
            let progress = ProgressFile::new(dir, job_id);
            run_benchmark(engine, batch, iterations, |p| progress.update(p))
        }
        None => run_benchmark(engine, batch, iterations, |_| Ok(())),
    }
}

/// Decodes the final output and writes the result and stats files.
pub fn report(
    outcome: &BenchOutcome,
    config: &OcrConfig,
    codec: &CharCodec,
    number_top: usize,
    output_dir: Option<&Path>,
) -> Result<RunSummary> {
    info!("Processing output blob");
    let layout = config.output_layout;
    if number_top > 0 && tracing::enabled!(tracing::Level::DEBUG) {
        if let Ok(steps) = top_classes(&outcome.output, layout, number_top) {
            for (t, classes) in steps.iter().enumerate() {
                debug!("step {}: {:?}", t, classes);
            }
        }
    }

    let summary = RunSummary {
        texts: decode(&outcome.output, layout, codec)?,
        average_latency_ms: outcome.average_latency_ms(),
        iterations: outcome.iterations,
    };
    for (i, text) in summary.texts.iter().enumerate() {
        info!("{}. '{}'", i + 1, text);
    }
    println!("The result is : {}", summary.result());

    if let Some(dir) = output_dir {
        write_reports(dir, summary.result(), summary.average_latency_ms, summary.iterations)?;
    }
    Ok(summary)
}
