use std::sync::Arc;
use std::time::{Duration, Instant};

use tract_onnx::prelude::Tensor;
use tracing::info;

use crate::engine::InferenceEngine;
use crate::error::{OcrError, Result};

/// How far the loop has got.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        round1(100.0 * self.completed as f64 / self.total as f64)
    }

    /// Seconds left, extrapolated from the mean iteration time so far.
    pub fn remaining_secs(&self) -> f64 {
        round1(self.per_iteration_secs() * (self.total - self.completed) as f64)
    }

    pub fn estimated_secs(&self) -> f64 {
        round1(self.per_iteration_secs() * self.total as f64)
    }

    fn per_iteration_secs(&self) -> f64 {
        self.elapsed.as_secs_f64() / self.completed as f64
    }
}

/// Result of a benchmark run.
#[derive(Debug)]
pub struct BenchOutcome {
    /// Output of the final iteration.
    pub output: Arc<Tensor>,
    pub total: Duration,
    pub iterations: usize,
}

impl BenchOutcome {
    pub fn average_latency_ms(&self) -> f64 {
        average_latency_ms(self.total, self.iterations)
    }
}

/// Rounds to one decimal, ties to even.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Total wall-clock milliseconds over `iterations`, rounded to one decimal.
pub fn average_latency_ms(total: Duration, iterations: usize) -> f64 {
    round1(total.as_secs_f64() * 1000.0 / iterations as f64)
}

/// Progress is reported every tenth iteration and on the last one.
pub fn is_progress_tick(iteration: usize, iterations: usize) -> bool {
    iteration % 10 == 0 || iteration + 1 == iterations
}

/// Runs `iterations` synchronous passes over the same batch.
pub fn run_benchmark<E, F>(engine: &E, batch: &Tensor, iterations: usize, mut on_progress: F) -> Result<BenchOutcome>
where
    E: InferenceEngine + ?Sized,
    F: FnMut(&Progress) -> Result<()>,
{
    if iterations == 0 {
        return Err(OcrError::config("number of iterations must be at least 1"));
    }

    info!("Starting inference ({} iterations)", iterations);
    let start = Instant::now();
    let mut output = None;
    for i in 0..iterations {
        output = Some(engine.infer(batch)?);
        if is_progress_tick(i, iterations) {
            on_progress(&Progress {
                completed: i + 1,
                total: iterations,
                elapsed: start.elapsed(),
            })?;
        }
    }
    let total = start.elapsed();

    let outcome = BenchOutcome {
        output: output.ok_or(OcrError::EmptyOutput)?,
        total,
        iterations,
    };
    info!(
        "Average running time of one iteration: {:.1} ms",
        outcome.average_latency_ms()
    );
    Ok(outcome)
}
