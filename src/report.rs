//! Progress side file and the final result/stats files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bench::Progress;
use crate::error::Result;

/// Environment variable naming the batch job that owns this run.
pub const JOB_ID_VAR: &str = "PBS_JOBID";

pub const RESULT_FILE: &str = "result.txt";
pub const STATS_FILE: &str = "stats.txt";

/// File that is rewritten with the latest [`Progress`] on every tick.
#[derive(Debug, Clone)]
pub struct ProgressFile {
    path: PathBuf,
}

impl ProgressFile {
    pub fn new(output_dir: &Path, job_id: Option<&str>) -> Self {
        let name = match job_id {
            Some(id) => format!("i_progress_{id}.txt"),
            None => "i_progress.txt".to_string(),
        };
        ProgressFile {
            path: output_dir.join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update(&self, progress: &Progress) -> Result<()> {
        debug!(
            "iteration {}/{} after {:?}",
            progress.completed, progress.total, progress.elapsed
        );
        fs::write(
            &self.path,
            format!(
                "{:.1}\n{:.1}\n{:.1}\n",
                progress.percent(),
                progress.remaining_secs(),
                progress.estimated_secs()
            ),
        )?;
        Ok(())
    }
}

pub fn job_id_from_env() -> Option<String> {
    std::env::var(JOB_ID_VAR).ok().filter(|id| !id.is_empty())
}

pub fn result_contents(text: &str, average_ms: f64) -> String {
    format!("{text}\n Inference performed in {average_ms:.1}ms")
}

pub fn stats_contents(average_ms: f64, iterations: usize) -> String {
    format!("{average_ms:.1}\n{iterations}\n")
}

/// Writes `result.txt` and `stats.txt` into `output_dir`.
pub fn write_reports(output_dir: &Path, text: &str, average_ms: f64, iterations: usize) -> Result<()> {
    fs::write(output_dir.join(RESULT_FILE), result_contents(text, average_ms))?;
    fs::write(output_dir.join(STATS_FILE), stats_contents(average_ms, iterations))?;
    info!("Results written to {}", output_dir.display());
    Ok(())
}
