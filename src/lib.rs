pub mod app;
pub mod bench;
pub mod cli;
pub mod codec;
pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod transformer;

pub use app::{run, RunSummary};
pub use cli::Args;
pub use codec::CharCodec;
pub use config::{ImageSize, InputShape, OcrConfig, OutputLayout};
pub use engine::{InferenceEngine, TractEngine};
pub use error::OcrError;
pub use pipeline::TransformationPipeline;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
