use clap::Parser;
use tracing::error;

use lstm_ocr_bench::{init_tracing, run, Args};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}
