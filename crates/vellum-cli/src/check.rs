//! Check command implementation for the vellum CLI.
//!
//! Resolves the engine binary and performs one boot to verify the
//! installation end to end.

use std::path::PathBuf;
use std::time::Instant;

use vellum_core::engine::resolve_engine_binary;
use vellum_core::{Converter, ConverterConfig};

use crate::colors;

pub async fn execute(engine: Option<&str>) -> anyhow::Result<()> {
    let mut config = ConverterConfig::default();
    config.engine.binary_path = engine.map(PathBuf::from);

    let binary = resolve_engine_binary(&config.engine)?;
    println!(
        "{}Engine binary{} {}",
        colors::BOLD,
        colors::RESET,
        binary.display()
    );

    let start = Instant::now();
    let converter = Converter::new(config);
    converter.ensure_ready().await?;

    println!(
        "{}Ready{} engine booted in {:.2}s",
        colors::GREEN,
        colors::RESET,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
