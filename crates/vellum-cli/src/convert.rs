//! Convert command implementation for the vellum CLI.
//!
//! Reads a document from disk, runs it through the conversion pipeline,
//! and writes the viewer payload plus any extracted media.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;

use vellum_core::{ConversionRequest, Converter, ConverterConfig};

use crate::colors;

pub async fn execute(
    input: &str,
    output: Option<&str>,
    media_dir: Option<&str>,
    content_type: Option<&str>,
    engine: Option<&str>,
) -> anyhow::Result<()> {
    let start = Instant::now();

    let input_path = Path::new(input);
    let bytes = tokio::fs::read(input_path)
        .await
        .with_context(|| format!("failed to read {input}"))?;
    let file_name = input_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{input} has no file name"))?;

    println!(
        "{}Converting{} {} ({} bytes)",
        colors::BOLD,
        colors::RESET,
        input,
        bytes.len()
    );

    let converter = Converter::new(config_with_engine(engine));
    let request = ConversionRequest::new(file_name, content_type, bytes);
    let result = converter.convert(request).await?;

    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{input}.bin")));
    tokio::fs::write(&output_path, &result.bytes)
        .await
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    if let Some(dir) = media_dir {
        if !result.media.is_empty() {
            write_media(&converter, &result.media, Path::new(dir)).await?;
            println!(
                "{}Media{} {} files written to {}",
                colors::CYAN,
                colors::RESET,
                result.media.len(),
                dir
            );
        }
    }

    println!(
        "{}Converted{} {} -> {} ({} document, {} bytes) in {:.2}s",
        colors::GREEN,
        colors::RESET,
        result.file_name,
        output_path.display(),
        result.document_type,
        result.bytes.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

async fn write_media(
    converter: &Converter,
    media: &std::collections::HashMap<String, vellum_core::MediaLocator>,
    dir: &Path,
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let registry = converter.media();
    for (key, locator) in media {
        let Some(bytes) = registry.resolve(locator).await else {
            continue;
        };
        let name = key.rsplit_once('/').map(|(_, name)| name).unwrap_or(key);
        let path = dir.join(name);
        tokio::fs::write(&path, bytes.as_slice())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn config_with_engine(engine: Option<&str>) -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.engine.binary_path = engine.map(PathBuf::from);
    config
}
