//! The conversion pipeline.
//!
//! [`Converter`] is the crate's front door: it owns the engine
//! lifecycle, serializes conversions through the operation queue, and
//! turns raw document bytes into viewer-ready output plus extracted
//! media. Cloning a [`Converter`] is cheap; clones share the engine,
//! the queue, and the media registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::ConverterConfig;
use crate::csv;
use crate::descriptor::ConversionParameters;
use crate::document::{self, ConversionRequest, DocumentType};
use crate::engine::{EngineLauncher, EngineManager};
use crate::error::Result;
use crate::media::{self, MediaLocator, MediaRegistry};
use crate::queue::OperationQueue;
use crate::vfs::{VirtualFilesystem, layout};

/// Output of one successful conversion.
#[derive(Debug)]
pub struct ConversionResult {
    /// Sanitized form of the name the document arrived under.
    pub file_name: String,
    /// Family the document was classified as.
    pub document_type: DocumentType,
    /// Converted document payload.
    pub bytes: Vec<u8>,
    /// Document-internal media paths mapped to registry locators.
    pub media: HashMap<String, MediaLocator>,
}

struct ConverterInner {
    engine: EngineManager,
    media: MediaRegistry,
}

/// Document converter backed by one lazily booted engine.
#[derive(Clone)]
pub struct Converter {
    inner: Arc<ConverterInner>,
    queue: OperationQueue,
}

impl Converter {
    /// Converter that launches the engine as an external process.
    pub fn new(config: ConverterConfig) -> Self {
        let queue = OperationQueue::new(config.queue_wait);
        Converter {
            inner: Arc::new(ConverterInner {
                engine: EngineManager::new(config.engine),
                media: MediaRegistry::default(),
            }),
            queue,
        }
    }

    /// Converter with a caller-supplied engine launcher.
    pub fn with_launcher(launcher: EngineLauncher, config: ConverterConfig) -> Self {
        let queue = OperationQueue::new(config.queue_wait);
        Converter {
            inner: Arc::new(ConverterInner {
                engine: EngineManager::with_launcher(launcher, config.engine.bootstrap_timeout),
                media: MediaRegistry::default(),
            }),
            queue,
        }
    }

    /// Registry holding media extracted by past conversions.
    pub fn media(&self) -> &MediaRegistry {
        &self.inner.media
    }

    /// Boot the engine without converting anything.
    pub async fn ensure_ready(&self) -> Result<()> {
        let inner = self.inner.clone();
        self.queue
            .run("engine warm-up", async move {
                inner.engine.handle().await.map(|_| ())
            })
            .await?
    }

    /// Convert one document.
    ///
    /// Requests that can never convert fail here immediately; everything
    /// else runs in submission order against the engine.
    pub async fn convert(&self, request: ConversionRequest) -> Result<ConversionResult> {
        let document_type = document::detect_type(&request.extension)?;
        if request.extension == document::CSV_EXTENSION {
            csv::reject_empty(&request.bytes)?;
        }

        let label = format!("convert {}", request.file_name);
        let inner = self.inner.clone();
        self.queue
            .run(&label, async move {
                inner.convert_serialized(document_type, request).await
            })
            .await?
    }
}

impl ConverterInner {
    async fn convert_serialized(
        &self,
        document_type: DocumentType,
        request: ConversionRequest,
    ) -> Result<ConversionResult> {
        let started = Instant::now();
        let ConversionRequest {
            file_name,
            extension,
            bytes,
        } = request;
        debug!(%file_name, %document_type, "starting conversion");

        let handle = self.engine.handle().await?;
        let vfs = VirtualFilesystem::new(handle);

        // The engine cannot open CSV; repackage it as a spreadsheet.
        let (working_name, payload) = if extension == document::CSV_EXTENSION {
            let transcoded = csv::transcode(&file_name, &bytes)?;
            (transcoded.file_name, transcoded.bytes)
        } else {
            (file_name.clone(), bytes)
        };
        let working_name = document::sanitize_file_name(&working_name);

        let input_path = layout::input_path(&working_name);
        vfs.write(&input_path, &payload).await?;

        let output_path = layout::output_path(&input_path);
        let parameters = ConversionParameters::new(&input_path, &output_path);
        vfs.write(layout::DESCRIPTOR_PATH, parameters.to_xml().as_bytes())
            .await?;

        self.engine.invoke(layout::DESCRIPTOR_PATH).await?;

        let bytes = vfs.read(&output_path).await?;
        let media = media::extract_media(&vfs, &self.media).await;

        info!(
            %file_name,
            %document_type,
            output_bytes = bytes.len(),
            media_files = media.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "conversion finished"
        );
        Ok(ConversionResult {
            file_name: document::sanitize_file_name(&file_name),
            document_type,
            bytes,
            media,
        })
    }
}
