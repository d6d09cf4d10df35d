//! Integration tests for the full conversion pipeline.
//!
//! Drives a scripted in-process engine through the real bootstrap,
//! queue, virtual filesystem, and media extraction paths.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;

use vellum_core::engine::{EngineCommand, EngineLauncher, EngineReply, LocalEngine, spawn_local};
use vellum_core::{
    ConversionRequest, Converter, ConverterConfig, DocumentType, Error, MediaRegistry,
};

// =============================================================================
// Test Helpers
// =============================================================================

const OUTPUT_PREFIX: &[u8] = b"RENDERED:";

/// Behavior knobs for one scripted engine instance.
#[derive(Clone, Default)]
struct Script {
    /// Files planted under `/working/media/` by a successful conversion.
    media: Vec<(String, Vec<u8>)>,
    /// Entry-point status returned by `Convert`.
    status: i32,
}

/// In-process engine with a map-backed filesystem and a conversion
/// entry point that copies its input behind [`OUTPUT_PREFIX`].
struct ScriptedEngine {
    files: HashMap<String, Vec<u8>>,
    script: Script,
}

impl ScriptedEngine {
    fn convert(&mut self, descriptor_path: String) -> EngineReply {
        let Some(descriptor) = self.files.get(&descriptor_path) else {
            return EngineReply::Error {
                message: format!("no descriptor at {descriptor_path}"),
            };
        };
        let descriptor = String::from_utf8_lossy(descriptor).into_owned();
        let (Some(source), Some(target)) = (
            tag_text(&descriptor, "Source"),
            tag_text(&descriptor, "Target"),
        ) else {
            return EngineReply::Error {
                message: "descriptor is missing Source or Target".to_string(),
            };
        };

        if self.script.status != 0 {
            return EngineReply::Converted {
                status: self.script.status,
            };
        }
        let Some(input) = self.files.get(&source) else {
            return EngineReply::Error {
                message: format!("no input at {source}"),
            };
        };

        let mut output = OUTPUT_PREFIX.to_vec();
        output.extend_from_slice(input);
        self.files.insert(target, output);
        for (name, bytes) in &self.script.media {
            self.files
                .insert(format!("/working/media/{name}"), bytes.clone());
        }
        EngineReply::Converted { status: 0 }
    }
}

impl LocalEngine for ScriptedEngine {
    fn call(&mut self, command: EngineCommand) -> EngineReply {
        match command {
            EngineCommand::CreateDir { .. } | EngineCommand::Shutdown => EngineReply::Ok,
            EngineCommand::WriteFile { path, data } => {
                self.files.insert(path, data);
                EngineReply::Ok
            }
            EngineCommand::ReadFile { path } => match self.files.get(&path) {
                Some(data) => EngineReply::File { data: data.clone() },
                None => EngineReply::Error {
                    message: format!("no such file: {path}"),
                },
            },
            EngineCommand::ListDir { path } => {
                let prefix = format!("{path}/");
                let mut names = vec![".".to_string(), "..".to_string()];
                names.extend(self.files.keys().filter_map(|key| {
                    key.strip_prefix(&prefix)
                        .filter(|name| !name.contains('/'))
                        .map(|name| name.to_string())
                }));
                EngineReply::Entries { names }
            }
            EngineCommand::Convert { descriptor } => self.convert(descriptor),
        }
    }
}

/// Extract the text of `<tag>...</tag>`; the scripted engine only sees
/// descriptors without escaped characters in paths.
fn tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml[start..end].to_string())
}

fn scripted_launcher(script: Script, launches: Arc<AtomicUsize>) -> EngineLauncher {
    Arc::new(move || {
        launches.fetch_add(1, Ordering::SeqCst);
        let engine = ScriptedEngine {
            files: HashMap::new(),
            script: script.clone(),
        };
        async move { Ok::<_, Error>(spawn_local(engine)) }.boxed()
    })
}

fn converter(script: Script) -> (Converter, Arc<AtomicUsize>) {
    let launches = Arc::new(AtomicUsize::new(0));
    let launcher = scripted_launcher(script, launches.clone());
    (
        Converter::with_launcher(launcher, ConverterConfig::default()),
        launches,
    )
}

fn request(file_name: &str, bytes: &[u8]) -> ConversionRequest {
    ConversionRequest::new(file_name, None, bytes.to_vec())
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_word_document_round_trip() {
    let (converter, launches) = converter(Script::default());

    let result = converter
        .convert(request("Report.docx", b"docx-bytes"))
        .await
        .unwrap();

    assert_eq!(result.file_name, "Report.docx");
    assert_eq!(result.document_type, DocumentType::Word);
    assert_eq!(result.bytes, b"RENDERED:docx-bytes");
    assert!(result.media.is_empty());
    assert_eq!(launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_csv_reaches_the_engine_as_a_workbook() {
    let (converter, _) = converter(Script::default());

    let result = converter
        .convert(request("data.csv", b"a,b\n1,2\n"))
        .await
        .unwrap();

    // The result keeps the caller's name, but the engine input was the
    // repackaged workbook archive.
    assert_eq!(result.file_name, "data.csv");
    assert_eq!(result.document_type, DocumentType::Cell);
    assert!(result.bytes.starts_with(b"RENDERED:PK\x03\x04"));
}

#[tokio::test]
async fn test_unsupported_extension_fails_without_launching() {
    let (converter, launches) = converter(Script::default());

    let result = converter.convert(request("notes.xyz", b"whatever")).await;

    match result {
        Err(Error::UnsupportedFormat(extension)) => assert_eq!(extension, "xyz"),
        other => panic!("expected unsupported format, got {other:?}"),
    }
    assert_eq!(launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_csv_fails_without_launching() {
    let (converter, launches) = converter(Script::default());

    let result = converter.convert(request("empty.csv", b"")).await;

    match result {
        Err(Error::CsvTranscode(message)) => assert_eq!(message, "file is empty"),
        other => panic!("expected csv transcode error, got {other:?}"),
    }
    assert_eq!(launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_engine_failure_surfaces_the_exit_status() {
    let (converter, _) = converter(Script {
        status: -80,
        ..Script::default()
    });

    let result = converter.convert(request("slides.pptx", b"pptx")).await;

    match result {
        Err(Error::Conversion { code }) => assert_eq!(code, -80),
        other => panic!("expected conversion failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_media_is_extracted_and_registered() {
    let png = vec![0x89, b'P', b'N', b'G'];
    let (converter, _) = converter(Script {
        media: vec![("image1.png".to_string(), png.clone())],
        ..Script::default()
    });

    let result = converter
        .convert(request("Deck.pptx", b"deck-bytes"))
        .await
        .unwrap();

    assert_eq!(result.media.len(), 1);
    let locator = result.media.get("media/image1.png").unwrap();
    let registry: &MediaRegistry = converter.media();
    assert_eq!(*registry.resolve(locator).await.unwrap(), png);
}

#[tokio::test]
async fn test_file_name_is_sanitized_in_the_result() {
    let (converter, _) = converter(Script::default());

    let result = converter
        .convert(request("../we*ird<name>.docx", b"bytes"))
        .await
        .unwrap();

    assert_eq!(result.file_name, "weirdname.docx");
}

#[tokio::test]
async fn test_concurrent_conversions_share_one_engine() {
    let (converter, launches) = converter(Script::default());

    let (a, b, c, d) = tokio::join!(
        converter.convert(request("a.docx", b"a")),
        converter.convert(request("b.xlsx", b"b")),
        converter.convert(request("c.pptx", b"c")),
        converter.convert(request("d.odt", b"d")),
    );

    assert_eq!(a.unwrap().document_type, DocumentType::Word);
    assert_eq!(b.unwrap().document_type, DocumentType::Cell);
    assert_eq!(c.unwrap().document_type, DocumentType::Slide);
    assert_eq!(d.unwrap().document_type, DocumentType::Word);
    assert_eq!(launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_engine_is_relaunched_after_a_failed_bootstrap() {
    let launches = Arc::new(AtomicUsize::new(0));
    let counter = launches.clone();
    let launcher: EngineLauncher = Arc::new(move || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                Err(Error::Initialization("engine crashed on start".to_string()))
            } else {
                Ok(spawn_local(ScriptedEngine {
                    files: HashMap::new(),
                    script: Script::default(),
                }))
            }
        }
        .boxed()
    });
    let converter = Converter::with_launcher(launcher, ConverterConfig::default());

    let first = converter.convert(request("a.docx", b"a")).await;
    assert!(matches!(first, Err(Error::Initialization(_))));

    let second = converter.convert(request("a.docx", b"a")).await.unwrap();
    assert_eq!(second.bytes, b"RENDERED:a");
    assert_eq!(launches.load(Ordering::SeqCst), 2);
}
