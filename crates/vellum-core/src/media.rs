//! In-memory store for media extracted from converted documents.
//!
//! Converted output references images by document-internal paths such
//! as `media/image1.png`. The bytes themselves are parked in a
//! [`MediaRegistry`] and addressed through opaque locators, so viewers
//! can fetch them without touching the engine again.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::vfs::{VirtualFilesystem, layout};

const LOCATOR_PREFIX: &str = "mem://media/";

/// Opaque handle to one registered media payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MediaLocator(String);

impl MediaLocator {
    fn generate() -> Self {
        MediaLocator(format!("{LOCATOR_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared registry of extracted media payloads.
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Clone, Default)]
pub struct MediaRegistry {
    entries: Arc<RwLock<HashMap<MediaLocator, Arc<Vec<u8>>>>>,
}

impl MediaRegistry {
    /// Park a payload and return its locator.
    pub async fn register(&self, bytes: Vec<u8>) -> MediaLocator {
        let locator = MediaLocator::generate();
        self.entries
            .write()
            .await
            .insert(locator.clone(), Arc::new(bytes));
        locator
    }

    /// Look up a previously registered payload.
    pub async fn resolve(&self, locator: &MediaLocator) -> Option<Arc<Vec<u8>>> {
        self.entries.read().await.get(locator).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Pull every file out of the working media directory and register it.
///
/// Returns a map from document-internal path (`media/<name>`) to
/// locator. Documents without media are the common case, so a missing
/// or unreadable media directory yields an empty map rather than an
/// error.
pub(crate) async fn extract_media(
    vfs: &VirtualFilesystem,
    registry: &MediaRegistry,
) -> HashMap<String, MediaLocator> {
    let names = match vfs.list(layout::MEDIA_DIR).await {
        Ok(names) => names,
        Err(error) => {
            debug!(%error, "no readable media directory after conversion");
            return HashMap::new();
        }
    };

    let mut media = HashMap::new();
    for name in names {
        let path = layout::media_path(&name);
        match vfs.read(&path).await {
            Ok(bytes) => {
                let locator = registry.register(bytes).await;
                media.insert(format!("media/{name}"), locator);
            }
            Err(error) => warn!(%path, %error, "skipping unreadable media file"),
        }
    }
    media
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCommand, EngineReply, LocalEngine, spawn_local};

    struct MediaFs {
        files: HashMap<String, Vec<u8>>,
        listable: bool,
    }

    impl LocalEngine for MediaFs {
        fn call(&mut self, command: EngineCommand) -> EngineReply {
            match command {
                EngineCommand::ListDir { .. } if !self.listable => EngineReply::Error {
                    message: "no such directory".to_string(),
                },
                EngineCommand::ListDir { path } => {
                    let prefix = format!("{path}/");
                    let mut names = vec![".".to_string(), "..".to_string()];
                    names.extend(self.files.keys().filter_map(|key| {
                        key.strip_prefix(&prefix).map(|name| name.to_string())
                    }));
                    EngineReply::Entries { names }
                }
                EngineCommand::ReadFile { path } => match self.files.get(&path) {
                    Some(data) => EngineReply::File { data: data.clone() },
                    None => EngineReply::Error {
                        message: "no such file".to_string(),
                    },
                },
                _ => EngineReply::Ok,
            }
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = MediaRegistry::default();
        let locator = registry.register(vec![1, 2, 3]).await;
        assert!(locator.as_str().starts_with(LOCATOR_PREFIX));
        assert_eq!(*registry.resolve(&locator).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_locator_resolves_to_none() {
        let registry = MediaRegistry::default();
        let other = MediaLocator::generate();
        assert!(registry.resolve(&other).await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let registry = MediaRegistry::default();
        let clone = registry.clone();
        let locator = registry.register(vec![9]).await;
        assert!(clone.resolve(&locator).await.is_some());
    }

    #[tokio::test]
    async fn test_extract_media_maps_document_paths() {
        let mut files = HashMap::new();
        files.insert(
            "/working/media/image1.png".to_string(),
            vec![0x89, b'P', b'N', b'G'],
        );
        let engine = spawn_local(MediaFs {
            files,
            listable: true,
        });
        let vfs = VirtualFilesystem::new(engine);
        let registry = MediaRegistry::default();

        let media = extract_media(&vfs, &registry).await;
        assert_eq!(media.len(), 1);
        let locator = media.get("media/image1.png").unwrap();
        assert_eq!(
            *registry.resolve(locator).await.unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
    }

    #[tokio::test]
    async fn test_unlistable_media_dir_yields_empty_map() {
        let engine = spawn_local(MediaFs {
            files: HashMap::new(),
            listable: false,
        });
        let vfs = VirtualFilesystem::new(engine);
        let registry = MediaRegistry::default();

        let media = extract_media(&vfs, &registry).await;
        assert!(media.is_empty());
        assert!(registry.is_empty().await);
    }
}
