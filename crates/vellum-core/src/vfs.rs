//! Typed access to the engine's private filesystem.

use crate::engine::{EngineCommand, EngineHandle, EngineReply};
use crate::error::{Error, Result};

/// Fixed virtual paths inside the engine.
///
/// The layout is created once at bootstrap:
///
/// ```text
/// /working/          input documents, descriptor, outputs
/// ├── media/         images harvested after conversion
/// ├── fonts/         engine font cache
/// └── themes/        presentation theme data
/// ```
pub mod layout {
    pub const WORKING_DIR: &str = "/working";
    pub const MEDIA_DIR: &str = "/working/media";
    pub const FONTS_DIR: &str = "/working/fonts";
    pub const THEMES_DIR: &str = "/working/themes";

    /// Descriptor location, overwritten before every invocation.
    pub const DESCRIPTOR_PATH: &str = "/working/params.xml";

    /// Suffix appended to an input path to form its output path.
    pub const OUTPUT_SUFFIX: &str = ".bin";

    /// Bootstrap creation order; parents first.
    pub const WORKING_DIRS: [&str; 4] = [WORKING_DIR, MEDIA_DIR, FONTS_DIR, THEMES_DIR];

    /// Where an input file with this (sanitized) name is written.
    pub fn input_path(file_name: &str) -> String {
        format!("{WORKING_DIR}/{file_name}")
    }

    /// The engine writes conversion output next to the input.
    pub fn output_path(input_path: &str) -> String {
        format!("{input_path}{OUTPUT_SUFFIX}")
    }

    /// Path of a harvested media file.
    pub fn media_path(file_name: &str) -> String {
        format!("{MEDIA_DIR}/{file_name}")
    }
}

/// Thin facade over the engine's filesystem commands. No retry logic;
/// failures propagate verbatim.
pub struct VirtualFilesystem {
    engine: EngineHandle,
}

impl VirtualFilesystem {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let reply = self
            .engine
            .request(EngineCommand::WriteFile {
                path: path.to_string(),
                data: bytes.to_vec(),
            })
            .await?;
        match reply {
            EngineReply::Ok => Ok(()),
            other => Err(reply_error(path, other)),
        }
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let reply = self
            .engine
            .request(EngineCommand::ReadFile {
                path: path.to_string(),
            })
            .await?;
        match reply {
            EngineReply::File { data } => Ok(data),
            other => Err(reply_error(path, other)),
        }
    }

    /// Directory entries with the `.` and `..` pseudo-entries removed.
    pub async fn list(&self, path: &str) -> Result<Vec<String>> {
        let reply = self
            .engine
            .request(EngineCommand::ListDir {
                path: path.to_string(),
            })
            .await?;
        match reply {
            EngineReply::Entries { names } => Ok(names
                .into_iter()
                .filter(|name| !is_pseudo_entry(name))
                .collect()),
            other => Err(reply_error(path, other)),
        }
    }

    pub async fn create_dir(&self, path: &str) -> Result<()> {
        let reply = self
            .engine
            .request(EngineCommand::CreateDir {
                path: path.to_string(),
            })
            .await?;
        match reply {
            EngineReply::Ok => Ok(()),
            other => Err(reply_error(path, other)),
        }
    }
}

fn is_pseudo_entry(name: &str) -> bool {
    name == "." || name == ".."
}

fn reply_error(path: &str, reply: EngineReply) -> Error {
    match reply {
        EngineReply::Error { message } => Error::Vfs {
            path: path.to_string(),
            message,
        },
        other => Error::Protocol(format!("unexpected reply for {path}: {other:?}")),
    }
}
