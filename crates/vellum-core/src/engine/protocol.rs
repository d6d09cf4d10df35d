//! Wire protocol between the pipeline and the engine process.
//!
//! Messages are JSON, framed with a 4-byte little-endian length prefix.
//! Binary payloads travel base64-encoded inside the JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Upper bound on one frame. Documents can be large; anything past this
/// is treated as a corrupt stream.
pub const MAX_FRAME_SIZE: u32 = 256 * 1024 * 1024;

/// Commands accepted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EngineCommand {
    /// Create a directory in the engine's private filesystem.
    CreateDir { path: String },
    /// Write a file into the engine's private filesystem.
    WriteFile {
        path: String,
        #[serde(with = "b64")]
        data: Vec<u8>,
    },
    /// Read a file back out.
    ReadFile { path: String },
    /// List the entries of a directory.
    ListDir { path: String },
    /// Run the conversion described by the descriptor at `descriptor`.
    Convert { descriptor: String },
    /// Ask the engine to exit.
    Shutdown,
}

/// Replies produced by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EngineReply {
    /// Sent exactly once, unprompted, when the engine can accept calls.
    Ready,
    /// Command succeeded with nothing to return.
    Ok,
    /// File contents for `ReadFile`.
    File {
        #[serde(with = "b64")]
        data: Vec<u8>,
    },
    /// Directory entries for `ListDir`.
    Entries { names: Vec<String> },
    /// Entry-point status for `Convert`; zero is success.
    Converted { status: i32 },
    /// Command failed.
    Error { message: String },
}

/// Write one length-prefixed message.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(message)
        .map_err(|err| Error::Protocol(format!("failed to encode message: {err}")))?;
    if body.len() as u64 > MAX_FRAME_SIZE as u64 {
        return Err(Error::Protocol(format!(
            "outgoing frame of {} bytes exceeds the {} byte cap",
            body.len(),
            MAX_FRAME_SIZE
        )));
    }
    writer.write_all(&(body.len() as u32).to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix).await?;
    let len = u32::from_le_bytes(prefix);
    if len > MAX_FRAME_SIZE {
        return Err(Error::Protocol(format!(
            "incoming frame of {len} bytes exceeds the {MAX_FRAME_SIZE} byte cap"
        )));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    serde_json::from_slice(&body)
        .map_err(|err| Error::Protocol(format!("failed to decode message: {err}")))
}

/// Base64 (de)serialization for binary fields inside JSON frames.
mod b64 {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
