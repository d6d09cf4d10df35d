//! Engine process management: discovery, launch, and the stdio bridge.

use std::path::PathBuf;
use std::process::Stdio;

use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::invoker::EngineLauncher;
use crate::engine::protocol::{self, EngineCommand, EngineReply};
use crate::engine::{COMMAND_CHANNEL_CAPACITY, EngineHandle, EngineRequest};
use crate::error::{Error, Result};

/// Environment variable overriding engine discovery.
pub const ENGINE_PATH_ENV: &str = "VELLUM_ENGINE";

/// Binary name looked for next to the executable and on `$PATH`.
pub const ENGINE_BINARY_NAME: &str = "vellum-engine";

/// Resolve the engine binary.
///
/// Order: explicit config path, `VELLUM_ENGINE`, the directory of the
/// current executable, then `$PATH`.
pub fn resolve_engine_binary(config: &EngineConfig) -> Result<PathBuf> {
    if let Some(path) = &config.binary_path {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(Error::Initialization(format!(
            "configured engine binary not found: {}",
            path.display()
        )));
    }

    if let Ok(path) = std::env::var(ENGINE_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        return Err(Error::Initialization(format!(
            "{ENGINE_PATH_ENV} points at a missing binary: {}",
            path.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(ENGINE_BINARY_NAME);
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    which::which(ENGINE_BINARY_NAME).map_err(|_| {
        Error::Initialization(format!(
            "engine binary not found; set {ENGINE_PATH_ENV} or install {ENGINE_BINARY_NAME} on PATH"
        ))
    })
}

/// Launcher that spawns the engine as a child process.
pub(crate) fn process_launcher(config: EngineConfig) -> EngineLauncher {
    std::sync::Arc::new(move || {
        let config = config.clone();
        launch(config).boxed()
    })
}

/// Spawn the engine, wait for its ready signal, and start the service
/// task that owns its stdio.
async fn launch(config: EngineConfig) -> Result<EngineHandle> {
    let binary = resolve_engine_binary(&config)?;
    debug!(engine = %binary.display(), "launching conversion engine");

    let mut child = Command::new(&binary)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| Error::Initialization(format!("failed to spawn engine: {err}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Initialization("engine stdin unavailable".to_string()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Initialization("engine stdout unavailable".to_string()))?;

    // Forward engine stderr into our logs.
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("engine: {line}");
            }
        });
    }

    // The engine announces readiness exactly once before accepting calls.
    match protocol::read_message::<_, EngineReply>(&mut stdout).await {
        Ok(EngineReply::Ready) => {}
        Ok(other) => {
            return Err(Error::Initialization(format!(
                "engine sent {other:?} instead of the ready signal"
            )));
        }
        Err(err) => {
            return Err(Error::Initialization(format!(
                "engine exited before signaling readiness: {err}"
            )));
        }
    }
    info!(engine = %binary.display(), "conversion engine ready");

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(COMMAND_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        while let Some(EngineRequest { command, reply }) = rx.recv().await {
            let outcome = async {
                protocol::write_message(&mut stdin, &command).await?;
                protocol::read_message::<_, EngineReply>(&mut stdout).await
            }
            .await;
            let failed = outcome.is_err();
            let _ = reply.send(outcome);
            if failed {
                warn!("engine stdio broke; shutting the engine down");
                break;
            }
        }
        // Channel closed or stream broken: ask politely, then make sure.
        let _ = protocol::write_message(&mut stdin, &EngineCommand::Shutdown).await;
        if let Err(err) = child.kill().await {
            debug!(error = %err, "engine already gone at kill time");
        }
    });

    Ok(EngineHandle::new(tx))
}
