//! Engine lifecycle: single-flight bootstrap and entry-point invocation.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::engine::protocol::{EngineCommand, EngineReply};
use crate::engine::{EngineHandle, process};
use crate::error::{Error, Result};
use crate::vfs::{VirtualFilesystem, layout};

/// Produces a ready [`EngineHandle`]. The default launcher spawns the
/// engine process; tests and embedders provide their own.
pub type EngineLauncher = Arc<dyn Fn() -> BoxFuture<'static, Result<EngineHandle>> + Send + Sync>;

/// Bootstrap outcome shared by every concurrent caller of one attempt.
#[derive(Debug, Clone)]
enum BootFailure {
    Timeout(Duration),
    Failed(String),
}

impl BootFailure {
    fn into_error(self) -> Error {
        match self {
            Self::Timeout(limit) => Error::InitializationTimeout(limit),
            Self::Failed(message) => Error::Initialization(message),
        }
    }
}

type BootOutcome = std::result::Result<EngineHandle, BootFailure>;
type BootFuture = Shared<BoxFuture<'static, BootOutcome>>;

#[derive(Default)]
struct BootSlot {
    /// Bumped whenever a new attempt is installed, so a stale failure
    /// only clears its own attempt.
    generation: u64,
    current: Option<BootFuture>,
}

/// Owns the engine: bootstraps it at most once at a time and invokes
/// its single entry point.
///
/// `handle()` is single-flight: callers arriving during a bootstrap
/// share the in-flight outcome instead of launching twice. A failed or
/// timed-out attempt clears the slot so a later call retries fresh.
pub struct EngineManager {
    launcher: EngineLauncher,
    bootstrap_timeout: Duration,
    boot: Mutex<BootSlot>,
}

impl EngineManager {
    /// Manager that launches the engine process per `config`.
    pub fn new(config: EngineConfig) -> Self {
        let bootstrap_timeout = config.bootstrap_timeout;
        Self::with_launcher(process::process_launcher(config), bootstrap_timeout)
    }

    /// Manager with a custom launcher.
    pub fn with_launcher(launcher: EngineLauncher, bootstrap_timeout: Duration) -> Self {
        Self {
            launcher,
            bootstrap_timeout,
            boot: Mutex::new(BootSlot::default()),
        }
    }

    /// The live engine handle, bootstrapping on first use.
    pub async fn handle(&self) -> Result<EngineHandle> {
        // Two passes: the first may find a handle whose engine has since
        // exited; the second launches fresh.
        for _ in 0..2 {
            let (boot, generation, fresh) = {
                let mut slot = self.boot.lock().await;
                match slot.current.clone() {
                    Some(boot) => (boot, slot.generation, false),
                    None => {
                        let boot = Self::bootstrap(self.launcher.clone(), self.bootstrap_timeout)
                            .boxed()
                            .shared();
                        slot.generation += 1;
                        slot.current = Some(boot.clone());
                        (boot, slot.generation, true)
                    }
                }
            };

            match boot.await {
                Ok(handle) if !handle.is_closed() => return Ok(handle),
                Ok(_) if fresh => {
                    self.clear(generation).await;
                    return Err(Error::Initialization(
                        "engine exited during startup".to_string(),
                    ));
                }
                Ok(_) => {
                    debug!("cached engine has exited; relaunching");
                    self.clear(generation).await;
                }
                Err(failure) => {
                    self.clear(generation).await;
                    return Err(failure.into_error());
                }
            }
        }
        Err(Error::Initialization(
            "engine keeps exiting immediately after launch".to_string(),
        ))
    }

    /// Run the engine's entry point against a written descriptor.
    pub async fn invoke(&self, descriptor_path: &str) -> Result<()> {
        let handle = self.handle().await?;
        let reply = handle
            .request(EngineCommand::Convert {
                descriptor: descriptor_path.to_string(),
            })
            .await?;
        match reply {
            EngineReply::Converted { status: 0 } => Ok(()),
            EngineReply::Converted { status } => {
                self.log_failed_descriptor(&handle, descriptor_path, status)
                    .await;
                Err(Error::Conversion { code: status })
            }
            EngineReply::Error { message } => Err(Error::Engine(message)),
            other => Err(Error::Protocol(format!(
                "unexpected reply to convert: {other:?}"
            ))),
        }
    }

    /// Read the descriptor back for the failure log. Read-back problems
    /// are logged themselves and never mask the conversion error.
    async fn log_failed_descriptor(&self, handle: &EngineHandle, path: &str, status: i32) {
        match handle
            .request(EngineCommand::ReadFile {
                path: path.to_string(),
            })
            .await
        {
            Ok(EngineReply::File { data }) => {
                error!(
                    status,
                    descriptor = %String::from_utf8_lossy(&data),
                    "engine conversion failed"
                );
            }
            Ok(other) => {
                error!(status, reply = ?other, "engine conversion failed; descriptor read-back returned an unexpected reply");
            }
            Err(err) => {
                error!(status, error = %err, "engine conversion failed; descriptor read-back failed");
            }
        }
    }

    async fn clear(&self, generation: u64) {
        let mut slot = self.boot.lock().await;
        if slot.generation == generation {
            slot.current = None;
        }
    }

    async fn bootstrap(launcher: EngineLauncher, limit: Duration) -> BootOutcome {
        let attempt = async move {
            let handle = launcher()
                .await
                .map_err(|err| BootFailure::Failed(err.to_string()))?;
            create_working_layout(&handle).await;
            info!("engine working directories ready");
            Ok(handle)
        };
        match tokio::time::timeout(limit, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => Err(BootFailure::Timeout(limit)),
        }
    }
}

/// Create the fixed working-directory layout. Already-present
/// directories are expected on relaunch and never fail the bootstrap.
async fn create_working_layout(handle: &EngineHandle) {
    let vfs = VirtualFilesystem::new(handle.clone());
    for dir in layout::WORKING_DIRS {
        if let Err(err) = vfs.create_dir(dir).await {
            debug!(dir, error = %err, "skipping working directory creation");
        }
    }
}
