//! Vellum CLI - office-document conversion via the vellum engine.

mod check;
mod colors;
mod convert;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vellum")]
#[command(about = "Convert office documents into viewer-ready binary payloads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document to the viewer binary format
    Convert {
        /// Path to the input document
        input: String,

        /// Output path (default: <input>.bin)
        #[arg(short, long)]
        output: Option<String>,

        /// Directory to write extracted media files into
        #[arg(long)]
        media_dir: Option<String>,

        /// Declared media type, consulted before the file extension
        #[arg(long)]
        content_type: Option<String>,

        /// Path to the engine binary
        #[arg(long)]
        engine: Option<String>,
    },

    /// Verify the engine installation
    Check {
        /// Path to the engine binary
        #[arg(long)]
        engine: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Helper to attach recovery hints to conversion-layer errors
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<vellum_core::Error>() {
            if let Some(hint) = hint_for(core_err) {
                return anyhow::anyhow!("{core_err}\n  hint: {hint}");
            }
        }
        err
    };

    match cli.command {
        Commands::Convert {
            input,
            output,
            media_dir,
            content_type,
            engine,
        } => {
            convert::execute(
                &input,
                output.as_deref(),
                media_dir.as_deref(),
                content_type.as_deref(),
                engine.as_deref(),
            )
            .await
            .map_err(format_error)?;
        }

        Commands::Check { engine } => {
            check::execute(engine.as_deref())
                .await
                .map_err(format_error)?;
        }
    }

    Ok(())
}

fn hint_for(error: &vellum_core::Error) -> Option<String> {
    match error {
        vellum_core::Error::Initialization(_)
        | vellum_core::Error::InitializationTimeout(_)
        | vellum_core::Error::Engine(_) => Some(
            "verify the engine with `vellum check`, or point --engine or VELLUM_ENGINE at the binary"
                .to_string(),
        ),
        vellum_core::Error::UnsupportedFormat(_) => Some(format!(
            "supported extensions: {}",
            vellum_core::document::SUPPORTED_EXTENSIONS.join(", ")
        )),
        _ => None,
    }
}
