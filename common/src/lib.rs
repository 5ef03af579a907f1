//! Shared runtime, logging and configuration for the `ftx` tools
//!
//! Both `ftx-send` and `ftx-recv` hand their async entry point to [`run`], which takes care of
//! logging setup, building a single-threaded tokio runtime, and reporting the final result.

use tracing_subscriber::EnvFilter;

pub mod config;

pub use config::{OutputConfig, TransferConfig};

/// Outcome of a single file transfer, from either end of the connection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub file_name: String,
    pub bytes_transferred: u64,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "file: {}\n\
            bytes transferred: {}",
            self.file_name,
            bytesize::ByteSize(self.bytes_transferred)
        )
    }
}

/// Parses human-readable sizes such as "4KiB", "1M" or "512".
pub fn parse_size(s: &str) -> Result<usize, String> {
    let size = s
        .parse::<bytesize::ByteSize>()
        .map_err(|err| format!("invalid size {s:?}: {err}"))?;
    usize::try_from(size.as_u64()).map_err(|_| format!("size {s:?} is too large"))
}

fn init_tracing(output: &OutputConfig) {
    // RUST_LOG takes precedence over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(output.log_level().as_str()));
    // a subscriber may already be installed (e.g. when called from tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .try_init();
}

/// Runs `func` to completion on a single-threaded runtime.
///
/// Returns `None` if the runtime could not be created or `func` failed; the error is printed to
/// stderr unless `quiet` is set. On success the summary is printed when requested.
pub fn run<Fut, Summary, Error>(
    output: OutputConfig,
    func: impl FnOnce() -> Fut,
) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Error: std::fmt::Display,
    Fut: std::future::Future<Output = Result<Summary, Error>>,
{
    init_tracing(&output);
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            if !output.quiet {
                eprintln!("Failed to create tokio runtime: {error}");
            }
            return None;
        }
    };
    let res = runtime.block_on(func());
    match res {
        Ok(summary) => {
            if output.print_summary {
                println!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{:#}", &error);
            if !output.quiet {
                eprintln!("{error:#}");
            }
            None
        }
    }
}
