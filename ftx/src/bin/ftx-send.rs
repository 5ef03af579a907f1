use anyhow::Context;
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ftx-send",
    version,
    about = "Send a single file to an `ftx-recv` listener",
    long_about = "`ftx-send` connects to a running `ftx-recv`, announces the file's base name and size, streams its contents and closes the connection.

Only the base name of PATH travels over the wire; the receiver stores the file in its output directory.

EXAMPLES:
    # Send a file to a receiver on the local machine
    ftx-send localhost 9000 ./report.pdf

    # Send with larger chunks and print a summary
    ftx-send 10.0.0.5 9000 /data/image.iso --chunk-size 64KiB --summary"
)]
struct Args {
    // Transfer options
    /// Number of bytes read from the file and written to the connection at a time
    ///
    /// Accepts human-readable sizes like "4KiB", "64KiB", "1MiB".
    #[arg(
        long,
        default_value = "4KiB",
        value_name = "SIZE",
        value_parser = common::parse_size,
        help_heading = "Transfer options"
    )]
    chunk_size: usize,

    // Progress & output
    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // ARGUMENTS
    /// Host name or IP address of the receiver
    #[arg()]
    address: String,

    /// TCP port the receiver listens on
    #[arg()]
    port: u16,

    /// File to send
    #[arg()]
    path: std::path::PathBuf,
}

#[instrument]
async fn async_main(
    args: Args,
    config: common::TransferConfig,
) -> anyhow::Result<common::Summary> {
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid transfer settings")?;
    let session = remote::TransferSession::open(&args.path, config)
        .await
        .with_context(|| format!("ftx-send failed to open {:?}", args.path))?;
    let summary = session
        .send(&args.address, args.port)
        .await
        .with_context(|| {
            format!(
                "ftx-send failed to send {:?} to {}:{}",
                args.path, args.address, args.port
            )
        })?;
    Ok(summary)
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config = common::TransferConfig {
        chunk_size: args.chunk_size,
        ..Default::default()
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let func = {
        let args = args.clone();
        || async_main(args, config)
    };
    let res = common::run(output, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
