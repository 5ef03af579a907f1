use anyhow::Context;
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ftx-recv",
    version,
    about = "Receive files sent by `ftx-send`",
    long_about = "`ftx-recv` listens on a TCP port on all IPv4 interfaces and stores every incoming file in the output directory under the name announced by the sender.

Each connection carries exactly one file. Connections are handled concurrently and a failed transfer never stops the listener. Runs until terminated.

EXAMPLES:
    # Receive into the current directory
    ftx-recv 9000

    # Receive into a dedicated directory, logging every transfer
    ftx-recv 9000 --output-dir /srv/incoming -v"
)]
struct Args {
    // Transfer options
    /// Directory received files are written to
    #[arg(
        long,
        default_value = ".",
        value_name = "DIR",
        help_heading = "Transfer options"
    )]
    output_dir: std::path::PathBuf,

    /// Number of bytes read from a connection and written to the file at a time
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

    /// Largest header accepted before a connection is rejected as malformed
    #[arg(
        long,
        default_value = "4KiB",
        value_name = "SIZE",
        value_parser = common::parse_size,
        help_heading = "Transfer options"
    )]
    max_header_len: usize,

    // Progress & output
    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // ARGUMENTS
    /// TCP port to listen on
    #[arg()]
    port: u16,
}

#[instrument]
async fn async_main(
    args: Args,
    config: common::TransferConfig,
) -> anyhow::Result<std::convert::Infallible> {
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid transfer settings")?;
    let listener = remote::Listener::bind_port(args.port, &args.output_dir, config)
        .await
        .with_context(|| format!("ftx-recv failed to listen on port {}", args.port))?;
    Ok(listener.run().await)
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config = common::TransferConfig {
        chunk_size: args.chunk_size,
        max_header_len: args.max_header_len,
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: false,
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
