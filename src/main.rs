//! nft-viewer - iptables-style listing of the nftables ruleset
//!
//! Reads `nft --json list ruleset` and prints one block per netfilter hook,
//! in packet traversal order, with every chain's rules as a table.
//!
//! # Usage
//!
//! ```bash
//! nft-viewer                       # all hooks
//! nft-viewer -L input              # only the input hook
//! nft-viewer -t filter -c forward  # one chain of one table
//! nft-viewer -s                    # named sets as nft statements
//! nft-viewer -i saved.json         # a saved listing instead of nft
//! nft-viewer -j                    # raw JSON passthrough
//! ```

use clap::Parser;
use nft_viewer::config::{ViewerConfig, load_config};
use nft_viewer::core::error::{Error, NftablesErrorPattern, ProviderError};
use nft_viewer::core::expr::RenderOptions;
use nft_viewer::core::report::{HookFilter, ReportBuilder, ReportFilter};
use nft_viewer::core::ruleset::Ruleset;
use nft_viewer::core::sets::render_sets;
use nft_viewer::layout::{json_passthrough, render_report, render_set_lines};
use nft_viewer::provider::{NftCommand, RulesetSource};
use nft_viewer::style::{ColorMode, Emphasis};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, warn};

shadow_rs::shadow!(build);

const LONG_VERSION: &str = shadow_rs::formatcp!(
    "{}\ncommit: {}\nbuilt: {}\nrustc: {}",
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION
);

#[derive(Parser, Debug)]
#[command(name = "nft-viewer")]
#[command(about = "iptables-like listing of the nftables ruleset", long_about = None)]
#[command(version = build::PKG_VERSION, long_version = LONG_VERSION)]
struct Cli {
    /// Hook to list: all, ingress, prerouting, input, forward, output,
    /// postrouting or unhooked
    #[arg(short = 'L', long, value_name = "HOOK", default_value = "all")]
    hook: HookFilter,

    /// Only list this chain ("all" lists every chain)
    #[arg(short, long, value_name = "NAME")]
    chain: Option<String>,

    /// Only list chains of this table ("all" lists every table)
    #[arg(short, long, value_name = "NAME")]
    table: Option<String>,

    /// List named sets instead of chains (all sets without a name)
    #[arg(short, long, value_name = "NAME", num_args = 0..=1, default_missing_value = "all")]
    set: Option<String>,

    /// Print exact packet and byte counters
    #[arg(short = 'x', long)]
    exact: bool,

    /// Print the raw JSON listing
    #[arg(short, long)]
    json: bool,

    /// Read the listing from a file ("-" for stdin) instead of running nft
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// When to use colors
    #[arg(long, value_name = "WHEN")]
    color: Option<ColorMode>,

    /// Alternate config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logging waits for the config so that warnings honor its color setting
    let config = match runtime.block_on(load_config(cli.config.as_deref())) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e);
            return ExitCode::FAILURE;
        }
    };
    let color = cli.color.unwrap_or(config.color);

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_ansi(Emphasis::detect_stderr(color).is_terminal())
        .with_target(false)
        .without_time()
        .init();

    match runtime.block_on(run(cli, config, color)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(error: &Error) {
    for line in error_lines(error) {
        eprintln!("{line}");
    }
}

/// The `Error:` line, then the translated explanation and hints for
/// failures of the listing itself.
fn error_lines(error: &Error) -> Vec<String> {
    let mut lines = vec![format!("Error: {error}")];
    let translatable = match error {
        Error::Provider(ProviderError::Read { .. }) => false,
        Error::Provider(_) | Error::MalformedDocument(_) => true,
        _ => false,
    };
    if translatable {
        let translation = NftablesErrorPattern::match_error(&error.to_string());
        lines.push(format!("  {}", translation.user_message));
        for suggestion in translation.suggestions {
            lines.push(format!("  hint: {suggestion}"));
        }
    }
    lines
}

async fn run(cli: Cli, config: ViewerConfig, color: ColorMode) -> Result<(), Error> {
    debug!("Effective config: {config:?}");

    let source = source_for(&cli, &config)?;
    let text = source.fetch().await?;

    let mut stdout = std::io::stdout().lock();

    if cli.json {
        stdout.write_all(json_passthrough(&text)?.as_bytes())?;
        return Ok(());
    }

    let ruleset = Ruleset::from_json(&text)?;

    if let Some(set) = cli.set.as_deref() {
        let lines = render_sets(&ruleset.sets, Some(set));
        stdout.write_all(render_set_lines(&lines).as_bytes())?;
        return Ok(());
    }

    let emphasis = Emphasis::detect(color);
    let options = RenderOptions {
        exact: cli.exact || config.exact,
        emphasis,
    };
    let filter = ReportFilter {
        hook: cli.hook,
        chain: cli.chain,
        table: cli.table,
    };

    let report = ReportBuilder::new(&ruleset)
        .filter(filter)
        .options(options)
        .build();
    for warning in &report.warnings {
        warn!("{warning}");
    }

    stdout.write_all(render_report(&report, emphasis).as_bytes())?;
    Ok(())
}

fn source_for(cli: &Cli, config: &ViewerConfig) -> Result<RulesetSource, Error> {
    match &cli.input {
        Some(input) => Ok(RulesetSource::from_input(input.clone())),
        None => Ok(RulesetSource::Nft(NftCommand::from_config(config)?)),
    }
}
