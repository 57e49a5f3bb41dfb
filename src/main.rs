use anyhow::bail;
use clap::Parser;
use env_logger::Env;

use mtime_fix::{config, fixer, Config, Mode};

/// Fix file modification times using dates found in their paths.
///
/// Reads the periods from `$MTIME_FIX_CONFIG` or `./mtime-fix.toml`.
#[derive(Parser, Debug)]
#[command(name = "mtime-fix", version, about)]
struct Cli {
    /// Change the mtimes; without it only the intended changes are printed
    #[arg(short = 'c', long = "change")]
    change: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config_path = config::default_path();
    let config = Config::load(&config_path)?;
    if config.periods.is_empty() {
        log::warn!("{:?} configures no periods, nothing to do", config_path);
    }

    let mode = if cli.change { Mode::Apply } else { Mode::DryRun };
    let summary = fixer::run(&config, mode)?;
    log::info!(
        "{} files scanned, {} matched, {} {}, {} already correct, {} failed",
        summary.scanned,
        summary.matched,
        summary.changed,
        if mode == Mode::Apply { "changed" } else { "to change" },
        summary.unchanged,
        summary.failed
    );

    if summary.failed > 0 {
        bail!("{} file(s) could not be updated", summary.failed);
    }
    Ok(())
}
