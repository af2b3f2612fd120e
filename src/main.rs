//! sheaf - asset bundler.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{ColorChoice, Parser};

use sheaf::cli::{Cli, Commands};
use sheaf::config::{BundleConfig, ConfigError, find_config_file};
use sheaf::core::Cancellation;
use sheaf::{Bundler, log, logger};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Build { debug } => build(&config, debug),
        Commands::Check => check(&config),
    }
}

fn load_config(name: &Path) -> Result<BundleConfig> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let path = find_config_file(&cwd, name).ok_or_else(|| ConfigError::NotFound(name.to_path_buf()))?;
    Ok(BundleConfig::load(&path)?)
}

fn build(config: &BundleConfig, debug: bool) -> Result<()> {
    let bundler = Bundler::from_config(config, debug)?;

    // Ctrl+C cancels the running build; groups stop at their next check
    let cancel = Cancellation::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || {
        log!("bundle"; "cancelling...");
        handle.cancel();
    })?;

    let report = bundler.process_groups_with(bundler.groups(), &cancel)?;

    for (key, output) in &report.outputs {
        println!("<!-- {key} -->");
        println!("{}", output.markup);
    }
    for failure in &report.failures {
        log!("error"; "{} `{}`: {}", failure.key.namespace, failure.name, describe(&failure.error));
    }

    if !report.is_success() {
        bail!("{} of {} group(s) failed", report.failures.len(), bundler.groups().len());
    }
    log!("bundle"; "{} group(s) bundled", report.outputs.len());
    Ok(())
}

fn check(config: &BundleConfig) -> Result<()> {
    let bundler = Bundler::from_config(config, false)?;

    let mut failed = 0;
    for group in bundler.groups() {
        match bundler.check_group(group) {
            Ok(files) => log!("check"; "{} `{}`: {} file(s)", group.namespace, group.name, files),
            Err(e) => {
                failed += 1;
                log!("error"; "{} `{}`: {}", group.namespace, group.name, describe(&e));
            }
        }
    }

    if failed > 0 {
        bail!("{failed} group(s) failed the check");
    }
    Ok(())
}

/// Error message followed by its source chain.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
