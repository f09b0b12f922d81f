use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use syntaxfix_cli::config::{self, CliRunArgs, ConfigMerger};
use std::process::ExitCode;
use syntaxfix_core::adapters::{FsCommitPort, FsSourceReader, FsWritePort};
use syntaxfix_core::{build_rule_set, run_repair, write_report_artifacts};
use syntaxfix_render::{render_report_text, render_rule_list};
use syntaxfix_rules::RuleSet;
use syntaxfix_types::report::ToolInfo;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "syntaxfix",
    version,
    about = "Repairs mechanically corrupted TypeScript sources by applying declarative rewrite rules to a fixed point."
)]
struct Cli {
    /// Files or directories to repair.
    #[arg(default_value = ".")]
    paths: Vec<Utf8PathBuf>,

    /// Maximum passes per file before it is reported as non-converged.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_passes: Option<u32>,

    /// Compute and print diffs; never write.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// File extensions to scan (comma-separated, default: ts,tsx).
    #[arg(long, value_delimiter = ',')]
    extensions: Vec<String>,

    /// Exclude a directory name, path prefix, suffix or glob (repeatable).
    #[arg(long)]
    exclude: Vec<String>,

    /// Do not apply the standard exclusions (node_modules, .git, .next, dist, build).
    #[arg(long, default_value_t = false)]
    no_default_excludes: bool,

    /// Extra rule file (repeatable).
    #[arg(long = "rules")]
    rules: Vec<Utf8PathBuf>,

    /// Do not load the built-in rule catalog.
    #[arg(long, default_value_t = false)]
    no_builtin_rules: bool,

    /// Turn on a rule that is off by default (repeatable).
    #[arg(long)]
    enable: Vec<String>,

    /// Turn off a rule (repeatable).
    #[arg(long)]
    disable: Vec<String>,

    /// Config file (default: <first path>/syntaxfix.toml if present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Worker threads (default: number of CPUs).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    jobs: Option<u64>,

    /// Stop starting new files after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Commit the last pass of files that did not converge instead of leaving them untouched.
    #[arg(long, default_value_t = false)]
    commit_non_converged: bool,

    /// Output format on stdout.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Write the JSON report to this file.
    #[arg(long)]
    report: Option<Utf8PathBuf>,

    /// Write a markdown report to this file.
    #[arg(long)]
    markdown: Option<Utf8PathBuf>,

    /// Print the loaded rule set and exit.
    #[arg(long, default_value_t = false)]
    list_rules: bool,

    /// Debug logging; list skipped files.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match real_main(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit code of a completed run, or an error (exit 2).
fn real_main(cli: Cli) -> anyhow::Result<u8> {
    let first_root = cli
        .paths
        .first()
        .cloned()
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    let file_config = config::load_or_default(cli.config.as_deref(), &first_root)
        .context("load syntaxfix.toml config")?;

    let args = CliRunArgs {
        roots: cli.paths.clone(),
        max_passes: cli.max_passes,
        extensions: cli.extensions.clone(),
        exclude: cli.exclude.clone(),
        no_default_excludes: cli.no_default_excludes,
        dry_run: cli.dry_run,
        jobs: cli.jobs.map(|j| j as usize),
        timeout_secs: cli.timeout_secs,
        commit_non_converged: cli.commit_non_converged,
        rule_files: cli.rules.clone(),
        no_builtin_rules: cli.no_builtin_rules,
        enable: cli.enable.clone(),
        disable: cli.disable.clone(),
    };
    let merged = ConfigMerger::new(file_config).merge_run_args(&args);
    debug!(
        "merged config: roots={:?}, max_passes={}, exclude={:?}, rule_files={:?}",
        merged.settings.roots,
        merged.settings.max_passes,
        merged.settings.exclude,
        merged.sources.files
    );

    let rules = build_rule_set(&merged.sources)?;

    if cli.list_rules {
        print_rules(&rules, cli.format)?;
        return Ok(0);
    }

    let outcome = run_repair(
        &merged.settings,
        &rules,
        &FsSourceReader,
        &FsCommitPort::default(),
        tool_info(),
    )?;

    match cli.format {
        OutputFormat::Text => print!("{}", render_report_text(&outcome.report, cli.verbose)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&outcome.report).context("serialize report")?
        ),
    }

    write_report_artifacts(
        &outcome.report,
        cli.report.as_deref(),
        cli.markdown.as_deref(),
        &FsWritePort,
    )
    .context("write report artifacts")?;

    Ok(outcome.exit_code() as u8)
}

fn print_rules(rules: &RuleSet, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_rule_list(rules)),
        OutputFormat::Json => {
            let list: Vec<serde_json::Value> = rules
                .rules()
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id(),
                        "category": r.category(),
                        "kind": if r.is_fix() { "fix" } else { "detect" },
                        "guard": r.guard().as_str(),
                        "severity": r.severity().as_str(),
                        "description": r.description(),
                    })
                })
                .collect();
            let body = serde_json::json!({ "version": rules.version(), "rules": list });
            println!(
                "{}",
                serde_json::to_string_pretty(&body).context("serialize rule list")?
            );
        }
    }
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "syntaxfix".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        commit: None,
    }
}
