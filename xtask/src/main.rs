use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use fs_err as fs;
use std::process::Command as ProcessCommand;
use syntaxfix_rules::{RuleFile, RuleSet, TYPESCRIPT_CATALOG, builtin_rule_file};

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by syntaxfix.
    PrintSchemas,
    /// Print the built-in TypeScript rule catalog, or copy it to a file.
    PrintCatalog {
        #[arg(long)]
        out: Option<Utf8PathBuf>,
    },
    /// Bless golden fixtures (overwrite expected outputs).
    BlessFixtures,
    /// Compile rule files together with the built-in catalog and run their examples.
    CheckRules {
        files: Vec<Utf8PathBuf>,

        /// Check the files on their own, without the built-in catalog.
        #[arg(long, default_value_t = false)]
        no_builtin: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas => {
            println!("{}", syntaxfix_types::schema::SYNTAXFIX_REPORT_V1);
            println!("{}", syntaxfix_types::schema::SYNTAXFIX_RULES_V1);
        }
        Command::PrintCatalog { out } => match out {
            Some(path) => {
                fs::write(&path, TYPESCRIPT_CATALOG).with_context(|| format!("write {path}"))?;
                println!("wrote {path}");
            }
            None => print!("{TYPESCRIPT_CATALOG}"),
        },
        Command::BlessFixtures => {
            let status = ProcessCommand::new("cargo")
                .args(["test", "-p", "syntaxfix-core", "--test", "golden_fixtures"])
                .env("SYNTAXFIX_BLESS", "1")
                .status()
                .context("run golden fixture blessing")?;
            if !status.success() {
                anyhow::bail!("bless-fixtures failed");
            }
        }
        Command::CheckRules { files, no_builtin } => {
            let mut builder = RuleSet::builder();
            if !no_builtin {
                builder = builder.rule_file(&builtin_rule_file()?)?;
            }
            for path in &files {
                let file = RuleFile::load(path).with_context(|| format!("load {path}"))?;
                builder = builder.rule_file(&file)?;
            }
            let rules = builder.build().context("build rule set")?;
            println!(
                "ok: rule set version {} ({} rules, {} categories)",
                rules.version(),
                rules.len(),
                rules.categories().len()
            );
        }
    }
    Ok(())
}
