use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use pbxproj_fix::config::{self, FixConfig};
use pbxproj_fix::logging::init_logging;
use pbxproj_fix::{
    ensure_expected_name, resolve_target, LineFix, PatchEngine, PatchError, PatchResult,
};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pbxproj-fix")]
#[command(about = "Repair the MapFileParser.sh quoting defect in Xcode project files", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to $PBXPROJ_FIX_CONFIG, then built-in settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fix the defect, keeping the original as a backup
    Fix {
        /// project.pbxproj file, or a directory containing one
        path: PathBuf,

        /// Patch even if the file name does not look like a project file
        #[arg(short, long)]
        force: bool,

        /// Show the corrected line as a character diff
        #[arg(short, long)]
        diff: bool,
    },

    /// Report whether the defect is present without modifying anything
    Check {
        /// project.pbxproj file, or a directory containing one
        path: PathBuf,

        /// Check even if the file name does not look like a project file
        #[arg(short, long)]
        force: bool,
    },

    /// Move the backup back over the patched file
    Restore {
        /// The patched project.pbxproj file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config::resolve(cli.config.as_deref()).context("failed to load configuration")?;
    let engine = PatchEngine::new().with_naming(config.naming());

    match cli.command {
        Commands::Fix { path, force, diff } => cmd_fix(&engine, &config, &path, force, diff),
        Commands::Check { path, force } => cmd_check(&engine, &config, &path, force),
        Commands::Restore { path } => cmd_restore(&engine, &path),
    }
}

/// Helper: Turn the user's path into the single file to operate on.
fn resolve_source(config: &FixConfig, path: &Path, force: bool) -> Result<PathBuf> {
    let source = resolve_target(path, &config.discovery)?;
    if !force {
        ensure_expected_name(&source, &config.discovery)?;
    }
    Ok(source)
}

/// Helper: Show the removed character inside the original and corrected line.
fn display_fix(fix: &LineFix) {
    let diff = TextDiff::from_chars(fix.original.as_str(), fix.corrected.as_str());

    let mut before = String::new();
    let mut after = String::new();
    for change in diff.iter_all_changes() {
        let text = change.value();
        match change.tag() {
            ChangeTag::Delete => before.push_str(&text.red().bold().underline().to_string()),
            ChangeTag::Insert => after.push_str(&text.green().bold().to_string()),
            ChangeTag::Equal => {
                before.push_str(text);
                after.push_str(text);
            }
        }
    }

    println!(
        "\n{}",
        format!("--- line {} (original)", fix.line_number).dimmed()
    );
    println!(
        "{}",
        format!("+++ line {} (patched)", fix.line_number).dimmed()
    );
    println!("{}{}", "-".red(), before);
    println!("{}{}", "+".green(), after);
}

fn report_failure(err: &PatchError) {
    eprintln!("{} {}", "✗".red(), err);
    if err.is_commit_failure() {
        eprintln!("  {}", "The corrected content is still in the staging file.".yellow());
        if let PatchError::RenameFailure { to, .. } | PatchError::BackupAlreadyExists { path: to } =
            err
        {
            eprintln!("  Check: {}", to.display());
        }
        eprintln!("  If the project file is missing, run `pbxproj-fix restore` to put the backup back.");
    }
}

fn cmd_fix(
    engine: &PatchEngine,
    config: &FixConfig,
    path: &Path,
    force: bool,
    show_diff: bool,
) -> Result<()> {
    let source = resolve_source(config, path, force)?;
    println!("Project file: {}", source.display());

    match engine.patch_file(&source) {
        Ok(PatchResult::NoDefectFound { file }) => {
            println!(
                "{} No syntax error in {}, nothing to do",
                "⊙".yellow(),
                file.display()
            );
        }
        Ok(PatchResult::Patched { file, backup, fix }) => {
            println!(
                "{} Fixed line {}, column {} of {}",
                "✓".green(),
                fix.line_number,
                fix.column + 1,
                file.display()
            );
            println!("  Backup: {}", backup.display());
            if show_diff {
                display_fix(&fix);
            }
        }
        Err(err) => {
            report_failure(&err);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn cmd_check(engine: &PatchEngine, config: &FixConfig, path: &Path, force: bool) -> Result<()> {
    let source = resolve_source(config, path, force)?;

    let found = engine
        .check_file(&source)
        .with_context(|| format!("failed to scan {}", source.display()))?;

    match found {
        Some(fix) => {
            println!(
                "{} Defect at line {} of {}",
                "✗".red(),
                fix.line_number,
                source.display()
            );
            display_fix(&fix);
            std::process::exit(1);
        }
        None => {
            println!("{} {} is clean", "✓".green(), source.display());
        }
    }

    Ok(())
}

fn cmd_restore(engine: &PatchEngine, path: &Path) -> Result<()> {
    let paths = engine.paths_for(path)?;
    let restored = engine
        .restore_backup(path)
        .with_context(|| format!("failed to restore {}", paths.backup.display()))?;

    println!(
        "{} Restored {} from {}",
        "✓".green(),
        restored.display(),
        paths.backup.display()
    );
    Ok(())
}
