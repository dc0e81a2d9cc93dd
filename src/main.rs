use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use userscript_patcher::config::{builtin, load_from_path, PatchConfig, PatchResult, Severity};
use userscript_patcher::fetch::{Fetcher, HttpFetcher, LocalFile};
use userscript_patcher::pipeline::{run, Event, Outcome, PipelineError, RunOptions};
use userscript_patcher::AtomicFileWriter;

#[derive(Parser)]
#[command(name = "userscript-patcher")]
#[command(
    about = "Download a pinned userscript, verify it, and patch it for another runtime",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Patch set to use instead of the built-in one
    #[arg(short, long, global = true)]
    patches: Option<PathBuf>,

    /// Where to write the patched script (default: meta.output of the patch set)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Read the upstream script from a local file instead of downloading it
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Dry run - apply patches but do not write the output file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the patches in the active patch set, in application order
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.patches {
        Some(path) => load_from_path(path)?,
        None => builtin().context("built-in patch set is invalid")?,
    };

    match cli.command {
        Some(Commands::List) => cmd_list(&config),
        None => cmd_run(&cli, &config),
    }
}

fn cmd_run(cli: &Cli, config: &PatchConfig) -> Result<()> {
    let fetcher: Box<dyn Fetcher> = match &cli.input {
        Some(path) => Box::new(LocalFile::new(path)),
        None => Box::new(HttpFetcher::new(config.timeout())?),
    };

    let mut options = RunOptions::from_config(config);
    if let Some(output) = &cli.output {
        options.output = output.clone();
    }
    options.dry_run = cli.dry_run;

    print_banner(config);

    match run(config, fetcher.as_ref(), &AtomicFileWriter, &options, print_event) {
        Ok(outcome) => {
            if cli.diff {
                display_diff(
                    &options.output,
                    outcome.original.content(),
                    outcome.patched.content(),
                );
            }
            print_summary(&outcome);
            Ok(())
        }
        Err(error) => {
            report_failure(&error);
            std::process::exit(1);
        }
    }
}

fn cmd_list(config: &PatchConfig) -> Result<()> {
    print_banner(config);
    println!("Source:  {}", config.meta.source_url);
    println!("SHA-256: {}", config.meta.sha256);
    println!("Output:  {}", config.meta.output.display());
    if let Some(range) = &config.meta.version_range {
        println!("Upstream version: {}", range);
    }
    println!();

    let total = config.patches.len();
    for (index, patch) in config.patches.iter().enumerate() {
        let severity = match patch.severity {
            Severity::Required => patch.severity.to_string().normal(),
            Severity::Optional => patch.severity.to_string().dimmed(),
        };
        println!(
            "  {:>2}/{} {} ({}, occurrences: {})",
            index + 1,
            total,
            patch.label(),
            severity,
            patch.occurrences
        );
        println!("        {}", patch.id.dimmed());
    }

    Ok(())
}

fn print_banner(config: &PatchConfig) {
    let rule = "=".repeat(60);
    println!("{}", rule);
    match &config.meta.description {
        Some(description) => println!("{}", description.bold()),
        None => println!("{}", config.meta.name.bold()),
    }
    println!(
        "{}",
        format!("{} patches in set '{}'", config.patches.len(), config.meta.name).dimmed()
    );
    println!("{}", rule);
    println!();
}

fn print_event(event: Event<'_>) {
    match event {
        Event::Fetching { source } => println!("[*] Downloading file from: {}", source),
        Event::Fetched { bytes } => {
            println!("{} Download completed ({} bytes)", "[+]".green(), bytes)
        }
        Event::Verified(record) => {
            println!("[*] Expected SHA256: {}", record.expected);
            println!("[*] Current SHA256:  {}", record.actual);
            println!("{} SHA256 validated successfully", "[+]".green());
        }
        Event::Decoded { line_ending } => {
            println!(
                "{}",
                format!("[*] Decoded as UTF-8 ({} line endings)", line_ending).dimmed()
            );
        }
        Event::UpstreamVersion {
            version,
            range,
            check,
        } => match (version, check) {
            (Some(version), Some(Ok(false))) => eprintln!(
                "{}",
                format!(
                    "Warning: upstream @version {} is outside the supported range {}",
                    version,
                    range.unwrap_or("")
                )
                .yellow()
            ),
            (Some(version), Some(Err(error))) => eprintln!(
                "{}",
                format!(
                    "Warning: cannot check upstream @version {} against the supported range: {}",
                    version, error
                )
                .yellow()
            ),
            (Some(version), _) => println!("[*] Upstream version: {}", version),
            (None, _) => eprintln!(
                "{}",
                "Warning: upstream script has no @version in its metadata block".yellow()
            ),
        },
        Event::Patched { report, total } => {
            if report.ordinal == 1 {
                println!();
                println!("[*] Applying patches...");
            }
            let prefix = format!("{:>2}/{}", report.ordinal, total);
            match &report.result {
                PatchResult::Applied { .. } if report.is_partial() => println!(
                    "  {} {} {}: {} (expected {})",
                    "⊙".yellow(),
                    prefix,
                    report.label,
                    report.result,
                    report.occurrences
                ),
                PatchResult::Applied { .. } => {
                    println!("  {} {} {}", "✓".green(), prefix, report.label)
                }
                PatchResult::AlreadyApplied => println!(
                    "  {} {} {}: Already applied",
                    "⊙".yellow(),
                    prefix,
                    report.label
                ),
                PatchResult::NotFound { .. } | PatchResult::Invalid { .. } => {
                    let marker = match report.severity {
                        Severity::Required => "✗".red(),
                        Severity::Optional => "⊘".cyan(),
                    };
                    println!(
                        "  {} {} {}: {} [{}]",
                        marker, prefix, report.label, report.result, report.severity
                    );
                }
            }
        }
        Event::Writing { path } => {
            println!();
            println!("[*] Saving file: {}", path.display());
        }
        Event::Written { path, bytes } => println!(
            "{} File saved successfully: {} ({} bytes)",
            "[+]".green(),
            path.display(),
            bytes
        ),
        Event::SkippedWrite { path } => {
            println!();
            println!(
                "{}",
                format!("  [DRY RUN - {} was not written]", path.display()).cyan()
            );
        }
    }
}

fn print_summary(outcome: &Outcome) {
    let summary = &outcome.summary;

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", summary.applied).green());
    println!(
        "  {} already applied",
        format!("{}", summary.already_applied).yellow()
    );
    println!(
        "  {} optional not found",
        format!("{}", summary.missed_optional).cyan()
    );
    println!("  {} replacements", summary.replacements);

    if summary.missed_optional > 0 {
        eprintln!(
            "{}",
            format!(
                "Warning: {} optional patch(es) found no anchor; check that the patched script still works",
                summary.missed_optional
            )
            .yellow()
        );
    }
    if summary.partial > 0 {
        eprintln!(
            "{}",
            format!(
                "Warning: {} patch(es) matched fewer times than expected; the upstream script may have changed",
                summary.partial
            )
            .yellow()
        );
    }

    match &outcome.written {
        Some(path) => {
            println!();
            println!("{}", "Process completed successfully!".green().bold());
            println!("Generated file: {}", path.display());
        }
        None => println!("{}", "Dry run completed, nothing written".cyan()),
    }
}

fn report_failure(error: &PipelineError) {
    eprintln!();
    eprintln!(
        "{} {} failed: {}",
        "✗".red(),
        error.stage().to_string().bold(),
        error
    );

    match error {
        PipelineError::Integrity(_) => {
            eprintln!("  {}", "CONFLICT: the upstream script has changed".red());
            eprintln!("  Patch anchors are tied to the pinned revision and may no longer match.");
            eprintln!("  Update meta.sha256 (and the anchors) if the change is intentional.");
        }
        PipelineError::PatchMiss { ids } => {
            eprintln!("  {}", "CONFLICT: required anchors not found".red());
            for id in ids {
                eprintln!("    - {}", id);
            }
            eprintln!("  Possible causes:");
            eprintln!("    - A patch earlier in the list changed the text this one targets");
            eprintln!("    - The anchor was edited and no longer matches the pinned script");
        }
        _ => {}
    }
    eprintln!("{}", "No output file was written.".dimmed());
}

/// Helper: Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for (index, group) in diff.grouped_ops(3).iter().enumerate() {
        if index > 0 {
            println!("{}", "...".dimmed());
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => format!("-{}", change).red(),
                    ChangeTag::Insert => format!("+{}", change).green(),
                    ChangeTag::Equal => format!(" {}", change).normal(),
                };
                print!("{}", sign);
            }
        }
    }
}
