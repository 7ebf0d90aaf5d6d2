use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

use ruleforge_core::{Config, DynamicRule, ReviewDecision, ReviewStatus, Report, RuleSeverity, Correction};
use ruleforge_engine::{IngestOutcome, IngestReport, RuleService};

/// Ruleforge - Hummingbird anti-pattern rules mined from release notes
#[derive(Parser)]
#[command(name = "ruleforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ruleforge.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check source files against the active rules
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output file for report.json
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },

    /// Mine draft rules from release notes
    Ingest {
        /// Release notes file
        file: PathBuf,

        /// Release version the notes belong to
        #[arg(short, long, required_unless_present = "document", conflicts_with = "document")]
        release: Option<String>,

        /// Treat the file as a multi-release CHANGELOG
        #[arg(short, long)]
        document: bool,
    },

    /// Approve or reject a draft rule
    Review {
        /// Rule id (e.g. auto-hbapplication-2.1.0)
        id: String,

        /// approve or reject
        decision: ReviewDecision,
    },

    /// List rules
    Rules {
        /// Only list rules in this state
        #[arg(short, long, value_enum)]
        status: Option<StatusFilter>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Ingest new `<version>.md` release files from a directory periodically
    Watch {
        /// Directory holding release notes
        dir: PathBuf,

        /// Seconds between cycles (default from config)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusFilter {
    Static,
    Draft,
    Approved,
    Rejected,
}

impl StatusFilter {
    fn review_status(self) -> Option<ReviewStatus> {
        match self {
            Self::Static => None,
            Self::Draft => Some(ReviewStatus::Draft),
            Self::Approved => Some(ReviewStatus::Approved),
            Self::Rejected => Some(ReviewStatus::Rejected),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("ruleforge.toml").exists() {
        Config::from_file(Path::new("ruleforge.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if cli.verbose {
        eprintln!("{} {}", "Store:".cyan(), config.store_path().display());
    }

    let service = Arc::new(RuleService::from_config(&config)?);

    match cli.command {
        Commands::Check { paths, output, markdown } => {
            check_command(&config, &service, &paths, output.as_deref(), markdown.as_deref(), cli.verbose)
        }
        Commands::Ingest { file, release, document } => {
            ingest_command(&service, &file, release.as_deref(), document)
        }
        Commands::Review { id, decision } => review_command(&service, &id, decision),
        Commands::Rules { status, json } => rules_command(&service, status, json),
        Commands::Watch { dir, interval } => {
            let interval = interval.unwrap_or(config.watch.interval_secs).max(1);
            watch_command(service, dir, Duration::from_secs(interval)).await
        }
    }
}

/// Check command - run the active rules over source files
fn check_command(
    config: &Config,
    service: &RuleService,
    paths: &[PathBuf],
    output: Option<&Path>,
    markdown: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let files = collect_sources(config, paths);

    if verbose {
        eprintln!(
            "{} {} files against {} rules",
            "Checking".cyan(),
            files.len(),
            service.store().all_approved_rules().len()
        );
    }

    let mut report = Report::new();
    for file in &files {
        let source = match std::fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(path = %file.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        report.add_file(file.display().to_string(), service.check(&source));
    }

    if let Some(output) = output {
        report.save_to_file(output)?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), output.display());
        }
    }

    // Save markdown report if requested
    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report);

    // Exit with error code if anything blocks
    if report.blocking {
        std::process::exit(1);
    }

    Ok(())
}

/// Expand directories into source files with a configured extension
fn collect_sources(config: &Config, paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && config.check.accepts(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files
}

/// Ingest command - parse, synthesize and store draft rules
fn ingest_command(service: &RuleService, file: &Path, release: Option<&str>, document: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;

    let outcome = match release {
        Some(version) if !document => service.ingest(&text, version),
        _ => service.ingest_document(&text),
    };

    match outcome {
        IngestOutcome::Completed(report) => {
            print_ingest_summary(&report);
            service.persist()?;
        }
        IngestOutcome::Coalesced => {
            println!("{}", "Another ingestion is running; nothing done".yellow());
        }
    }

    Ok(())
}

/// Review command - move a draft rule to approved or rejected
fn review_command(service: &RuleService, id: &str, decision: ReviewDecision) -> Result<()> {
    let rule = service.review(id, decision)?;
    service.persist()?;

    let status = match rule.review_status {
        ReviewStatus::Approved => "approved".green().bold(),
        ReviewStatus::Rejected => "rejected".red().bold(),
        ReviewStatus::Draft => "draft".normal(),
    };
    println!("{} {} is now {}", "✓".green(), rule.id.bold(), status);

    Ok(())
}

/// Rules command - list static and dynamic rules
fn rules_command(service: &RuleService, status: Option<StatusFilter>, json: bool) -> Result<()> {
    let store = service.store();
    let show_static = matches!(status, None | Some(StatusFilter::Static));
    let wanted = status.and_then(StatusFilter::review_status);

    let static_rules = if show_static { store.static_rules() } else { Vec::new() };
    let dynamic_rules: Vec<DynamicRule> = match status {
        Some(StatusFilter::Static) => Vec::new(),
        _ => store
            .dynamic_rules()
            .into_iter()
            .filter(|r| wanted.map_or(true, |s| r.review_status == s))
            .collect(),
    };

    if json {
        let value = serde_json::json!({
            "static": static_rules,
            "dynamic": dynamic_rules,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if !static_rules.is_empty() {
        println!("{}", "Static rules:".bold());
        for rule in &static_rules {
            println!("  [{}] {}: {}", severity_label(rule.severity), rule.id, rule.description);
        }
        println!();
    }

    if !dynamic_rules.is_empty() {
        println!("{}", "Synthesized rules:".bold());
        for rule in &dynamic_rules {
            println!(
                "  [{}] {} ({}, release {}): {}",
                severity_label(rule.severity),
                rule.id,
                rule.review_status,
                rule.source_release,
                rule.description
            );
        }
    }

    if static_rules.is_empty() && dynamic_rules.is_empty() {
        println!("{}", "No rules match".yellow());
    }

    Ok(())
}

/// Watch command - ingest new release files on an interval
///
/// Each tick runs on the blocking pool. A tick that starts while the
/// previous one is still ingesting is coalesced by the service.
async fn watch_command(service: Arc<RuleService>, dir: PathBuf, interval: Duration) -> Result<()> {
    if !dir.is_dir() {
        return Err(anyhow::anyhow!("Not a directory: {}", dir.display()));
    }

    println!(
        "{} {} every {}s (Ctrl-C to stop)",
        "Watching".cyan(),
        dir.display(),
        interval.as_secs()
    );

    let seen: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));
    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let service = Arc::clone(&service);
                let seen = Arc::clone(&seen);
                let dir = dir.clone();
                let cycle = tokio::task::spawn_blocking(move || watch_tick(&service, &dir, &seen));
                tokio::spawn(await_cycle(cycle));
            }
            _ = &mut shutdown => {
                tracing::info!("watch stopped");
                return Ok(());
            }
        }
    }
}

/// Wait for a watch cycle; `false` when it panicked or was cancelled
async fn await_cycle(cycle: tokio::task::JoinHandle<()>) -> bool {
    match cycle.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "watch cycle failed");
            false
        }
    }
}

fn watch_tick(service: &RuleService, dir: &Path, seen: &Mutex<HashSet<PathBuf>>) {
    for (version, path) in release_files(dir) {
        let already_seen = match seen.lock() {
            Ok(guard) => guard.contains(&path),
            Err(poisoned) => poisoned.into_inner().contains(&path),
        };
        if already_seen {
            continue;
        }

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable release file");
                continue;
            }
        };

        match service.ingest(&text, &version) {
            IngestOutcome::Completed(report) => {
                print_ingest_summary(&report);
                if let Err(e) = service.persist() {
                    tracing::warn!(error = %e, "failed to persist after ingestion");
                }
                match seen.lock() {
                    Ok(mut guard) => guard.insert(path),
                    Err(poisoned) => poisoned.into_inner().insert(path),
                };
            }
            IngestOutcome::Coalesced => return,
        }
    }
}

/// `<version>.md` files in a directory, ordered by file name
fn release_files(dir: &Path) -> Vec<(String, PathBuf)> {
    WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let path = e.path();
            if path.extension()? != "md" {
                return None;
            }
            let version = path.file_stem()?.to_str()?.trim_start_matches('v');
            if !version.starts_with(|c: char| c.is_ascii_digit()) {
                return None;
            }
            Some((version.to_string(), path.to_path_buf()))
        })
        .collect()
}

fn severity_label(severity: RuleSeverity) -> colored::ColoredString {
    match severity {
        RuleSeverity::Error => "ERROR".red().bold(),
        RuleSeverity::Warning => "WARN".yellow().bold(),
    }
}

fn print_ingest_summary(report: &IngestReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Ingestion Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    if report.releases.is_empty() {
        println!("Releases: (none with deprecations)");
    } else {
        println!("Releases: {}", report.releases.join(", "));
    }
    println!(
        "Lines scanned: {} ({} matched, {} duplicates)",
        report.parse.lines_scanned, report.parse.lines_matched, report.parse.duplicates_collapsed
    );
    println!();

    println!("{}", "Summary:".bold());
    println!("  Records:   {}", report.records_parsed);
    println!("  Inserted:  {}", format!("{}", report.inserted).green());
    println!("  Replaced:  {}", report.replaced);
    println!("  Unchanged: {}", report.unchanged);

    if report.rejected() > 0 {
        println!("  Rejected:  {}", format!("{}", report.rejected()).red().bold());
        for e in &report.synthesis_rejected {
            println!("    - {}", e);
        }
        for rejected in &report.store_rejected {
            println!("    - {}: {}", rejected.rule_id, rejected.reason);
        }
    } else {
        println!("  Rejected:  {}", "0".green());
    }

    if report.accepted() > 0 {
        println!();
        println!("{}", "New draft rules await review (ruleforge rules --status draft)".cyan());
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Ruleforge Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Files checked:  {}", report.summary.files_checked);
    println!("  Total findings: {}", report.summary.total);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }
    println!();

    if report.files.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Findings:".bold());
        for file in &report.files {
            for finding in &file.findings {
                println!(
                    "  [{}] {}: {}",
                    severity_label(finding.severity),
                    finding.rule_id,
                    finding.description
                );
                println!("    at {}:{} `{}`", file.path, finding.line_number, finding.matched_text);

                if let Some(fix) = &finding.fix_suggestion {
                    println!("    Fix: {}", fix);
                }
                match &finding.correction {
                    Some(Correction::Resolved { title }) => println!("    See: {}", title),
                    Some(Correction::Unresolved) => {
                        println!("    See: {}", "(knowledge entry missing)".dimmed())
                    }
                    None => {}
                }
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Ruleforge Check Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Files checked: {}\n", report.summary.files_checked));
    md.push_str(&format!("- Total findings: {}\n", report.summary.total));
    md.push_str(&format!("- Errors: {}\n", report.summary.errors));
    md.push_str(&format!("- Warnings: {}\n", report.summary.warnings));
    md.push('\n');

    if report.files.is_empty() {
        md.push_str("✅ **No issues found!**\n");
        return md;
    }

    md.push_str("## Findings\n\n");
    for file in &report.files {
        md.push_str(&format!("### `{}`\n\n", file.path));

        for finding in &file.findings {
            let severity_emoji = match finding.severity {
                RuleSeverity::Error => "❌",
                RuleSeverity::Warning => "⚠️",
            };

            md.push_str(&format!(
                "- {} **{}** (line {}): {}\n",
                severity_emoji, finding.rule_id, finding.line_number, finding.description
            ));
            md.push_str(&format!("  - Matched: `{}`\n", finding.matched_text));
            if let Some(fix) = &finding.fix_suggestion {
                md.push_str(&format!("  - Fix: {}\n", fix));
            }
            if let Some(Correction::Resolved { title }) = &finding.correction {
                md.push_str(&format!("  - See: {}\n", title));
            }
        }
        md.push('\n');
    }

    md
}
