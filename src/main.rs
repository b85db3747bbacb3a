//! Media Organizer - sort photos and videos into a dated library
//!
//! Command-line front end over the `media_organizer` library: organize a
//! source tree into a destination, rebuild a destination in place, or
//! clean out tiny files.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use media_organizer::cli::Command;
use media_organizer::{
    Cli, Config, ExecutionTracker, NodeStatus, Organizer, cleanup, make_log_path,
    rebuild_destination, validate_rebuild_root,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{Level, debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli_output {
    //! Colored console output for summaries and results

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Title centered in a 60-column line
    pub fn print_title(title: &str) {
        let padding = 60usize.saturating_sub(title.len()) / 2;
        let _ = stdout().execute(Print(" ".repeat(padding)));
        let _ = stdout().execute(Print(style(title).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// One operation or file outcome
    pub fn print_result(status_icon: &str, status_color: Color, subject: &str, detail: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(subject).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(detail).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(label: &str, path: &str) {
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style(format!("{}: ", label)).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

use cli_output::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Get the executable directory for Config and Log directories
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let config = load_config(&cli, &exe_dir)?;
    let _guard = setup_logging(&cli, config.debug, &log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = cli.command.log_name(),
        "Media Organizer starting"
    );
    debug!(?config, "Configuration loaded");
    info!(log_file = %log_path.display(), "Log file location");

    let outcome = match &cli.command {
        Command::Organize { plan_only, .. } => run_organize(&config, *plan_only, cli.verbose),
        Command::Rebuild { .. } => run_rebuild(&config),
        Command::Cleanup { root, dry_run, .. } => run_cleanup(&config, root, *dry_run),
        Command::InitConfig { path } => run_init_config(path),
    };

    match outcome {
        Ok(()) => {
            print_log_path("Diagnostic log", &log_path.display().to_string());
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}

fn run_organize(config: &Config, plan_only: bool, verbose: bool) -> Result<()> {
    let mut organizer = Organizer::from_config(config)?;
    let debug_events = config.debug;

    let plan = organizer.plan(
        |dir| debug!("{}", dir),
        |event| {
            if debug_events {
                debug!("{}", event);
            }
        },
    )?;

    print_separator();
    print_title(if plan_only { "Plan" } else { "Organize" });
    print_separator();
    print_stat("Found", &plan.total_found.to_string(), CliTheme::ACCENT);
    print_stat("Pics", &plan.total_images.to_string(), CliTheme::ACCENT);
    print_stat("Videos", &plan.total_videos.to_string(), CliTheme::ACCENT);
    print_stat("Directories", &plan.total_dirs.to_string(), CliTheme::ACCENT);
    print_stat("To copy", &plan.total_files.to_string(), CliTheme::SUCCESS);
    print_stat("Skipped (resume)", &plan.skipped_resume.to_string(), CliTheme::WARNING);
    print_stat(
        "Skipped (duplicate)",
        &plan.skipped_duplicates.to_string(),
        CliTheme::WARNING,
    );
    if let Some(elapsed) = plan.scan_duration {
        print_stat("Scan time", &format!("{:.1?}", elapsed), CliTheme::HINT);
    }
    print_blank();

    if plan_only {
        for op in plan.file_operations() {
            let source = op.source().map(|p| p.display().to_string()).unwrap_or_default();
            print_result("~", CliTheme::ACCENT, &source, &format!("→ {}", op.destination().display()));
        }
        return Ok(());
    }

    if plan.total_found == 0 {
        print_hint("No media files found.");
        return Ok(());
    }
    if plan.total_files == 0 {
        print_hint("All files already copied.");
        return Ok(());
    }

    let mut tracker = ExecutionTracker::new(&plan, organizer.destination());
    let report = organizer.execute(
        &plan,
        |line| {
            if verbose {
                print_hint(line);
            }
        },
        |op, success| tracker.record(op, success),
    )?;

    let stats = organizer.stats_arc();
    print_separator();
    print_title("Copy complete");
    print_separator();
    print_stat(
        "Pics copied",
        &stats.images_copied.load(Ordering::Relaxed).to_string(),
        CliTheme::SUCCESS,
    );
    print_stat(
        "Videos copied",
        &stats.videos_copied.load(Ordering::Relaxed).to_string(),
        CliTheme::SUCCESS,
    );
    print_stat("Failed", &report.failed.to_string(), CliTheme::ERROR);
    print_blank();

    for (dir, status) in tracker.directories() {
        match status {
            NodeStatus::Failed => {
                print_result("✗", CliTheme::ERROR, &dir.display().to_string(), "failed")
            }
            NodeStatus::Partial => {
                print_result("◐", CliTheme::WARNING, &dir.display().to_string(), "partial")
            }
            NodeStatus::Pending | NodeStatus::Complete => {}
        }
    }
    if report.failed > 0 {
        print_warning("Some operations failed; see the run log for reasons.");
    }
    print_log_path("Run log", &report.log_path.display().to_string());

    Ok(())
}

fn run_rebuild(config: &Config) -> Result<()> {
    let Some(root) = config.destination_dir.as_deref() else {
        anyhow::bail!("No destination given; pass it as an argument or set destination_dir");
    };
    validate_rebuild_root(root)?;

    let log_path = make_log_path(root);
    let summary = rebuild_destination(root, &log_path, &config.rebuild_options())?;

    print_separator();
    print_title("Rebuild complete");
    print_separator();
    print_stat("Total", &summary.total_files.to_string(), CliTheme::ACCENT);
    print_stat("Moved", &summary.moved.to_string(), CliTheme::SUCCESS);
    print_stat(
        "Already in place",
        &summary.skipped_same_path.to_string(),
        CliTheme::HINT,
    );
    print_stat(
        "Duplicates",
        &summary.skipped_duplicates.to_string(),
        CliTheme::WARNING,
    );
    print_stat(
        "Empty dirs removed",
        &summary.deleted_empty_dirs.to_string(),
        CliTheme::ACCENT,
    );
    print_stat("Failed", &summary.failed.to_string(), CliTheme::ERROR);
    print_blank();
    print_log_path("Run log", &log_path.display().to_string());

    Ok(())
}

fn run_cleanup(config: &Config, root: &Path, dry_run: bool) -> Result<()> {
    let report = cleanup(root, config.cleanup_threshold_kb, dry_run, |line| {
        println!("{}", line)
    })?;

    print_blank();
    if dry_run {
        print_warning(&format!("Dry-run complete. Candidates: {}", report.candidates));
    } else {
        print_stat("Deleted", &report.deleted.to_string(), CliTheme::SUCCESS);
        print_stat("Candidates", &report.candidates.to_string(), CliTheme::ACCENT);
        print_stat("Failed", &report.failed.to_string(), CliTheme::ERROR);
    }

    Ok(())
}

fn run_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::sample_config())?;
    print_hint(&format!("Sample configuration written to {}", path.display()));
    Ok(())
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// `<exe dir>/Log/<Command>_<timestamp>.log`
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    exe_dir
        .join("Log")
        .join(format!("{}_{}.log", cli.command.log_name(), timestamp))
}

/// Resolve config path - supports shorthand syntax
///
/// Tries the path as given, then with `.toml` appended, then the same
/// name under `<exe dir>/Config/`.
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());
    let mut in_config_dir = exe_dir.join("Config").join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, debug: bool, log_path: &Path) -> Result<WorkerGuard> {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}
