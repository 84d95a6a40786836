//! Terminal output utilities

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use loopdown_core::selection::{BucketStats, PackageStats};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Create a spinner on stderr
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// One summary line for a bucket
pub fn bucket_line(stats: &BucketStats) -> String {
    format!(
        "{} package(s), {} download, {} installed",
        stats.count,
        stats.download.human(),
        stats.installed.human()
    )
}

/// Per-bucket totals
pub fn package_summary(title: &str, stats: &PackageStats) {
    header(title);
    kv("Mandatory", &bucket_line(&stats.mandatory));
    kv("Optional", &bucket_line(&stats.optional));
    kv("Total", &bucket_line(&stats.total()));
}

/// Width handed to curl's progress bar, rounded down to a multiple of ten
pub fn progress_columns() -> Option<u16> {
    let term = Term::stdout();
    if !term.is_term() {
        return None;
    }

    let (_, cols) = term.size();
    Some((cols / 10 * 10).clamp(80, 100))
}
