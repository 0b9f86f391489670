//! Statistics reporting.

use console::style;

use crate::download::{BatchReport, StatsSnapshot};

/// Print the per-kind counters of a run.
pub fn print_summary(stats: &StatsSnapshot) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Sync statistics:").bold());
    println!(
        "  {:<8} {:>10} {:>10} {:>8}",
        "Kind", "Downloaded", "Passed", "Errors"
    );
    for (kind, counts) in &stats.kinds {
        println!(
            "  {:<8} {:>10} {:>10} {:>8}",
            kind.folder_name(),
            style(counts.downloaded).green(),
            counts.passed,
            if counts.errors > 0 {
                style(counts.errors).red()
            } else {
                style(counts.errors)
            }
        );
    }
    println!(
        "  Total:   {} downloaded, {} passed, {} errors",
        stats.total_downloaded(),
        stats.total_passed(),
        stats.total_errors()
    );

    if !stats.incomplete_files.is_empty() {
        println!();
        println!(
            "{}",
            style("Files that appear incomplete or corrupted:").yellow()
        );
        for path in &stats.incomplete_files {
            println!("  {}", path.display());
        }
    }
    println!("{}", style("═".repeat(50)).dim());
}

/// Print the buckets of a batch run.
pub fn print_batch_report(report: &BatchReport) {
    println!();
    if !report.failed.is_empty() {
        println!("{}", style("Unable to download the following links:").red());
        for (link, outcome) in &report.failed {
            println!("  {} ({})", link, outcome);
        }
    }
    if !report.skipped.is_empty() {
        println!("{}", style("Skipped (already downloaded) links:").yellow());
        for link in &report.skipped {
            println!("  {}", link);
        }
    }
    if !report.incomplete_files.is_empty() {
        println!(
            "{}",
            style("The following files appear to be incomplete or corrupted:").yellow()
        );
        for path in &report.incomplete_files {
            println!("  {}", path.display());
        }
    }
    if !report.succeeded.is_empty() {
        println!("{}", style("Downloaded the following links:").green());
        for link in &report.succeeded {
            println!("  {}", link);
        }
    }
}
