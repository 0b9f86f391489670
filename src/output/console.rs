//! Console output utilities.

use std::path::Path;

use console::style;

use crate::config::StorageType;
use crate::download::MediaSelection;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     Boosty Downloader                                 ║
║     Incremental sync of creators' posts and media     ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

fn flag(enabled: bool) -> console::StyledObject<&'static str> {
    if enabled {
        style("yes").green()
    } else {
        style("no").red()
    }
}

/// Print what is about to be synced.
pub fn print_sync_summary(
    target: &str,
    authenticated: bool,
    sync_dir: &Path,
    media: &MediaSelection,
    storage_type: StorageType,
) {
    println!();
    println!("{}", style("Sync summary:").bold());
    println!("  Target:        {}", target);
    println!("  Authorized:    {}", flag(authenticated));
    println!("  Sync dir:      {}", sync_dir.display());
    println!("  Storage type:  {}", storage_type);
    println!("  Photos:        {}", flag(media.photo));
    println!("  Videos:        {}", flag(media.video));
    println!("  Audio:         {}", flag(media.audio));
    println!("  Files:         {}", flag(media.files));
    println!();
}

/// Print the posts of a batch, one per line.
pub fn print_link_queue<'a>(links: impl IntoIterator<Item = (&'a str, &'a str)>) {
    let links: Vec<_> = links.into_iter().collect();
    let width = links
        .iter()
        .map(|(creator, _)| creator.len())
        .max()
        .unwrap_or(0)
        .max(24);
    println!("syncing {} post(s):", links.len());
    for (creator, post_id) in links {
        println!("{:<width$} {}", creator, post_id, width = width);
    }
}
