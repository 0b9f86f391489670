//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Progress bars
//! - Yes/no prompts
//! - Statistics reporting

pub mod console;
pub mod progress;
pub mod prompt;
pub mod stats;

pub use console::{
    print_banner, print_error, print_info, print_link_queue, print_success, print_sync_summary,
    print_warning,
};
pub use progress::{create_download_bar, create_item_bar};
pub use prompt::confirm;
pub use stats::{print_batch_report, print_summary};
