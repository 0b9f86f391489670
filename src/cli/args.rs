//! Command-line argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, StorageType};

/// Boosty creator sync CLI.
#[derive(Parser, Debug)]
#[command(
    name = "boosty-downloader",
    version,
    about = "Incrementally mirror Boosty creators' posts and media",
    long_about = "A CLI tool to sync photos, videos, audio and attached files of Boosty creators.\n\n\
                  Repeated runs only fetch what was published since the previous sync."
)]
pub struct Args {
    /// Creator name or boosty.to link.
    #[arg(short = 'u', long = "creator")]
    pub creator: Option<String>,

    /// Link of a single post to sync.
    #[arg(short, long)]
    pub post: Option<String>,

    /// File with one post link per line.
    #[arg(short, long = "links-file")]
    pub links_file: Option<PathBuf>,

    /// Root directory of synced creators.
    #[arg(short = 'd', long = "directory")]
    pub sync_dir: Option<PathBuf>,

    /// Storage layout.
    #[arg(short, long, value_enum)]
    pub storage: Option<StorageTypeArg>,

    /// Session cookie header.
    #[arg(long, env = "BOOSTY_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Session authorization header.
    #[arg(long, env = "BOOSTY_AUTHORIZATION", hide_env_values = true)]
    pub authorization: Option<String>,

    /// Path to configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Maximum concurrent downloads.
    #[arg(short = 'j', long = "parallel")]
    pub max_download_parallel: Option<usize>,

    /// Name post directories after post titles.
    #[arg(long)]
    pub masquerade: bool,

    /// Answer yes to the download confirmation.
    #[arg(short, long)]
    pub yes: bool,

    /// Ignore offsets left by an interrupted sync.
    #[arg(long)]
    pub no_resume: bool,

    /// Hide progress bars.
    #[arg(long, short)]
    pub quiet: bool,

    /// Also write logs to a file in the working directory.
    #[arg(long)]
    pub save_logs: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

/// CLI storage type argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StorageTypeArg {
    /// Per-kind folders fed by the media albums.
    Media,
    /// One directory per post.
    Post,
}

impl From<StorageTypeArg> for StorageType {
    fn from(arg: StorageTypeArg) -> Self {
        match arg {
            StorageTypeArg::Media => StorageType::Media,
            StorageTypeArg::Post => StorageType::Post,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(self, config: &mut Config) {
        // Targets
        if let Some(creator) = self.creator {
            config.target.creator_name = creator;
        }

        if let Some(post) = self.post {
            config.target.post_link = post;
        }

        if let Some(links_file) = self.links_file {
            config.target.links_file = Some(links_file);
        }

        // Credentials
        if let Some(cookie) = self.cookie {
            config.auth.cookie = cookie;
        }

        if let Some(authorization) = self.authorization {
            config.auth.authorization = authorization;
        }

        // Options
        if let Some(dir) = self.sync_dir {
            config.options.sync_dir = dir;
        }

        if let Some(storage) = self.storage {
            config.options.storage_type = storage.into();
        }

        if let Some(parallel) = self.max_download_parallel {
            config.options.max_download_parallel = parallel;
        }

        // Boolean flags (only override if set to non-default)
        if self.masquerade {
            config.options.enable_post_masquerade = true;
        }

        if self.yes {
            config.options.auto_confirm_download = true;
        }

        if self.quiet {
            config.options.show_progress = false;
        }

        if self.save_logs {
            config.options.save_logs_to_file = true;
        }

        if self.debug {
            config.options.debug = true;
        }
    }
}
