//! Boosty Downloader - CLI entry point.

use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use boosty_downloader::{
    api::BoostyApi,
    cli::Args,
    config::{parse_boosty_link, parse_links, validate_config, Config, OptionsConfig, StorageType},
    download::{PostSyncOutcome, ResumeOffsets, SyncStats, Syncer},
    error::{exit_codes, Error, Result},
    output::{
        confirm, print_banner, print_batch_report, print_error, print_info, print_link_queue,
        print_success, print_summary, print_sync_summary, print_warning,
    },
    store::StreamKey,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::MissingConfig(_)
                | Error::TomlParse(_) => ExitCode::from(exit_codes::CONFIG_ERROR as u8),
                Error::Authentication(_)
                | Error::Api(_)
                | Error::RateLimited(_)
                | Error::Http(_) => ExitCode::from(exit_codes::API_ERROR as u8),
                Error::Download(_)
                | Error::Integrity { .. }
                | Error::Checkpoint { .. }
                | Error::Registry { .. } => ExitCode::from(exit_codes::DOWNLOAD_ERROR as u8),
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

/// Set up console logging, plus a plain log file when requested.
fn init_logging(options: &OptionsConfig) -> Result<()> {
    let log_level = if options.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_layer = if options.save_logs_to_file {
        let name = format!(
            "boosty_downloader_{}_launch.log",
            chrono::Utc::now().timestamp()
        );
        let file = std::fs::File::create(&name)?;
        Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    Ok(())
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();
    let no_resume = args.no_resume;

    // Load configuration
    let config_path = args.config.clone();
    let config_found = config_path.exists();
    let mut config = if config_found {
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    init_logging(&config.options)?;
    print_banner();
    if !config_found {
        print_warning(&format!(
            "Configuration file not found: {}",
            config_path.display()
        ));
        print_info("Using default configuration with CLI arguments");
    }

    // Validate configuration
    validate_config(&config)?;

    let credentials = config.credentials();
    if credentials.is_none() {
        print_warning(
            "Without authorization many files may not be available for download. \
             Fill the [auth] section of the configuration file.",
        );
        if !config.options.auto_confirm_download
            && !confirm("Do you want to continue without authorization?")?
        {
            print_info("Ok.");
            return Ok(exit_codes::ABORT);
        }
    }
    let authenticated = credentials.is_some();

    let api = Arc::new(BoostyApi::new(credentials)?);
    let stats = Arc::new(SyncStats::new());
    let syncer = Syncer::new(
        api.clone(),
        api,
        config.sync_settings(authenticated),
        stats.clone(),
    );

    let code = match config.target.links_file.clone() {
        Some(links_file) => run_batch(&syncer, &config, &links_file).await?,
        None => run_target(&syncer, &config, no_resume).await?,
    };

    if config.options.final_statistics_table {
        print_summary(&stats.snapshot());
    }

    Ok(code)
}

/// Sync one creator, or one post of it.
async fn run_target(syncer: &Syncer, config: &Config, no_resume: bool) -> Result<i32> {
    let raw = if config.target.post_link.trim().is_empty() {
        &config.target.creator_name
    } else {
        &config.target.post_link
    };
    let target = parse_boosty_link(raw)?.ok_or_else(|| Error::ConfigValidation {
        field: "creator_name".to_string(),
        message: format!("Not a creator name or boosty.to link: '{}'", raw),
    })?;
    let creator = target.creator.as_str();

    print_sync_summary(
        creator,
        syncer.settings().authenticated,
        &config.options.sync_dir,
        &syncer.settings().media,
        config.options.storage_type,
    );
    if !config.options.auto_confirm_download && !confirm("Proceed?")? {
        return Ok(exit_codes::ABORT);
    }

    if let Some(post_id) = target.post_id.as_deref() {
        print_link_queue([(creator, post_id)]);
        let result = syncer.run_single_post(creator, post_id).await;
        for path in &result.incomplete {
            print_warning(&format!("File appears incomplete: {}", path.display()));
        }
        return Ok(match result.outcome {
            PostSyncOutcome::Error => exit_codes::DOWNLOAD_ERROR,
            PostSyncOutcome::NotFound => exit_codes::API_ERROR,
            _ => exit_codes::SUCCESS,
        });
    }

    print_info(&format!("Starting {} sync of {}", config.options.storage_type, creator));
    match config.options.storage_type {
        StorageType::Media => {
            let resume = resume_offsets(syncer, config, creator, &StreamKey::MEDIA, no_resume).await?;
            syncer
                .run_media_sync(creator, &StreamKey::MEDIA, &resume)
                .await?;
        }
        StorageType::Post => {
            let resume = resume_offsets(syncer, config, creator, &[StreamKey::Posts], no_resume).await?;
            let start = resume.get(StreamKey::Posts).map(str::to_string);
            syncer.run_post_sync(creator, start).await?;
        }
    }
    print_success(&format!("Sync of {} finished", creator));

    Ok(exit_codes::SUCCESS)
}

/// Offer to resume streams an earlier run left unfinished.
async fn resume_offsets(
    syncer: &Syncer,
    config: &Config,
    creator: &str,
    streams: &[StreamKey],
    no_resume: bool,
) -> Result<ResumeOffsets> {
    let mut pending = ResumeOffsets::new();
    for (stream, offset) in syncer.pending_resume(creator).await?.iter() {
        if streams.contains(&stream) {
            pending.insert(stream, offset);
        }
    }
    if pending.is_empty() || no_resume {
        return Ok(ResumeOffsets::new());
    }

    print_warning("Seems like your last sync ended unexpectedly");
    for (stream, offset) in pending.iter() {
        print_info(&format!("{} stream stopped at offset {}", stream, offset));
    }
    if config.options.auto_confirm_download || confirm("Shall we pick up where we left off?")? {
        Ok(pending)
    } else {
        Ok(ResumeOffsets::new())
    }
}

/// Sync every post of a links file.
async fn run_batch(syncer: &Syncer, config: &Config, links_file: &Path) -> Result<i32> {
    let content = std::fs::read_to_string(links_file).map_err(|e| {
        Error::Config(format!(
            "Failed to read links file {}: {}",
            links_file.display(),
            e
        ))
    })?;
    let (links, invalid) = parse_links(&content)?;
    if !invalid.is_empty() {
        print_warning(&format!("Skipped invalid links:\n{}", invalid.join("\n")));
    }
    if links.is_empty() {
        return Err(Error::Config("No valid post links found in file".to_string()));
    }

    print_sync_summary(
        &format!("{} post link(s) from {}", links.len(), links_file.display()),
        syncer.settings().authenticated,
        &config.options.sync_dir,
        &syncer.settings().media,
        StorageType::Post,
    );
    if !config.options.auto_confirm_download && !confirm("Proceed?")? {
        return Ok(exit_codes::ABORT);
    }

    print_link_queue(links.iter().map(|l| (l.creator.as_str(), l.post_id.as_str())));
    let report = syncer.run_links(&links).await;
    print_batch_report(&report);

    if report.needs_remediation() {
        println!(
            "Would you like to delete these files and try downloading them again to avoid potential issues?"
        );
        if confirm("Delete and re-download these files?")? {
            let rerun = syncer.remediate(&report).await;
            print_batch_report(&rerun);
        }
    }

    if report.has_failures() {
        Ok(exit_codes::SOME_LINKS_FAILED)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}
