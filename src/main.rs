mod archive;
mod args;
mod bootstrap;
mod bundle;
mod catalog;
mod colors;
mod config;
mod download;
mod error;
mod fsutil;
mod http;
mod installer;
mod links;
mod vars;
mod version;

use crate::args::Args;
use crate::bootstrap::{Bootstrap, Request};
use crate::colors::*;
use crate::config::*;
use crate::error::*;
use crate::http::HttpFetcher;
use crate::installer::ShellRunner;
use crate::version::Version;
use std::path::{self, PathBuf};
use std::time::{Duration, Instant};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{level_filters::*, *};
use tracing_subscriber::EnvFilter;

/// Main entry point for the application.
fn main() {
    // enable ansi support to use colorised/styled output
    #[cfg(windows)]
    let _ = nu_ansi_term::enable_ansi_support();

    // delegate
    if let Err(err) = internal_main() {
        let code = exit_code(&err);
        if code == EXIT_NOK {
            eprintln!("Failed! err = {err:#?}");
        } else {
            eprintln!("Failed! {}", ATTENTION_COLOR.paint(err.to_string()));
        }
        std::process::exit(code);
    } else {
        std::process::exit(EXIT_OK);
    }
}

// Internal main entry point for the application.
#[doc(hidden)]
fn internal_main() -> anyhow::Result<()> {
    // remember start date/time
    let start = Instant::now();

    // parse arguments (response files included)
    let args = Args::parse_with_response_files()?;

    // print some information
    if !args.quiet || args.version {
        print_info();
    }

    // stop here in case only the version was requested
    if args.version {
        return Ok(());
    }

    // init tracing
    init_tracing(&args);

    // print parsed arguments
    trace!("arguments: {args:#?}");

    // load config
    let explicit = args.config.is_some();
    let config_path = args.config.clone().unwrap_or(CONFIG_FILENAME.into());
    let config_path = PathBuf::from(config_path);
    let config_path = path::absolute(&config_path).unwrap_or(config_path);
    let config = Config::load_or_default(&config_path, explicit)?;
    if config_path.exists() {
        println!("Using configuration from {}.", PATH_COLOR.paint(config_path.to_string_lossy()));
    }
    debug!(?config);

    // derive base directory from config file
    let Some(basedir) = config_path.parent() else {
        let message = "Failed to determine base directory!";
        println!("{}", ATTENTION_COLOR.paint(message));
        return Ok(());
    };
    debug!(basedir = %basedir.display());

    // bundle
    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let runner = ShellRunner;
    let bootstrap = Bootstrap::from_config(basedir, &config, Request::from(&args), &fetcher, &runner)?;
    let publish_dir = bootstrap.run()?;
    println!("Published to {}.", PATH_COLOR.paint(publish_dir.to_string_lossy()));

    // print some statistics
    let elapsed = start.elapsed();
    println!("Total time: {}", format_elapsed(elapsed));
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    println!("Finished at: {}", format_now(now));

    Ok(())
}

// Formats the elapsed time with a resolution of seconds.
#[doc(hidden)]
fn format_elapsed(elapsed: Duration) -> String {
    // null out everything below seconds
    let elapsed = Duration::from_secs(elapsed.as_secs());

    humantime::format_duration(elapsed).to_string()
}

// Formats the given date/time in the local offset (or UTC).
#[doc(hidden)]
fn format_now(now: OffsetDateTime) -> String {
    const FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]");

    // local offset or UTC
    let offset = UtcOffset::current_local_offset();
    let offset = offset.unwrap_or(UtcOffset::UTC);
    trace!(?offset);

    let now = now.to_offset(offset);
    now.format(&FORMAT).unwrap_or(now.to_string())
}

// Prints some information (version, path of executable, etc.).
#[doc(hidden)]
fn print_info() {
    let version = Version::default();
    if let Ok(exe) = std::env::current_exe() {
        let exe = PATH_COLOR.paint(exe.to_string_lossy());
        println!("{version} [{exe}]");
    } else {
        println!("{version}");
    }
}

// Initialises the tracing framework based on given command line arguments.
#[doc(hidden)]
fn init_tracing(args: &Args) {
    // RUST_LOG is honoured, the verbosity adds a directive on top
    let level_filter = match args.verbose {
        0 => LevelFilter::ERROR.into(),
        1 => LevelFilter::WARN.into(),
        2 => LevelFilter::INFO.into(),
        3 => LevelFilter::DEBUG.into(),
        _ => LevelFilter::TRACE.into(),
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level_filter);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
