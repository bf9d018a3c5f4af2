use std::{
    io::{self, Write},
    process::ExitCode,
};

use clap::{CommandFactory, Parser};
use cli::Cli;
use snafu::{ResultExt, Report};
use source::CertSource;
use tracing::level_filters::LevelFilter;

mod cli;
mod source;

pub const ENV_VAR_LOGGING: &str = "CERT_ANNOTATE_LOG";

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        print!("{}", version_info());
        return ExitCode::SUCCESS;
    }

    if let Err(error) = init_tracing(cli.debug) {
        eprintln!("Error: {}", Report::from_error(error));
        return ExitCode::from(2);
    }
    tracing::debug!("Running with debug turned on");

    match run(&cli) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            tracing::error!("{}", Report::from_error(error));
            ExitCode::from(2)
        }
    }
}

fn init_tracing(debug: bool) -> Result<(), snafu::Whatever> {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(ENV_VAR_LOGGING)
        .from_env()
        .whatever_context("failed to create tracing subscriber EnvFilter")?;
    tracing_subscriber::fmt()
        // Short running tool does not need any complex output
        .with_target(false)
        .without_time()
        // stdout is reserved for the annotated certificates
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
    Ok(())
}

fn run(cli: &Cli) -> Result<ExitCode, snafu::Whatever> {
    let stdin_is_pipe = source::stdin_is_pipe().whatever_context("failed to inspect stdin")?;
    if stdin_is_pipe {
        tracing::debug!("Pipe input detected, reading from pipe");
    }

    let sources = CertSource::collect(stdin_is_pipe, &cli.cert_paths);
    if sources.is_empty() {
        tracing::warn!("No data was piped into or specified on the command line");
        Cli::command()
            .write_help(&mut io::stderr())
            .whatever_context("failed to print usage")?;
        return Ok(ExitCode::FAILURE);
    }

    let mut annotations = String::new();
    let mut failures = 0usize;
    for source in &sources {
        match source.annotate() {
            Ok(annotated) => annotations.push_str(&annotated),
            Err(error) => {
                tracing::error!("{}", Report::from_error(error));
                failures += 1;
            }
        }
    }

    if failures == 0 {
        tracing::debug!("All sources successfully parsed");
    } else {
        tracing::warn!(
            failures,
            sources = sources.len(),
            "There were some errors while parsing sources"
        );
    }

    io::stdout()
        .lock()
        .write_all(annotations.as_bytes())
        .whatever_context("failed to write annotated certificates to stdout")?;

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn version_info() -> String {
    let mut info = format!(
        "{name}\n Version:    {version}\n",
        name = built_info::PKG_NAME,
        version = built_info::PKG_VERSION,
    );
    if let Some(commit) = built_info::GIT_COMMIT_HASH.and_then(|hash| hash.get(..7)) {
        info.push_str(&format!(" Git Commit: {commit}\n"));
    }
    info.push_str(&format!(" Build Date: {}\n", built_info::BUILT_TIME_UTC));
    info.push_str(&format!(" Rust:       {}\n", built_info::RUSTC_VERSION));
    info.push_str(&format!(
        " OS/Arch:    {}/{}\n",
        built_info::CFG_OS,
        built_info::CFG_TARGET_ARCH
    ));
    info
}
