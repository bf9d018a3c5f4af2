use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about,
    long_about = "Generate certificate summary information for PEM certificates and output it in mkcert.org format",
    disable_version_flag = true
)]
pub struct Cli {
    /// PEM certificate files to annotate. Use `-` to read from stdin.
    ///
    /// Piped input is picked up automatically and annotated before any of the files.
    #[arg(value_name = "CERT_PATH")]
    pub cert_paths: Vec<PathBuf>,

    /// Display the version number and exit
    #[arg(long)]
    pub version: bool,

    /// Include debug statements in log output
    #[arg(long, short = 'D', hide = true)]
    pub debug: bool,
}
