//! Command-line arguments.
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Command, CommandFactory, FromArgMatches, Parser};

use crate::api::DEFAULT_CONTROLLER;

/// Program identity and help text, handed to the argument parser.
#[derive(Debug, Clone, Copy)]
pub struct ProgramInfo {
    pub name: &'static str,
    pub about: &'static str,
    pub after_help: &'static str,
}

impl Default for ProgramInfo {
    fn default() -> Self {
        Self {
            name: "cg-global-prefix",
            about: "Updates the controller Enterprise Global Prefixes from a CSV file of IP subnets",
            after_help: "Notes:\n\n\
The push from this tool is an atomic push which replaces all previous entries.\n\
Take care that the new update does not remove existing entries which are\n\
critical for the operation of the SDWAN solution.\n\n\
RFC1918 validation: because of the nature of the push, the CSV file is checked\n\
for the 3 standard RFC1918 ranges. Any that are missing are confirmed with\n\
the operator before pushing: answer A/ADD, I/IGNORE or Q/QUIT (ABORT is not\n\
accepted as an alias of ADD).",
        }
    }
}

impl ProgramInfo {
    fn command(&self) -> Command {
        Cli::command()
            .name(self.name)
            .bin_name(self.name)
            .about(self.about)
            .after_help(self.after_help)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(version)]
pub struct Cli {
    /// Auth token to use for controller authentication
    #[arg(short = 't', long, value_name = "MYTOKEN")]
    pub token: Option<String>,
    /// A file containing the auth token
    #[arg(short = 'f', long = "authtokenfile", value_name = "MYTOKENFILE.TXT")]
    pub authtokenfile: Option<PathBuf>,
    /// The CSV file that contains IP subnets to add as Global Prefixes
    #[arg(short = 'c', long = "csvfile", value_name = "csvfile")]
    pub csvfile: PathBuf,
    /// Controller API base URL
    #[arg(long, env = "CGX_CONTROLLER", default_value = DEFAULT_CONTROLLER)]
    pub controller: String,
}

/// Parse `args` (including the binary name) against `info`.
pub fn try_parse_args<I, T>(info: &ProgramInfo, args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = info.command().try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}

/// Parse the process arguments, exiting with usage output on error or
/// `--help`.
pub fn parse_args(info: &ProgramInfo) -> Cli {
    try_parse_args(info, std::env::args_os()).unwrap_or_else(|err| err.exit())
}
