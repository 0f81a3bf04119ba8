// Library root
// -----------
// The binary (`main.rs`) only calls `run`. Module responsibilities:
// - `cli`: argument parsing.
// - `auth`: credential resolution and session establishment.
// - `api`: HTTP interactions with the controller.
// - `prefixes`: CSV subnet validation.
// - `rfc1918`: checks for the private ranges and asks about missing ones.
// - `publish`: confirmation and the prefix set replacement.
// - `ui`: terminal prompts and spinners.
pub mod api;
pub mod auth;
pub mod cli;
pub mod prefixes;
pub mod publish;
pub mod rfc1918;
pub mod ui;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use log::{info, warn, LevelFilter};

use crate::api::{ApiClient, Controller};
use crate::cli::ProgramInfo;
use crate::publish::PublishOutcome;
use crate::rfc1918::Reconciliation;
use crate::ui::{Prompter, TerminalPrompter};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("cg_global_prefix", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// How a run ended once a session existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Published,
    PublishFailed,
    Aborted,
    Quit,
}

impl From<PublishOutcome> for RunOutcome {
    fn from(outcome: PublishOutcome) -> Self {
        match outcome {
            PublishOutcome::Sent => RunOutcome::Published,
            PublishOutcome::Failed => RunOutcome::PublishFailed,
            PublishOutcome::Aborted => RunOutcome::Aborted,
        }
    }
}

pub fn run() -> Result<RunOutcome> {
    init_logging();
    // clap exits on its own for `--help` and usage errors.
    let cli = cli::parse_args(&ProgramInfo::default());
    // Pick the credential before touching the network so a bad token file
    // fails fast.
    let credential = auth::resolve_credential(cli.token.as_deref(), cli.authtokenfile.as_deref())?;
    info!("Using credential source: {}", credential.source.describe());

    // Blocks until a session exists; a rejected token ends the run here.
    let mut client = ApiClient::new(&cli.controller)?;
    let mut prompter = TerminalPrompter;
    auth::authenticate(&mut client, &credential, &mut prompter)?;
    run_session(&mut client, &mut prompter, &cli.csvfile)
}

/// Tenant lookup, CSV validation, reconciliation and publish on an
/// authenticated controller. Logout happens on every path, errors included.
pub fn run_session<C: Controller + ?Sized, P: Prompter + ?Sized>(
    controller: &mut C,
    prompter: &mut P,
    csv_path: &Path,
) -> Result<RunOutcome> {
    let outcome = sync_prefixes(controller, prompter, csv_path);
    logout(controller);
    outcome
}

fn sync_prefixes<C: Controller + ?Sized, P: Prompter + ?Sized>(
    controller: &C,
    prompter: &mut P,
    csv_path: &Path,
) -> Result<RunOutcome> {
    // Tenant name doubles as a check that the session is usable.
    let tenant = controller
        .tenant_name()
        .context("API Call failure when enumerating TENANT Name")?;
    println!(
        "======== TENANT NAME {} ========",
        tenant.as_deref().unwrap_or("<unnamed>")
    );

    // Bad rows are reported inside the scan and never stop it.
    let scan = prefixes::load_prefixes(csv_path)?;
    let mut prefix_list = scan.prefixes;

    // Quit skips publishing; `run_session` still logs out.
    if rfc1918::reconcile(&mut prefix_list, prompter)? == Reconciliation::Quit {
        return Ok(RunOutcome::Quit);
    }

    Ok(publish::publish(controller, prompter, prefix_list)?.into())
}

pub fn logout<C: Controller + ?Sized>(controller: &mut C) {
    println!("Logging out");
    if let Err(err) = controller.logout() {
        warn!("Logout failed: {err}");
    }
}
