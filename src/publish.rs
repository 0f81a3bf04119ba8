//! Confirmation and the single full-replacement push.
use anyhow::Result;
use log::{error, info};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::api::{Controller, PrefixSetPayload};
use crate::ui::{self, Prompter};

const CONFIRM_ANSWERS: [&str; 4] = ["y", "yes", "n", "no"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Sent,
    Failed,
    Aborted,
}

pub fn build_payload(prefixes: Vec<String>) -> PrefixSetPayload {
    PrefixSetPayload {
        ipv4_enterprise_prefixes: prefixes,
    }
}

/// Pretty JSON with four-space indentation for operator review.
pub fn render_payload(payload: &PrefixSetPayload) -> Result<String> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    payload.serialize(&mut serializer)?;
    Ok(String::from_utf8(out)?)
}

/// Show the payload, ask for confirmation and replace the remote prefix
/// set. A failed push is reported, never retried.
pub fn publish<C: Controller + ?Sized, P: Prompter + ?Sized>(
    controller: &C,
    prompter: &mut P,
    prefixes: Vec<String>,
) -> Result<PublishOutcome> {
    // Show exactly what will replace the remote list before asking.
    let payload = build_payload(prefixes);
    println!("The Following Prefixes will be added:");
    println!("{}", render_payload(&payload)?);

    // Nothing is sent unless the operator answers yes.
    let answer = ui::prompt_choice(prompter, "Proceed (Y/N)", &CONFIRM_ANSWERS)?;
    if !answer.starts_with('y') {
        println!("Aborting");
        return Ok(PublishOutcome::Aborted);
    }

    // Single full-replacement call; a failure is only reported.
    let spinner = ui::spinner("Replacing enterprise prefix set...")?;
    let result = controller.put_enterprise_prefix_set(&payload);
    spinner.finish_and_clear();

    match result {
        Ok(()) => {
            println!();
            println!("Enterprise Prefixes Added Successfully");
            info!(
                "Enterprise prefix set replaced with {} prefix(es)",
                payload.ipv4_enterprise_prefixes.len()
            );
            Ok(PublishOutcome::Sent)
        }
        Err(err) => {
            error!("Enterprise prefix set update failed: {err}");
            println!("ERROR adding prefixes");
            Ok(PublishOutcome::Failed)
        }
    }
}
