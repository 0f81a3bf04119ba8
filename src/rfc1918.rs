//! Reconciliation of the prefix list against the RFC1918 private ranges.
use anyhow::{anyhow, Result};
use log::debug;

use crate::ui::{self, Prompter};

/// The three private-use IPv4 ranges, in the order they are checked.
pub const RFC1918_RANGES: [&str; 3] = ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"];

const MISSING_RANGE_ANSWERS: [&str; 6] = ["a", "add", "i", "ignore", "q", "quit"];

/// Operator decision for one missing range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRangeAction {
    Add,
    Ignore,
    Quit,
}

impl MissingRangeAction {
    fn from_answer(answer: &str) -> Option<Self> {
        match answer.chars().next()? {
            'a' => Some(MissingRangeAction::Add),
            'i' => Some(MissingRangeAction::Ignore),
            'q' => Some(MissingRangeAction::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Complete,
    Quit,
}

/// Ranges from [`RFC1918_RANGES`] not present in `prefixes`.
pub fn missing_ranges(prefixes: &[String]) -> Vec<&'static str> {
    RFC1918_RANGES
        .into_iter()
        .filter(|range| !prefixes.iter().any(|p| p == range))
        .collect()
}

/// Ask about every missing private range, one prompt per range. The only
/// change ever made to `prefixes` is appending the literal range text.
pub fn reconcile<P: Prompter + ?Sized>(
    prefixes: &mut Vec<String>,
    prompter: &mut P,
) -> Result<Reconciliation> {
    let missing = missing_ranges(prefixes);
    debug!("Missing private ranges: {missing:?}");
    for range in missing {
        match ask_missing_range(prompter, range)? {
            MissingRangeAction::Add => {
                println!("Adding Prefix {range}");
                prefixes.push(range.to_string());
            }
            MissingRangeAction::Ignore => {
                println!("Ignoring missing prefix {range}");
            }
            MissingRangeAction::Quit => {
                println!("Quitting program...");
                return Ok(Reconciliation::Quit);
            }
        }
    }
    Ok(Reconciliation::Complete)
}

fn ask_missing_range<P: Prompter + ?Sized>(
    prompter: &mut P,
    range: &str,
) -> Result<MissingRangeAction> {
    let prompt = format!(
        "Warning, {range} is missing from Global Prefixes. This may break RFC1918 traffic. \
Would you like to ADD this to the prefix list, IGNORE, or QUIT (A/I/Q)"
    );
    let answer = ui::prompt_choice(prompter, &prompt, &MISSING_RANGE_ANSWERS)?;
    MissingRangeAction::from_answer(&answer)
        .ok_or_else(|| anyhow!("unhandled answer {answer:?}"))
}
