// UI layer: terminal prompts and progress spinners. Everything that reads
// from the operator goes through `Prompter` so the workflow can be driven
// by a script in tests.

use anyhow::Result;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::time::Duration;

/// Source of operator answers.
pub trait Prompter {
    /// Ask a free-form question and return the raw answer.
    fn ask(&mut self, prompt: &str) -> Result<String>;

    /// Ask for a secret; the answer is not echoed.
    fn ask_secret(&mut self, prompt: &str) -> Result<String>;
}

/// Interactive prompter backed by `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        // Empty answers are returned so the caller decides whether to re-ask.
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }

    fn ask_secret(&mut self, prompt: &str) -> Result<String> {
        let answer = Password::new().with_prompt(prompt).interact()?;
        Ok(answer)
    }
}

/// Ask `prompt` until the lowercased, trimmed answer is one of `accepted`,
/// then return that answer.
pub fn prompt_choice<P: Prompter + ?Sized>(
    prompter: &mut P,
    prompt: &str,
    accepted: &[&str],
) -> Result<String> {
    loop {
        let answer = prompter.ask(prompt)?.trim().to_lowercase();
        if accepted.contains(&answer.as_str()) {
            return Ok(answer);
        }
        debug!("Unrecognized answer {answer:?}, asking again");
    }
}

/// Spinner shown while a blocking network call runs. Call
/// `finish_and_clear` once the call returns.
pub fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}
