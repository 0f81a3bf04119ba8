//! Credential resolution and session establishment.
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::api::{ApiClient, Session};
use crate::ui::{self, Prompter};

const X_AUTH_TOKEN_ENV: &str = "X_AUTH_TOKEN";
const AUTH_TOKEN_ENV: &str = "AUTH_TOKEN";

/// Where the auth token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Cli,
    File(PathBuf),
    EnvXAuthToken,
    EnvAuthToken,
    Interactive,
}

impl TokenSource {
    pub fn describe(&self) -> String {
        match self {
            TokenSource::Cli => "Auth-Token from CLI ARGS".to_string(),
            TokenSource::File(path) => format!("Auth-token from file {}", path.display()),
            TokenSource::EnvXAuthToken => format!("environment variable {X_AUTH_TOKEN_ENV}"),
            TokenSource::EnvAuthToken => format!("environment variable {AUTH_TOKEN_ENV}"),
            TokenSource::Interactive => "interactive login".to_string(),
        }
    }
}

/// A resolved credential. `token` is `None` only for interactive login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: Option<String>,
    pub source: TokenSource,
}

/// Resolve the credential in the order: CLI token → token file →
/// `X_AUTH_TOKEN` → `AUTH_TOKEN` → interactive login.
pub fn resolve_credential(token: Option<&str>, token_file: Option<&Path>) -> Result<Credential> {
    resolve_credential_with(token, token_file, |name| env::var(name).ok())
}

/// Same as [`resolve_credential`] with an injectable environment lookup.
pub fn resolve_credential_with<F>(
    token: Option<&str>,
    token_file: Option<&Path>,
    lookup: F,
) -> Result<Credential>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = token.and_then(normalize_token) {
        return Ok(Credential {
            token: Some(token),
            source: TokenSource::Cli,
        });
    }

    if let Some(path) = token_file {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read auth token file {}", path.display()))?;
        match normalize_token(&contents) {
            Some(token) => {
                return Ok(Credential {
                    token: Some(token),
                    source: TokenSource::File(path.to_path_buf()),
                })
            }
            None => warn!("Auth token file {} is empty, ignoring it", path.display()),
        }
    }

    for (name, source) in [
        (X_AUTH_TOKEN_ENV, TokenSource::EnvXAuthToken),
        (AUTH_TOKEN_ENV, TokenSource::EnvAuthToken),
    ] {
        if let Some(token) = lookup(name).as_deref().and_then(normalize_token) {
            return Ok(Credential {
                token: Some(token),
                source,
            });
        }
    }

    Ok(Credential {
        token: None,
        source: TokenSource::Interactive,
    })
}

fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Establish a session on `client`. A rejected token is fatal; interactive
/// login keeps asking until the controller accepts the credentials.
pub fn authenticate<P: Prompter + ?Sized>(
    client: &mut ApiClient,
    credential: &Credential,
    prompter: &mut P,
) -> Result<Session> {
    println!("AUTHENTICATING...");
    println!("     Authenticating using {}", credential.source.describe());

    // A token gets exactly one try; interactive login keeps going.
    let session = match &credential.token {
        Some(token) => {
            let spinner = ui::spinner("Validating auth token...")?;
            let result = client.use_token(token);
            spinner.finish_and_clear();
            result.context("AUTH_TOKEN login failure, please check token")?
        }
        None => interactive_login(client, prompter)?,
    };

    println!("     SUCCESS: Authentication Complete");
    info!(
        "Authenticated against {} (tenant {})",
        client.base_url(),
        session.tenant_id
    );
    Ok(session)
}

fn interactive_login<P: Prompter + ?Sized>(
    client: &mut ApiClient,
    prompter: &mut P,
) -> Result<Session> {
    loop {
        // Fresh credentials every attempt.
        let email = prompter.ask("login")?;
        let password = prompter.ask_secret("password")?;
        match client.login(email.trim(), &password) {
            Ok(session) => return Ok(session),
            Err(err) => {
                warn!("Login failed: {err}");
                println!("Login failed, please try again.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn cli_token_wins_over_everything() {
        let cred = resolve_credential_with(
            Some("cli-token"),
            Some(Path::new("/does/not/exist")),
            env_of(&[(X_AUTH_TOKEN_ENV, "x"), (AUTH_TOKEN_ENV, "a")]),
        )
        .unwrap();
        assert_eq!(cred.token.as_deref(), Some("cli-token"));
        assert_eq!(cred.source, TokenSource::Cli);
    }

    #[test]
    fn token_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  file-token  ").unwrap();
        let cred =
            resolve_credential_with(None, Some(file.path()), env_of(&[(X_AUTH_TOKEN_ENV, "x")]))
                .unwrap();
        assert_eq!(cred.token.as_deref(), Some("file-token"));
        assert_eq!(cred.source, TokenSource::File(file.path().to_path_buf()));
    }

    #[test]
    fn unreadable_token_file_is_an_error() {
        let err = resolve_credential_with(None, Some(Path::new("/does/not/exist")), env_of(&[]))
            .unwrap_err();
        assert!(err.to_string().contains("auth token file"));
    }

    #[test]
    fn x_auth_token_is_checked_before_auth_token() {
        let cred = resolve_credential_with(
            None,
            None,
            env_of(&[(X_AUTH_TOKEN_ENV, "x"), (AUTH_TOKEN_ENV, "a")]),
        )
        .unwrap();
        assert_eq!(cred.source, TokenSource::EnvXAuthToken);

        let cred = resolve_credential_with(None, None, env_of(&[(AUTH_TOKEN_ENV, "a")])).unwrap();
        assert_eq!(cred.token.as_deref(), Some("a"));
        assert_eq!(cred.source, TokenSource::EnvAuthToken);
    }

    #[test]
    fn blank_values_fall_through_to_interactive() {
        let cred = resolve_credential_with(
            Some("   "),
            None,
            env_of(&[(X_AUTH_TOKEN_ENV, ""), (AUTH_TOKEN_ENV, "\n")]),
        )
        .unwrap();
        assert_eq!(cred.token, None);
        assert_eq!(cred.source, TokenSource::Interactive);
    }
}
