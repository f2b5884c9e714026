//! CLI command implementations.

pub mod account;
pub mod bookmarks;
pub mod feed;
pub mod keywords;
pub mod notifications;
pub mod sources;
pub mod status;

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use keyfeed_client::{
    ApiClient, ClientConfig, FileStore, HttpTransport, KeyValueStore, MarkerStore, MemoryStore,
    ReqwestTransport, SessionStore,
};
use keyfeed_types::AuthSession;

use crate::config::{store_dir, CliConfig};

/// Everything a command needs: the API client and the local stores.
pub struct App<T: HttpTransport> {
    /// API client.
    pub client: ApiClient<T>,
    /// Notification resume marker.
    pub markers: MarkerStore,
}

impl App<ReqwestTransport> {
    /// Open the stores under `data_dir` and connect over HTTP.
    pub fn open(data_dir: &Path, config: &CliConfig) -> Result<Self> {
        let client_config = config.client_config();
        let transport = ReqwestTransport::new(client_config.request_timeout)
            .context("Failed to create HTTP client")?;
        Ok(Self::with_transport(data_dir, client_config, transport))
    }
}

impl<T: HttpTransport> App<T> {
    /// Open the stores under `data_dir` over an arbitrary transport.
    ///
    /// Sessions saved without "stay signed in" go to a process-scoped store
    /// and end with the command.
    pub fn with_transport(data_dir: &Path, config: ClientConfig, transport: T) -> Self {
        let durable: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(store_dir(data_dir)));
        let tab: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let session = SessionStore::new(durable.clone(), tab);
        Self {
            client: ApiClient::new(config, transport, session),
            markers: MarkerStore::new(durable),
        }
    }

    /// The current session, or an error telling the user to sign in.
    pub fn require_session(&self) -> Result<AuthSession> {
        self.client
            .session()
            .current()
            .context("Not signed in. Run 'keyfeed login --stay-signed-in' first.")
    }
}

/// Use `given` or ask for a line on stdin.
pub fn value_or_prompt(given: Option<String>, prompt: &str) -> Result<String> {
    if let Some(value) = given {
        return Ok(value);
    }
    print!("{}", prompt);
    io::stdout().flush().context("Failed to write prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

/// Use `given` or ask for a password without echo.
pub fn password_or_prompt(given: Option<String>, prompt: &str) -> Result<String> {
    match given {
        Some(password) => Ok(password),
        None => rpassword::prompt_password(prompt).context("Failed to read password"),
    }
}

/// Shorten `text` to `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
