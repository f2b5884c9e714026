//! Configuration management for the keyfeed CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use keyfeed_client::config::{DEFAULT_NOTIFICATION_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use keyfeed_client::{ClientConfig, DEFAULT_BASE_URL};

/// Name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Settings read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// API base URL.
    pub base_url: String,
    /// Feed and bookmark page size.
    pub page_size: u32,
    /// Notification history page size.
    pub notification_page_size: u32,
    /// Cap on the live stream reconnect delay, in seconds.
    pub stream_retry_max_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            notification_page_size: DEFAULT_NOTIFICATION_PAGE_SIZE,
            stream_retry_max_secs: 30,
        }
    }
}

impl CliConfig {
    /// Load from a data directory. A missing file yields defaults.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Invalid configuration in {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).context("Failed to read configuration"),
        }
    }

    /// Save to a data directory.
    #[allow(dead_code)]
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        let contents = toml::to_string_pretty(self).context("Failed to encode configuration")?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save configuration")?;
        Ok(())
    }

    /// Apply a base URL given on the command line or in the environment.
    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        self
    }

    /// Client configuration for these settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url)
            .with_page_size(self.page_size)
            .with_notification_page_size(self.notification_page_size)
            .with_stream_retry_max(Duration::from_secs(self.stream_retry_max_secs.max(1)))
    }
}

/// Directory holding the session store and sibling files.
pub fn store_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("store")
}

/// Get the default data directory for keyfeed.
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("app", "keyfeed", "keyfeed")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load(dir.path()).await.unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.notification_page_size, 20);
    }

    #[tokio::test]
    async fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        tokio::fs::write(
            dir.path().join(CONFIG_FILE),
            "base_url = \"https://api.keyfeed.app/api/\"\npage_size = 25\n",
        )
        .await
        .unwrap();

        let config = CliConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.base_url, "https://api.keyfeed.app/api/");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.notification_page_size, 20);

        let client = config.client_config();
        assert_eq!(client.base_url, "https://api.keyfeed.app/api");
        assert_eq!(client.page_size, 25);
    }

    #[tokio::test]
    async fn invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join(CONFIG_FILE), "page_size = \"many\"")
            .await
            .unwrap();

        let err = CliConfig::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempdir().unwrap();
        let config = CliConfig {
            stream_retry_max_secs: 5,
            ..CliConfig::default()
        };
        config.save(dir.path()).await.unwrap();

        let loaded = CliConfig::load(dir.path()).await.unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.client_config().stream_retry_max, Duration::from_secs(5));
    }

    #[test]
    fn base_url_override_wins() {
        let config = CliConfig::default().with_base_url_override(Some("http://other/api".into()));
        assert_eq!(config.base_url, "http://other/api");

        let config = CliConfig::default().with_base_url_override(None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn data_dir_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("test-data");
        tokio::fs::create_dir_all(&data_dir).await.unwrap();
        set_dir_permissions_0700(&data_dir).await.unwrap();

        let perms = tokio::fs::metadata(&data_dir).await.unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o700, "dir should be 0700");
    }
}
