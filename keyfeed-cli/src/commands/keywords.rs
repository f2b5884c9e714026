//! Notification keyword commands.

use anyhow::{Context, Result};

use keyfeed_client::HttpTransport;
use keyfeed_types::dto::Keyword;
use keyfeed_types::KeywordId;

use super::App;

/// List keywords.
pub async fn list<T: HttpTransport>(app: &App<T>) -> Result<()> {
    app.require_session()?;
    let keywords = app.client.keywords().await.context("Failed to load keywords")?;
    if keywords.is_empty() {
        println!("No keywords. Add one with 'keyfeed keywords add <name>'.");
    }
    for keyword in &keywords {
        println!("{}", format_keyword(keyword));
    }
    Ok(())
}

/// Add a keyword.
pub async fn add<T: HttpTransport>(app: &App<T>, name: &str) -> Result<()> {
    app.require_session()?;
    let keyword = app
        .client
        .add_keyword(name)
        .await
        .context("Failed to add keyword")?;
    println!("Added {}", format_keyword(&keyword));
    Ok(())
}

/// Remove a keyword.
pub async fn remove<T: HttpTransport>(app: &App<T>, keyword_id: KeywordId) -> Result<()> {
    app.require_session()?;
    app.client
        .delete_keyword(keyword_id)
        .await
        .context("Failed to remove keyword")?;
    println!("Removed keyword {}.", keyword_id);
    Ok(())
}

/// Render one keyword.
pub fn format_keyword(keyword: &Keyword) -> String {
    let alerts = if keyword.is_notification_enabled { "on" } else { "off" };
    format!("keyword {}: #{} (alerts {})", keyword.keyword_id, keyword.name, alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::signed_in_app;
    use keyfeed_client::{Method, MockTransport};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn keyword_line() {
        let keyword: Keyword = serde_json::from_value(json!({
            "keywordId": 4,
            "name": "rust",
            "isNotificationEnabled": true
        }))
        .unwrap();
        assert_eq!(format_keyword(&keyword), "keyword 4: #rust (alerts on)");
    }

    #[tokio::test]
    async fn blank_keyword_never_reaches_server() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        let app = signed_in_app(dir.path(), &transport);

        assert!(add(&app, "   ").await.is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_by_id() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        transport.respond_data(Method::Delete, "/keywords/4", json!(null));
        let app = signed_in_app(dir.path(), &transport);

        remove(&app, KeywordId::new(4)).await.unwrap();
        assert_eq!(transport.requests_to(Method::Delete, "/keywords/4").len(), 1);
    }
}
