//! Show the personalised feed.

use anyhow::Result;

use keyfeed_client::{FeedSource, HttpTransport, ListSync, PageSource};
use keyfeed_core::FeedItem;

use super::{truncate, App};

/// Run the feed command.
pub async fn run<T: HttpTransport>(app: &App<T>, pages: u32) -> Result<()> {
    app.require_session()?;

    let feed = ListSync::new(FeedSource::new(app.client.clone()));
    load_pages(&feed, pages).await?;

    let items = feed.items().await;
    if items.is_empty() {
        println!("Your feed is empty. Add sources with 'keyfeed sources add'.");
        return Ok(());
    }
    for item in &items {
        println!("{}", format_feed_item(item));
    }
    println!();
    println!("{} items{}", items.len(), more_hint(feed.has_next().await));
    Ok(())
}

/// Load up to `pages` pages, stopping at the last one.
pub async fn load_pages<S: PageSource>(list: &ListSync<S>, pages: u32) -> Result<()> {
    list.load().await;
    for _ in 1..pages.max(1) {
        if list.error().await.is_some() || !list.has_next().await {
            break;
        }
        list.load_next_page().await;
    }
    match list.error().await {
        Some(message) => anyhow::bail!("{}", message),
        None => Ok(()),
    }
}

/// Trailing note when more pages exist.
pub fn more_hint(has_next: bool) -> &'static str {
    if has_next {
        " (more available, use --pages)"
    } else {
        ""
    }
}

/// Render one feed entry.
pub fn format_feed_item(item: &FeedItem) -> String {
    let mut header = format!("[{}] {}", item.content_id, truncate(&item.title, 80));
    if item.is_new {
        header.push_str(" (new)");
    }
    if item.bookmark.bookmarked {
        match item.bookmark.bookmark_id {
            Some(id) => header.push_str(&format!(" [saved #{}]", id)),
            None => header.push_str(" [saved]"),
        }
    }
    let mut lines = vec![header];
    lines.push(format!("    {} {} · {}", item.tag, item.source, item.time_ago));
    if !item.summary.is_empty() {
        lines.push(format!("    {}", truncate(&item.summary, 100)));
    }
    lines.push(format!("    {}", item.link));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::signed_in_app;
    use chrono::Utc;
    use keyfeed_client::{ClientConfig, Method, MockTransport};
    use keyfeed_types::dto::FeedContent;
    use keyfeed_types::{BookmarkId, ContentId};
    use serde_json::json;
    use tempfile::tempdir;

    fn content(id: u64) -> FeedContent {
        serde_json::from_value(json!({
            "contentId": id,
            "title": format!("Article {}", id),
            "summary": "summary",
            "sourceName": "Rust Blog",
            "originalUrl": format!("https://blog.rust-lang.org/{}", id),
        }))
        .unwrap()
    }

    #[test]
    fn format_shows_bookmark_id() {
        let mut item = FeedItem::from_content(content(42), Utc::now());
        item.bookmark.bookmarked = true;
        item.bookmark.bookmark_id = Some(BookmarkId::new(555));

        let text = format_feed_item(&item);
        assert!(text.starts_with("[42] Article 42"));
        assert!(text.contains("[saved #555]"));
        assert!(text.contains("https://blog.rust-lang.org/42"));
        assert_eq!(item.content_id, ContentId::new(42));
    }

    #[tokio::test]
    async fn feed_requires_session() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        let app = App::with_transport(dir.path(), ClientConfig::default(), transport.clone());

        assert!(run(&app, 1).await.is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn pages_stop_at_last_page() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        transport.respond_data(
            Method::Get,
            "/feed",
            json!({"content": [{"contentId": 2, "title": "b"}], "nextCursorId": 2, "hasNext": true}),
        );
        transport.respond_data(
            Method::Get,
            "/feed",
            json!({"content": [{"contentId": 1, "title": "a"}], "nextCursorId": null, "hasNext": false}),
        );
        let app = signed_in_app(dir.path(), &transport);

        run(&app, 5).await.unwrap();
        assert_eq!(transport.requests_to(Method::Get, "/feed").len(), 2);
    }

    #[tokio::test]
    async fn failed_load_is_an_error() {
        let dir = tempdir().unwrap();
        let transport = MockTransport::new();
        transport.respond_json(Method::Get, "/feed", 500, json!({"message": "boom"}));
        let app = signed_in_app(dir.path(), &transport);

        assert!(run(&app, 1).await.is_err());
    }
}
