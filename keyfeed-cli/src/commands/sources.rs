//! Source commands.

use anyhow::{Context, Result};
use chrono::Utc;

use keyfeed_client::HttpTransport;
use keyfeed_core::display::{parse_timestamp, relative_time};
use keyfeed_types::dto::Source;
use keyfeed_types::UserSourceId;

use super::App;

/// List followed sources, optionally filtered by name.
pub async fn list<T: HttpTransport>(app: &App<T>, search: Option<&str>) -> Result<()> {
    app.require_session()?;
    let sources = match search {
        Some(keyword) => app.client.search_my_sources(keyword).await,
        None => app.client.my_sources().await,
    }
    .context("Failed to load sources")?;

    if sources.is_empty() {
        match search {
            Some(keyword) => println!("No sources match '{}'.", keyword),
            None => println!("No sources. Add one with 'keyfeed sources add <name> <url>'."),
        }
    }
    for source in &sources {
        println!("{}", format_source(source));
    }
    Ok(())
}

/// Follow a new source.
pub async fn add<T: HttpTransport>(app: &App<T>, name: &str, url: &str) -> Result<()> {
    app.require_session()?;
    let source = app
        .client
        .add_source(name, url)
        .await
        .context("Failed to add source")?;
    println!("Added {}", format_source(&source));
    Ok(())
}

/// Stop following a source.
pub async fn remove<T: HttpTransport>(app: &App<T>, id: UserSourceId) -> Result<()> {
    app.require_session()?;
    app.client
        .delete_source(id)
        .await
        .context("Failed to remove source")?;
    println!("Removed source {}.", id);
    Ok(())
}

/// Flip whether a source feeds the user's feed.
pub async fn toggle<T: HttpTransport>(app: &App<T>, id: UserSourceId) -> Result<()> {
    app.require_session()?;
    let source = app
        .client
        .toggle_receive_feed(id)
        .await
        .context("Failed to update source")?;
    println!("Updated {}", format_source(&source));
    Ok(())
}

/// Render one source.
pub fn format_source(source: &Source) -> String {
    let feed = if source.receive_feed { "in feed" } else { "muted" };
    let crawled = source
        .last_crawled_at
        .as_deref()
        .and_then(parse_timestamp)
        .map(|at| format!(", crawled {}", relative_time(Some(at), Utc::now())))
        .unwrap_or_default();
    format!(
        "source {}: {} <{}> ({}{})",
        source.user_source_id, source.user_defined_name, source.url, feed, crawled
    )
}
