//! Bookmark and folder commands.

use anyhow::{Context, Result};

use keyfeed_client::{BookmarkSource, HttpTransport, ListSync};
use keyfeed_core::BookmarkedItem;
use keyfeed_types::dto::{BookmarkFolder, CreateFolderRequest, FolderIcon};
use keyfeed_types::{BookmarkId, ContentId, FolderId};

use super::feed::{load_pages, more_hint};
use super::{truncate, App};

/// Bookmark a piece of content.
pub async fn add<T: HttpTransport>(app: &App<T>, content_id: ContentId) -> Result<()> {
    app.require_session()?;
    let id = app
        .client
        .create_bookmark(content_id)
        .await
        .context("Failed to save bookmark")?;
    println!("Saved content {} as bookmark {}.", content_id, id);
    Ok(())
}

/// Remove a bookmark.
pub async fn remove<T: HttpTransport>(app: &App<T>, bookmark_id: BookmarkId) -> Result<()> {
    app.require_session()?;
    app.client
        .delete_bookmark(bookmark_id)
        .await
        .context("Failed to remove bookmark")?;
    println!("Removed bookmark {}.", bookmark_id);
    Ok(())
}

/// Move a bookmark to another folder.
pub async fn move_to<T: HttpTransport>(app: &App<T>, bookmark_id: BookmarkId, folder_id: FolderId) -> Result<()> {
    app.require_session()?;
    app.client
        .move_bookmark(bookmark_id, folder_id)
        .await
        .context("Failed to move bookmark")?;
    println!("Moved bookmark {} to folder {}.", bookmark_id, folder_id);
    Ok(())
}

/// List saved bookmarks.
pub async fn list<T: HttpTransport>(app: &App<T>, folder: Option<FolderId>, pages: u32) -> Result<()> {
    app.require_session()?;

    let bookmarks = ListSync::new(BookmarkSource::new(app.client.clone(), folder));
    load_pages(&bookmarks, pages).await?;

    let items = bookmarks.items().await;
    if items.is_empty() {
        println!("No bookmarks yet.");
        return Ok(());
    }
    for item in &items {
        println!("{}", format_bookmark(item));
    }
    println!();
    println!("{} bookmarks{}", items.len(), more_hint(bookmarks.has_next().await));
    Ok(())
}

/// List folders.
pub async fn folders<T: HttpTransport>(app: &App<T>) -> Result<()> {
    app.require_session()?;
    let folders = app.client.folders().await.context("Failed to load folders")?;
    if folders.is_empty() {
        println!("No folders.");
    }
    for folder in &folders {
        println!("{}", format_folder(folder));
    }
    Ok(())
}

/// Create a folder.
pub async fn create_folder<T: HttpTransport>(
    app: &App<T>,
    name: &str,
    icon: Option<&str>,
    color: Option<String>,
) -> Result<()> {
    app.require_session()?;
    let icon = match icon {
        Some(name) => Some(
            FolderIcon::parse(name).with_context(|| format!("Unknown folder icon '{}'", name))?,
        ),
        None => None,
    };
    let folder = app
        .client
        .create_folder(CreateFolderRequest {
            name: name.to_string(),
            icon,
            color,
        })
        .await
        .context("Failed to create folder")?;
    println!("Created {}", format_folder(&folder));
    Ok(())
}

/// Delete a folder.
pub async fn delete_folder<T: HttpTransport>(app: &App<T>, folder_id: FolderId) -> Result<()> {
    app.require_session()?;
    app.client
        .delete_folder(folder_id)
        .await
        .context("Failed to delete folder")?;
    println!("Deleted folder {}.", folder_id);
    Ok(())
}

/// Render one bookmark.
pub fn format_bookmark(item: &BookmarkedItem) -> String {
    let folder = item.folder_name.as_deref().unwrap_or("default");
    format!(
        "[{}] {}\n    content {} · {} · {} · saved {}\n    {}",
        item.id,
        truncate(&item.title, 80),
        item.content_id,
        folder,
        item.source,
        item.saved_ago,
        item.link
    )
}

/// Render one folder.
pub fn format_folder(folder: &BookmarkFolder) -> String {
    let mut line = format!("folder {}: {}", folder.folder_id, folder.name);
    if let Some(icon) = &folder.icon {
        line.push_str(&format!(" ({})", icon));
    }
    line
}
