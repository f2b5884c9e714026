//! Show notification history and follow the live stream.

use anyhow::Result;
use std::future::Future;
use tokio::sync::broadcast::error::RecvError;

use keyfeed_client::{HttpTransport, LiveUpdate, NotificationSync};
use keyfeed_core::{NotificationItem, StreamNotice};

use super::{truncate, App};

/// Run the notifications command.
pub async fn run<T: HttpTransport>(
    app: &App<T>,
    pages: u32,
    follow: bool,
    count: Option<usize>,
) -> Result<()> {
    app.require_session()?;

    let sync = NotificationSync::new(app.client.clone(), app.markers.clone());
    sync.load_history().await;
    for _ in 1..pages.max(1) {
        if !sync.snapshot().await.has_next {
            break;
        }
        sync.fetch_next_page().await;
    }

    let snapshot = sync.snapshot().await;
    if let Some(error) = &snapshot.error {
        if !follow {
            anyhow::bail!("{}", error);
        }
        eprintln!("History unavailable: {}", error);
    }
    if snapshot.items.is_empty() && snapshot.error.is_none() {
        println!("No notifications.");
    }
    // Oldest first so the newest ends up next to the prompt.
    for item in snapshot.items.iter().rev() {
        println!("{}", format_notification(item));
    }

    if follow {
        println!();
        println!("Following live notifications (Ctrl-C to stop)...");
        let received = follow_live(&sync, count, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
        println!("{} live notifications received.", received);
    }
    Ok(())
}

/// Print live notifications until `stop` resolves or `count` arrive.
///
/// Returns how many live notifications were printed.
pub async fn follow_live<T, F>(sync: &NotificationSync<T>, count: Option<usize>, stop: F) -> usize
where
    T: HttpTransport,
    F: Future<Output = ()>,
{
    let mut updates = sync.updates();
    sync.subscribe().await;

    let mut received = 0;
    tokio::pin!(stop);
    while count.map_or(true, |max| received < max) {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(LiveUpdate::Notification(item)) => {
                    received += 1;
                    println!("{}", format_notification(&item));
                }
                Ok(LiveUpdate::Stream(notice)) => {
                    eprintln!("{}", describe_notice(&notice));
                    if notice == StreamNotice::SignedOut {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Skipped {} live updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut stop => break,
        }
    }

    sync.close().await;
    received
}

/// Render one notification.
pub fn format_notification(item: &NotificationItem) -> String {
    let mut header = format!("[{}] {}", item.kind.as_str(), truncate(&item.title, 80));
    if let Some(tag) = &item.tag {
        header.push_str(&format!(" {}", tag));
    }
    if item.is_live {
        header.push_str(" (live)");
    }
    let mut lines = vec![header];
    if !item.description.is_empty() {
        lines.push(format!("    {}", truncate(&item.description, 100)));
    }
    match &item.link {
        Some(link) => lines.push(format!("    {} · {}", item.time, link)),
        None => lines.push(format!("    {}", item.time)),
    }
    lines.join("\n")
}

/// One-line description of a connection change.
pub fn describe_notice(notice: &StreamNotice) -> String {
    match notice {
        StreamNotice::Opened => "Live connection open.".to_string(),
        StreamNotice::Degraded { error, attempt } => {
            format!("Live connection lost ({}); reconnect attempt {}.", error, attempt)
        }
        StreamNotice::Closed => "Live connection closed.".to_string(),
        StreamNotice::SignedOut => {
            "Signed out, live connection stopped. Run 'keyfeed login' again.".to_string()
        }
    }
}
