//! Show local status.

use anyhow::Result;
use std::path::Path;

use keyfeed_client::HttpTransport;
use keyfeed_types::{AuthSession, Persistence};

use super::App;

/// Run the status command. Makes no requests.
pub fn run<T: HttpTransport>(app: &App<T>, data_dir: &Path) -> Result<()> {
    println!("=== keyfeed status ===");
    println!();
    println!("API:      {}", app.client.config().base_url);
    println!("Data dir: {}", data_dir.display());
    println!();

    match app.client.session().current() {
        Some(session) => println!("{}", describe_session(&session)),
        None => {
            println!("Session: NOT SIGNED IN");
            println!();
            println!("Run 'keyfeed login --stay-signed-in' to sign in.");
            return Ok(());
        }
    }

    println!();
    match app.markers.load() {
        Some(marker) => println!("Notifications: resume after event {}", marker.as_str()),
        None => println!("Notifications: no events seen yet"),
    }
    Ok(())
}

/// Summary of a session. Never includes the token.
pub fn describe_session(session: &AuthSession) -> String {
    let scope = match session.persistence {
        Persistence::Durable => "kept across runs",
        Persistence::Tab => "this run only",
    };
    format!(
        "Session:\n  User:  {} <{}>\n  ID:    {}\n  Role:  {}\n  Scope: {}",
        session.user.name, session.user.email, session.user.id, session.user.role, scope
    )
}
