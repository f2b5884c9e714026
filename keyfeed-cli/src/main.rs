//! # keyfeed
//!
//! Command-line client for the KeyFeed API.
//!
//! ## Commands
//!
//! - `login` / `logout` / `status`: Manage the session
//! - `feed`: Show the personalised feed
//! - `bookmark` / `bookmarks` / `folders`: Manage saved content
//! - `keywords` / `sources`: Manage what the feed is built from
//! - `notifications`: Show history and follow live notifications
//!
//! ## Example
//!
//! ```bash
//! # Sign in and keep the session
//! keyfeed login --email kim@example.com --stay-signed-in
//!
//! # Read two pages of the feed
//! keyfeed feed --pages 2
//!
//! # Save an article
//! keyfeed bookmark add 42
//!
//! # Watch for keyword matches
//! keyfeed notifications --follow
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{account, bookmarks, feed, keywords, notifications, sources, status, App};
use config::CliConfig;
use keyfeed_types::dto::{PasswordChangeRequest, SignupRequest, SocialProvider};
use keyfeed_types::{BookmarkId, ContentId, FolderId, KeywordId, UserSourceId};

/// Command-line client for the KeyFeed API.
#[derive(Parser, Debug)]
#[command(name = "keyfeed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for the session, resume marker and config.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// API base URL (overrides config.toml)
    #[arg(long, global = true, env = "KEYFEED_API_BASE")]
    base_url: Option<String>,

    /// Verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in
    Login {
        /// Account email (will prompt if not provided)
        #[arg(long, short)]
        email: Option<String>,

        /// Password (will prompt if not provided)
        #[arg(long, env = "KEYFEED_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Keep the session for later commands
        #[arg(long)]
        stay_signed_in: bool,
    },

    /// Print the URL that starts a social login
    SocialLogin {
        /// Identity provider
        provider: Provider,
    },

    /// Sign out
    Logout,

    /// Show session and local state
    Status,

    /// Create an account
    Signup {
        /// Display name
        #[arg(long)]
        name: String,

        /// Account email
        #[arg(long)]
        email: String,

        /// Password (will prompt if not provided)
        #[arg(long, env = "KEYFEED_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Receive marketing email
        #[arg(long)]
        marketing: bool,
    },

    /// Email verification
    VerifyEmail {
        #[command(subcommand)]
        action: VerifyAction,
    },

    /// Change the account password
    Password,

    /// Delete the account
    DeleteAccount {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show the personalised feed
    Feed {
        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Save, remove or move one bookmark
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },

    /// List saved bookmarks
    Bookmarks {
        /// Only this folder
        #[arg(long)]
        folder: Option<u64>,

        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Manage bookmark folders
    Folders {
        #[command(subcommand)]
        action: Option<FolderAction>,
    },

    /// Manage notification keywords
    Keywords {
        #[command(subcommand)]
        action: Option<KeywordAction>,
    },

    /// Manage followed sources
    Sources {
        #[command(subcommand)]
        action: Option<SourceAction>,
    },

    /// Show notifications
    Notifications {
        /// Number of history pages to load
        #[arg(long, default_value = "1")]
        pages: u32,

        /// Keep running and print live notifications
        #[arg(long)]
        follow: bool,

        /// Stop following after this many live notifications
        #[arg(long, requires = "follow")]
        count: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum VerifyAction {
    /// Email a verification code
    Request {
        /// Address to verify
        email: String,
    },
    /// Confirm a verification code
    Confirm {
        /// Address being verified
        email: String,
        /// Code from the email
        code: String,
    },
}

#[derive(Subcommand, Debug)]
enum BookmarkAction {
    /// Bookmark a piece of content
    Add {
        /// Content id
        content_id: u64,
    },
    /// Remove a bookmark
    Remove {
        /// Bookmark id
        bookmark_id: i64,
    },
    /// Move a bookmark to another folder
    Move {
        /// Bookmark id
        bookmark_id: i64,
        /// Destination folder id
        folder_id: u64,
    },
}

#[derive(Subcommand, Debug)]
enum FolderAction {
    /// List folders
    List,
    /// Create a folder
    Create {
        /// Folder name
        name: String,
        /// Icon (folder, star, clock, heart, bookmark, tag, archive, folder-open)
        #[arg(long)]
        icon: Option<String>,
        /// Colour, e.g. #2b7fff
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a folder
    Delete {
        /// Folder id
        folder_id: u64,
    },
}

#[derive(Subcommand, Debug)]
enum KeywordAction {
    /// List keywords
    List,
    /// Add a keyword
    Add {
        /// Keyword text
        name: String,
    },
    /// Remove a keyword
    Remove {
        /// Keyword id
        keyword_id: u64,
    },
}

#[derive(Subcommand, Debug)]
enum SourceAction {
    /// List followed sources
    List,
    /// Search followed sources by name
    Search {
        /// Search text
        keyword: String,
    },
    /// Follow a new source
    Add {
        /// Display name
        name: String,
        /// Source URL (http or https)
        url: String,
    },
    /// Stop following a source
    Remove {
        /// User source id
        user_source_id: u64,
    },
    /// Toggle whether a source feeds the feed
    Toggle {
        /// User source id
        user_source_id: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Provider {
    Kakao,
    Naver,
    Google,
}

impl From<Provider> for SocialProvider {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Kakao => SocialProvider::Kakao,
            Provider::Naver => SocialProvider::Naver,
            Provider::Google => SocialProvider::Google,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => config::default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    let settings = CliConfig::load(&data_dir)
        .await?
        .with_base_url_override(cli.base_url);
    let app = App::open(&data_dir, &settings)?;

    match cli.command {
        Commands::Login {
            email,
            password,
            stay_signed_in,
        } => {
            let email = commands::value_or_prompt(email, "Email: ")?;
            let password = commands::password_or_prompt(password, "Password: ")?;
            account::login(&app, &email, &password, stay_signed_in).await?;
        }
        Commands::SocialLogin { provider } => {
            account::social_login(&app, provider.into()).await?;
        }
        Commands::Logout => {
            account::logout(&app)?;
        }
        Commands::Status => {
            status::run(&app, &data_dir)?;
        }
        Commands::Signup {
            name,
            email,
            password,
            marketing,
        } => {
            let password = commands::password_or_prompt(password, "Password: ")?;
            let request = SignupRequest {
                name,
                email,
                password,
                marketing_opt_in: marketing,
            };
            account::signup(&app, request).await?;
        }
        Commands::VerifyEmail { action } => match action {
            VerifyAction::Request { email } => account::request_verification(&app, &email).await?,
            VerifyAction::Confirm { email, code } => {
                account::confirm_verification(&app, &email, &code).await?
            }
        },
        Commands::Password => {
            let current_password = commands::password_or_prompt(None, "Current password: ")?;
            let new_password = commands::password_or_prompt(None, "New password: ")?;
            let confirm_password = commands::password_or_prompt(None, "Repeat new password: ")?;
            let request = PasswordChangeRequest {
                current_password,
                new_password,
                confirm_password,
            };
            account::change_password(&app, request).await?;
        }
        Commands::DeleteAccount { yes } => {
            if !yes {
                anyhow::bail!("Refusing to delete the account without --yes");
            }
            let password = commands::password_or_prompt(None, "Password: ")?;
            account::delete_account(&app, &password).await?;
        }
        Commands::Feed { pages } => {
            feed::run(&app, pages).await?;
        }
        Commands::Bookmark { action } => match action {
            BookmarkAction::Add { content_id } => {
                bookmarks::add(&app, ContentId::new(content_id)).await?
            }
            BookmarkAction::Remove { bookmark_id } => {
                bookmarks::remove(&app, BookmarkId::new(bookmark_id)).await?
            }
            BookmarkAction::Move {
                bookmark_id,
                folder_id,
            } => {
                bookmarks::move_to(&app, BookmarkId::new(bookmark_id), FolderId::new(folder_id))
                    .await?
            }
        },
        Commands::Bookmarks { folder, pages } => {
            bookmarks::list(&app, folder.map(FolderId::new), pages).await?;
        }
        Commands::Folders { action } => match action.unwrap_or(FolderAction::List) {
            FolderAction::List => bookmarks::folders(&app).await?,
            FolderAction::Create { name, icon, color } => {
                bookmarks::create_folder(&app, &name, icon.as_deref(), color).await?
            }
            FolderAction::Delete { folder_id } => {
                bookmarks::delete_folder(&app, FolderId::new(folder_id)).await?
            }
        },
        Commands::Keywords { action } => match action.unwrap_or(KeywordAction::List) {
            KeywordAction::List => keywords::list(&app).await?,
            KeywordAction::Add { name } => keywords::add(&app, &name).await?,
            KeywordAction::Remove { keyword_id } => {
                keywords::remove(&app, KeywordId::new(keyword_id)).await?
            }
        },
        Commands::Sources { action } => match action.unwrap_or(SourceAction::List) {
            SourceAction::List => sources::list(&app, None).await?,
            SourceAction::Search { keyword } => sources::list(&app, Some(&keyword)).await?,
            SourceAction::Add { name, url } => sources::add(&app, &name, &url).await?,
            SourceAction::Remove { user_source_id } => {
                sources::remove(&app, UserSourceId::new(user_source_id)).await?
            }
            SourceAction::Toggle { user_source_id } => {
                sources::toggle(&app, UserSourceId::new(user_source_id)).await?
            }
        },
        Commands::Notifications {
            pages,
            follow,
            count,
        } => {
            notifications::run(&app, pages, follow, count).await?;
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "keyfeed",
            "feed",
            "--pages",
            "3",
            "--base-url",
            "http://localhost:9000/api",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:9000/api"));
        assert!(matches!(cli.command, Commands::Feed { pages: 3 }));
    }

    #[test]
    fn count_requires_follow() {
        assert!(Cli::try_parse_from(["keyfeed", "notifications", "--count", "2"]).is_err());
        assert!(Cli::try_parse_from(["keyfeed", "notifications", "--follow", "--count", "2"]).is_ok());
    }

    #[test]
    fn folders_default_to_list() {
        let cli = Cli::try_parse_from(["keyfeed", "folders"]).unwrap();
        assert!(matches!(cli.command, Commands::Folders { action: None }));
    }
}
