//! `campus-admin`: drive the admin chat flow from a terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use campus_admin_client::chat::AdminChat;
use campus_admin_client::config::ClientConfig;
use campus_admin_client::facets::Selection;
use campus_admin_client::send::SendApplied;
use campus_admin_client::session::{AuthSession, FileSessionStore, SessionStore};
use campus_admin_client::thread::{FetchApplied, ThreadPhase};
use campus_admin_client::HttpBackend;
use campus_types::UserId;
use campus_types::models::SenderRef;

const SESSION_FILE_NAME: &str = "session.json";

#[derive(Parser, Debug)]
#[command(name = "campus-admin", version, about = "Marketplace admin chat from the command line")]
struct Cli {
    /// Override CAMPUS_API_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override CAMPUS_SESSION_FILE
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a bearer token for later commands
    Login {
        token: String,
        /// The admin's own user id
        #[arg(long)]
        user_id: Option<UserId>,
    },
    /// Forget the stored token
    Logout,
    /// List directory users, optionally narrowed by facets
    Users {
        /// Stop after this many pages
        #[arg(long)]
        pages: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        university: Option<String>,
        #[arg(long)]
        dormitory: Option<String>,
    },
    /// Show universities and their dormitories
    Facets,
    /// Show the recent thread with a user
    Thread { user_id: UserId },
    /// Send a message to a user
    Send {
        user_id: UserId,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

/// `$HOME/.campus-admin/session.json`, or the working directory without a home.
fn default_session_path(home: Option<PathBuf>) -> PathBuf {
    match home {
        Some(home) => home.join(".campus-admin").join(SESSION_FILE_NAME),
        None => PathBuf::from(SESSION_FILE_NAME),
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("invalid configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }
    if let Some(path) = &cli.session_file {
        config.session_file = Some(path.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_admin_client=info,campus_admin=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let session_path = config
        .session_file
        .clone()
        .unwrap_or_else(|| default_session_path(std::env::var_os("HOME").map(PathBuf::from)));
    let store = Arc::new(FileSessionStore::open(session_path));

    match cli.command {
        Command::Login { token, user_id } => {
            let mut session = AuthSession::bearer(token);
            if let Some(id) = user_id {
                session = session.with_user_id(id);
            }
            store.write(session)?;
            info!(path = %store.path().display(), "Session stored");
            Ok(())
        }
        Command::Logout => {
            store.clear()?;
            info!(path = %store.path().display(), "Session cleared");
            Ok(())
        }
        command => {
            let backend = HttpBackend::new(&config, store)?;
            let mut chat = AdminChat::new(backend, &config);
            run(&mut chat, command).await
        }
    }
}

async fn run(chat: &mut AdminChat<HttpBackend>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Users {
            pages,
            search,
            university,
            dormitory,
        } => {
            if university.is_some() || dormitory.is_some() {
                load_facets(chat).await?;
            }
            let facets = chat.facets_mut();
            if let Some(text) = search {
                facets.set_search(text);
            }
            if let Some(name) = university {
                if !facets.select_university(Selection::named(name.as_str())) {
                    bail!("unknown university {name:?}");
                }
            }
            if let Some(name) = dormitory {
                if !facets.select_dormitory(Selection::named(name.as_str())) {
                    match facets.advisory() {
                        Some(advisory) => bail!("{advisory}"),
                        None => bail!("unknown dormitory {name:?}"),
                    }
                }
            }

            let limit = pages.unwrap_or(u32::MAX);
            while chat.directory().has_more() && chat.directory().current_page() < limit {
                chat.load_next_page().await;
                if let Some(error) = chat.directory().error() {
                    bail!("{error}");
                }
            }
            for user in chat.visible_users() {
                println!(
                    "{:>6}  {:<28} {:<32} {} / {}",
                    user.id,
                    user.display_name,
                    user.email,
                    user.university_name.as_deref().unwrap_or("-"),
                    user.dormitory_name.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
        Command::Facets => {
            load_facets(chat).await?;
            let facets = chat.facets_mut();
            let universities: Vec<String> = facets
                .university_choices()
                .into_iter()
                .map(str::to_owned)
                .collect();
            for university in universities {
                facets.select_university(Selection::named(university.as_str()));
                println!("{university}");
                for dorm in facets.dormitory_choices() {
                    println!("  {dorm}");
                }
            }
            Ok(())
        }
        Command::Thread { user_id } => {
            if let Some(FetchApplied::Failed(message)) = chat.open_thread(user_id).await {
                bail!("{message}");
            }
            print_thread(chat);
            Ok(())
        }
        Command::Send { user_id, text } => {
            chat.open_thread(user_id).await;
            if let ThreadPhase::Failed(message) = chat.thread().phase() {
                bail!("{message}");
            }
            chat.composer_mut().set_draft(text.join(" "));
            match chat.send().await {
                Some(SendApplied::Failed(message)) => bail!("{message}"),
                Some(SendApplied::Sent { .. }) => {
                    print_thread(chat);
                    Ok(())
                }
                None => bail!("nothing to send"),
            }
        }
        Command::Login { .. } | Command::Logout => Ok(()),
    }
}

async fn load_facets(chat: &mut AdminChat<HttpBackend>) -> anyhow::Result<()> {
    chat.load_facets().await;
    if let Some(error) = chat.facets().error() {
        bail!("{error}");
    }
    Ok(())
}

fn print_thread(chat: &AdminChat<HttpBackend>) {
    if let Some(conversation_id) = chat
        .thread()
        .active_user()
        .and_then(|id| chat.conversations().get(id))
    {
        println!("conversation {conversation_id}");
    }
    for message in chat.thread().messages() {
        let who = match message.sender {
            SenderRef::Admin => "admin",
            SenderRef::User => "user ",
        };
        println!(
            "[{}] {who}: {}",
            message.sent_at.format("%Y-%m-%d %H:%M"),
            message.text
        );
    }
}
