//! notes: terminal front-end for the notes backend.
//!
//! Each invocation visits one route of the client the way a browser tab
//! would, then prints what that route shows. Tokens persist between runs in
//! the state directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use notes_client::config::API_URL_ENV;
use notes_client::{
    ApiClient, App, Config, FileStore, Notifier, ReqwestTransport, SystemClock, TokenStore, View,
};

#[derive(Parser, Debug)]
#[command(name = "notes")]
#[command(about = "Command-line client for the notes service")]
struct Cli {
    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long, env = API_URL_ENV)]
    api_url: Option<String>,

    /// Directory holding config.json and stored tokens
    #[arg(long, env = "NOTES_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Visit a route path and show what it renders
    Open { path: String },

    /// Log in and show your notes
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "NOTES_PASSWORD")]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "NOTES_PASSWORD")]
        password: String,
    },

    /// Forget stored tokens
    Logout,

    /// List your notes
    List,

    /// Create a note
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        content: String,
    },

    /// Delete a note by id
    Delete { id: i64 },
}

/// Prints alerts to stdout.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        println!("{}", message);
    }
}

fn default_state_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("notes"))
        .context("No data directory available; pass --state-dir")
}

fn render(view: &View) {
    match view {
        View::Loading => println!("Loading..."),
        View::Notes(notes) => {
            println!("Notes");
            let cards = notes.cards();
            if cards.is_empty() {
                println!("  (none)");
            }
            for card in cards {
                println!();
                println!("  [{}] {}", card.id, card.title);
                if !card.content.is_empty() {
                    println!("  {}", card.content);
                }
                println!("  {}", card.date);
            }
        }
        View::Form(form) => println!("{}", form.heading()),
        View::NotFound { path } => println!("404 Not Found: {}", path),
    }
}

async fn submit_form(app: &mut App, path: &str, username: String, password: String) -> View {
    let view = app.navigate(path).await;
    let View::Form(mut form) = view else {
        return view;
    };
    form.username = username;
    form.password = password;

    // Show an indicator only for submissions that take noticeable time
    let submitting = form.submitting();
    let indicator = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        if submitting.get() {
            println!("Loading...");
        }
    });
    let outcome = form.submit().await;
    indicator.abort();
    match app.follow(outcome).await {
        Some(next) => next,
        None => {
            debug!("Submission failed, staying on {}", path);
            View::Form(form)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only what the route renders
    let default_filter = if cli.verbose {
        "debug,notes_client=debug,notes=debug"
    } else {
        "warn,notes_client=info,notes=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    };
    let config = Config::load(&state_dir)?;
    let api_url = config.resolve_api_url(cli.api_url.as_deref())?;
    info!("Using backend {}", api_url);

    let store = FileStore::open(Config::storage_path(&state_dir))?;
    let tokens = TokenStore::new(Arc::new(store));
    let transport = Arc::new(ReqwestTransport::new(api_url));
    let client = ApiClient::new(transport, tokens).with_register_path(config.register_path);
    let mut app = App::new(client, Arc::new(TerminalNotifier), Arc::new(SystemClock));

    let view = match cli.command {
        Command::Open { path } => app.navigate(&path).await,
        Command::Login { username, password } => {
            submit_form(&mut app, "/login", username, password).await
        }
        Command::Register { username, password } => {
            submit_form(&mut app, "/register", username, password).await
        }
        Command::Logout => app.navigate("/logout").await,
        Command::List => app.navigate("/").await,
        Command::Create { title, content } => match app.navigate("/").await {
            View::Notes(mut notes) => {
                notes.draft.title = title;
                notes.draft.content = content;
                notes.submit_draft().await;
                View::Notes(notes)
            }
            other => other,
        },
        Command::Delete { id } => match app.navigate("/").await {
            View::Notes(mut notes) => {
                notes.delete_note(id).await;
                View::Notes(notes)
            }
            other => other,
        },
    };

    render(&view);
    app.unmount();

    if let Some(current) = app.history().current() {
        debug!("Ended on {}", current);
    }

    Ok(())
}
