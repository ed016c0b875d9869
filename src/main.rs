//! Expense Tracker
//!
//! Terminal front end: sign in, watch the expense list update live, create and
//! delete expenses.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use expense_tracker::app::{Backend, Command, ExpenseApp, Flow, HELP};
use expense_tracker::config::{generate_default_config, Config};
use expense_tracker::session::{Credentials, SessionGate};

#[derive(Parser)]
#[command(name = "expense-tracker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track expenses against a hosted data service with live updates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the in-process service instead of the hosted one
    #[arg(long, global = true)]
    pub local: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and open the interactive expense list (default)
    Run,

    /// Sign in, print the current list once and exit
    List {
        /// Username (default: from config, or prompt)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

type InputLines = Lines<BufReader<Stdin>>;

/// How a signed-in session ended
enum SessionEnd {
    SignedOut,
    Quit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    if let Err(e) = expense_tracker::logging::init(&config.logging) {
        eprintln!("Logging disabled: {}", e);
    }

    tracing::info!("Expense Tracker v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
            Ok(())
        }
        Commands::List { username } => {
            let backend = Backend::from_config(&config, cli.local);
            let username = username.or_else(|| config.auth.username.clone());
            list_once(&backend, username).await
        }
        Commands::Run => {
            let backend = Backend::from_config(&config, cli.local);
            run_interactive(&backend, config.auth.username.as_deref()).await
        }
    }
}

/// Sign-in gate around the interactive session, repeated after each sign-out
async fn run_interactive(backend: &Backend, default_username: Option<&str>) -> anyhow::Result<()> {
    let mut gate = SessionGate::new(backend.identity_provider()?);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(credentials) = prompt_credentials(&mut lines, default_username).await? else {
            return Ok(());
        };

        let principal = match gate.sign_in(&credentials).await {
            Ok(principal) => principal.clone(),
            Err(e) => {
                eprintln!("Sign-in failed: {}", e);
                continue;
            }
        };

        let client = backend.connect(&principal)?;
        let mut app = match ExpenseApp::mount(client).await {
            Ok(app) => app,
            Err(e) => {
                eprintln!("Could not open the expense list: {}", e);
                if let Some(warning) = sign_out(&mut gate).await {
                    eprintln!("{}", warning);
                }
                continue;
            }
        };

        println!("Signed in as {}. Type 'help' for commands.", principal.username);
        draw(&app);

        let end = session_loop(&mut app, &mut lines).await;
        app.unmount();

        match end? {
            SessionEnd::SignedOut => {
                if let Some(warning) = sign_out(&mut gate).await {
                    eprintln!("{}", warning);
                }
                println!("Signed out.");
            }
            SessionEnd::Quit => return Ok(()),
        }
    }
}

/// Return to the gate; the warning to show if the provider call failed
async fn sign_out(gate: &mut SessionGate) -> Option<String> {
    gate.sign_out()
        .await
        .err()
        .map(|e| format!("Sign-out did not reach the identity provider: {}", e))
}

/// Event loop for one signed-in session: terminal input and live query pushes
async fn session_loop(app: &mut ExpenseApp, lines: &mut InputLines) -> anyhow::Result<SessionEnd> {
    let mut live = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(SessionEnd::Quit);
                };
                if line.trim().is_empty() {
                    continue;
                }

                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };

                match app.handle(command).await {
                    Ok(Flow::Render) => draw(app),
                    Ok(Flow::Help) => println!("{}", HELP),
                    Ok(Flow::SignOut) => return Ok(SessionEnd::SignedOut),
                    Ok(Flow::Quit) => return Ok(SessionEnd::Quit),
                    Err(e) => eprintln!("{}", e),
                }
            }
            updated = app.next_update(), if live => {
                if updated {
                    draw(app);
                } else {
                    live = false;
                    eprintln!("Live updates stopped; the list may be out of date.");
                }
            }
        }
    }
}

/// Sign in, wait for the first snapshot, print it
async fn list_once(backend: &Backend, username: Option<String>) -> anyhow::Result<()> {
    let mut gate = SessionGate::new(backend.identity_provider()?);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let credentials = match (username, std::env::var("EXPENSES_PASSWORD").ok()) {
        (Some(username), Some(password)) => Credentials::new(username, password),
        (username, _) => prompt_credentials(&mut lines, username.as_deref())
            .await?
            .context("no credentials given")?,
    };

    let principal = gate.sign_in(&credentials).await?.clone();
    let client = backend.connect(&principal)?;
    let mut app = ExpenseApp::mount(client).await?;

    if !app.next_update().await {
        anyhow::bail!("live query ended before the first snapshot");
    }
    for (index, expense) in app.view().expenses().iter().enumerate() {
        println!(
            "{:>3}. {}  {}",
            index + 1,
            expense.name,
            expense_tracker::render::format_amount(expense.amount)
        );
    }

    app.unmount();
    Ok(())
}

/// Ask for username and password; `None` on end of input
async fn prompt_credentials(
    lines: &mut InputLines,
    default_username: Option<&str>,
) -> anyhow::Result<Option<Credentials>> {
    let username = match default_username {
        Some(name) => name.to_string(),
        None => match prompt(lines, "Username: ").await? {
            Some(name) => name,
            None => return Ok(None),
        },
    };

    let Some(password) = prompt(lines, "Password: ").await? else {
        return Ok(None);
    };

    Ok(Some(Credentials::new(username.trim(), password)))
}

async fn prompt(lines: &mut InputLines, label: &str) -> anyhow::Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

fn draw(app: &ExpenseApp) {
    println!();
    print!("{}", app.render().to_text());
    let _ = std::io::stdout().flush();
}
