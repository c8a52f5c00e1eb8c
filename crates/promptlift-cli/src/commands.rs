use std::io::{IsTerminal, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use colored::Colorize;
use promptlift_client::{ApiClient, ClientConfig, CredentialStore, Session};
use promptlift_core::{Route, Workflow, gallery_entries, markup};
use tracing::debug;

use crate::cli::*;
use crate::display;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Improve(args) => cmd_improve(&cli, args).await,
        Command::Show(args) => cmd_show(&cli, args).await,
        Command::Gallery => cmd_gallery(&cli).await,
        Command::Diff(args) => cmd_diff(&cli, args),
        Command::Key(args) => cmd_key(&cli, args),
        Command::Status => cmd_status(&cli).await,
    }
}

fn client(cli: &Cli) -> anyhow::Result<ApiClient> {
    let mut config = ClientConfig::new(cli.api_url.clone());
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    ApiClient::new(config).context("failed to set up the API client")
}

/// Session for read-only views; no credential is needed.
fn session(cli: &Cli) -> anyhow::Result<Session<ApiClient>> {
    Ok(Session::new(client(cli)?, Workflow::new(cli.origin.clone())))
}

fn credential_store(cli: &Cli) -> CredentialStore {
    let path = cli
        .credential_file
        .clone()
        .unwrap_or_else(CredentialStore::default_path);
    debug!(path = %path.display(), "using credential file");
    CredentialStore::new(path)
}

// ── Improve ──

async fn cmd_improve(cli: &Cli, args: &ImproveArgs) -> anyhow::Result<()> {
    let prompt = read_prompt(args)?;
    let mut session = Session::new(client(cli)?, Workflow::new(cli.origin.clone()))
        .with_store(credential_store(cli))
        .context("failed to read the stored API key")?;
    // A typed key is remembered; one from the environment is used as is.
    match &cli.api_key {
        Some(key) if cli.api_key_on_command_line => session
            .set_credential(key.clone())
            .context("failed to store the API key")?,
        Some(key) => session.use_credential(key.clone()),
        None => {}
    }
    session.set_prompt(prompt);

    session.improve().await?;
    let segments = session.workflow().diff().unwrap_or_default();
    if args.html {
        println!("{}", markup::to_html(&segments));
    } else {
        display::print_diff(&segments, cli.plain);
    }

    if args.share || args.publish {
        session.share().await?;
        if let Some(link) = session.workflow().share_link() {
            println!();
            println!("{} {}", "Share link:".bold(), link.url);
        }
        print_notice(session.workflow());
    }
    if args.publish {
        session.publish().await?;
        print_notice(session.workflow());
    }
    Ok(())
}

/// Prompt text from the argument, the file, or piped stdin, in that order.
fn read_prompt(args: &ImproveArgs) -> anyhow::Result<String> {
    if let Some(prompt) = &args.prompt {
        return Ok(prompt.clone());
    }
    if let Some(path) = &args.file {
        return read_text(path);
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("failed to read the prompt from stdin")?;
    Ok(trim_line_end(text))
}

fn print_notice(workflow: &Workflow) {
    if let Some(notice) = workflow.active_notice(Instant::now()) {
        println!("{} {}", "✓".green().bold(), notice.message);
    }
}

// ── Viewer and gallery ──

async fn cmd_show(cli: &Cli, args: &ShowArgs) -> anyhow::Result<()> {
    // Accept a full share link as well as a bare id.
    let id = match Route::parse(&args.id) {
        Some(Route::Prompt(id)) => id,
        _ => args.id.clone(),
    };
    let view = session(cli)?.open_shared(&id).await?;
    if args.html {
        println!("{}", markup::to_html(&view.segments));
    } else {
        display::print_shared(&view, cli.plain);
    }
    Ok(())
}

async fn cmd_gallery(cli: &Cli) -> anyhow::Result<()> {
    let records = session(cli)?.gallery().await?;
    display::print_gallery(&gallery_entries(&records, &cli.origin));
    Ok(())
}

// ── Local ──

fn cmd_diff(cli: &Cli, args: &DiffArgs) -> anyhow::Result<()> {
    let original = read_text(&args.original)?;
    let revised = read_text(&args.revised)?;
    let segments = promptlift_core::render(&original, &revised);
    if args.html {
        println!("{}", markup::to_html(&segments));
    } else {
        display::print_diff(&segments, cli.plain);
    }
    Ok(())
}

fn cmd_key(cli: &Cli, args: &KeyArgs) -> anyhow::Result<()> {
    let store = credential_store(cli);
    match &args.action {
        KeyAction::Set { key } => {
            if key.is_empty() {
                bail!("the API key must not be empty");
            }
            store.save(key).context("failed to store the API key")?;
            println!("{} API key saved to {}", "✓".green().bold(), store.path().display());
        }
        KeyAction::Show => match store.load().context("failed to read the stored API key")? {
            Some(key) => println!("{}", display::mask_key(&key)),
            None => println!("No API key stored."),
        },
        KeyAction::Clear => {
            if store.clear().context("failed to clear the API key")? {
                println!("{} API key removed.", "✓".green().bold());
            } else {
                println!("No API key stored.");
            }
        }
    }
    Ok(())
}

async fn cmd_status(cli: &Cli) -> anyhow::Result<()> {
    let client = client(cli)?;
    let status = client
        .health()
        .await
        .with_context(|| format!("backend at {} is not reachable", client.base_url()))?;
    println!("{:<10} {}", "api", client.base_url());
    println!("{:<10} {}", "status", status.green());
    Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(trim_line_end(text))
}

/// Drop the final line terminator editors append.
fn trim_line_end(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}
