//! Kiosk Browser - single-site frameless browser with login auto-fill.

mod app;
mod autofill;
mod config;
mod credentials;
mod ini;
mod models;
mod scheduler;
mod shell;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::autofill::AutofillSettings;
use crate::config::{
    default_data_dir, expand_path, EngineSettings, KioskConfig, APP_TITLE,
    AUTOFILL_RETRY_DELAY_MS, DEFAULT_TRIGGER_URL, INITIAL_AUTOFILL_DELAY_MS,
    MAX_AUTOFILL_ATTEMPTS, USER_AGENT,
};
use crate::credentials::CredentialStore;
use crate::models::CredentialsSummary;

#[derive(Parser)]
#[command(name = "kiosk-browser")]
#[command(about = "Frameless single-site browser with login auto-fill")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Credentials file (defaults to credentials.ini next to the executable)
    #[arg(long, global = true, env = "KIOSK_CREDENTIALS")]
    credentials: Option<String>,

    /// Output JSON (for scripts)
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the kiosk window (default)
    Run(RunArgs),

    /// Manage the saved login
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Page to open instead of the saved URL
    #[arg(long)]
    url: Option<String>,

    /// Auto-fill only runs when this exact URL finishes loading
    #[arg(long, env = "KIOSK_TRIGGER_URL", default_value = DEFAULT_TRIGGER_URL)]
    trigger_url: String,

    /// Window icon (PNG or ICO)
    #[arg(long, env = "KIOSK_ICON")]
    icon: Option<String>,

    /// Window title
    #[arg(long, default_value = APP_TITLE)]
    title: String,

    /// User agent presented to the site
    #[arg(long, default_value = USER_AGENT)]
    user_agent: String,

    /// Fill attempts per page load (0 disables auto-fill)
    #[arg(long, default_value_t = MAX_AUTOFILL_ATTEMPTS)]
    max_attempts: u32,

    /// Delay before the first fill attempt, in milliseconds
    #[arg(long, default_value_t = INITIAL_AUTOFILL_DELAY_MS)]
    initial_delay_ms: u64,

    /// Base delay between fill attempts, in milliseconds
    #[arg(long, default_value_t = AUTOFILL_RETRY_DELAY_MS)]
    retry_delay_ms: u64,

    /// Webview cache directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Enable the webview inspector
    #[arg(long)]
    devtools: bool,
}

#[derive(Subcommand)]
enum CredentialsAction {
    /// Print the saved login (password masked)
    Show,
    /// Save a login, keeping any other content of the file
    Set {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Start-up URL (keeps the saved one when omitted)
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the credentials file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kiosk_browser=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = match &cli.credentials {
        Some(path) => CredentialStore::new(expand_path(path)),
        None => CredentialStore::beside_executable()?,
    };

    match cli.command {
        None => cmd_run(cli.run, store),
        Some(Commands::Run(args)) => cmd_run(args, store),
        Some(Commands::Credentials { action }) => match action {
            CredentialsAction::Show => cmd_show(&store, cli.json),
            CredentialsAction::Set {
                username,
                password,
                url,
            } => cmd_set(&store, username, password, url),
            CredentialsAction::Path => {
                println!("{}", store.path().display());
                Ok(())
            }
        },
    }
}

fn cmd_run(args: RunArgs, store: CredentialStore) -> Result<()> {
    let start_url = args.url.clone().or_else(|| store.load_url());
    if start_url.is_none() {
        tracing::warn!(
            "No URL saved in {}, opening a blank page",
            store.path().display()
        );
    }

    let config = KioskConfig {
        start_url,
        title: args.title,
        icon: args.icon.as_deref().map(expand_path),
        user_agent: args.user_agent,
        devtools: args.devtools,
        data_dir: args
            .data_dir
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(default_data_dir),
        autofill: AutofillSettings {
            trigger_url: args.trigger_url,
            max_attempts: args.max_attempts,
            initial_delay: Duration::from_millis(args.initial_delay_ms),
            retry_delay: Duration::from_millis(args.retry_delay_ms),
            ..AutofillSettings::default()
        },
        engine: EngineSettings::for_current_platform(),
    };

    app::run(config, store).context("Kiosk window failed")
}

fn cmd_show(store: &CredentialStore, json_output: bool) -> Result<()> {
    let credentials = store.load();
    let summary = CredentialsSummary {
        path: store.path().display().to_string(),
        username: credentials.as_ref().map(|c| c.username.clone()),
        password: credentials.as_ref().map(|_| "********".to_string()),
        url: store.load_url(),
    };

    if json_output {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!("File:     {}", summary.path);
        println!("Username: {}", summary.username.as_deref().unwrap_or("(not set)"));
        println!("Password: {}", summary.password.as_deref().unwrap_or("(not set)"));
        println!("URL:      {}", summary.url.as_deref().unwrap_or("(not set)"));
    }
    Ok(())
}

fn cmd_set(
    store: &CredentialStore,
    username: String,
    password: String,
    url: Option<String>,
) -> Result<()> {
    let url = url.or_else(|| store.load_url()).unwrap_or_default();
    let Some(credentials) = shell::validate_form(&username, &password, &url) else {
        bail!("Both --username and --password must be non-empty");
    };

    if !store.save(&credentials) {
        bail!("Could not write {}", store.path().display());
    }
    println!("Credentials saved to {}", store.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credentials;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_runs_with_defaults() {
        let cli = Cli::try_parse_from(["kiosk-browser"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.max_attempts, MAX_AUTOFILL_ATTEMPTS);
        assert_eq!(cli.run.title, APP_TITLE);
        assert_eq!(cli.run.user_agent, USER_AGENT);
    }

    #[test]
    fn test_credentials_set_parses() {
        let cli = Cli::try_parse_from([
            "kiosk-browser",
            "credentials",
            "set",
            "--username",
            "alice",
            "--password",
            "secret1",
            "--credentials",
            "/tmp/creds.ini",
        ])
        .unwrap();

        assert_eq!(cli.credentials.as_deref(), Some("/tmp/creds.ini"));
        match cli.command {
            Some(Commands::Credentials {
                action: CredentialsAction::Set { username, url, .. },
            }) => {
                assert_eq!(username, "alice");
                assert_eq!(url, None);
            }
            _ => panic!("expected credentials set"),
        }
    }

    #[test]
    fn test_cmd_set_keeps_saved_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("creds.ini"));
        assert!(store.save(&Credentials::new("old", "pw", "http://saved/")));

        cmd_set(&store, "alice".into(), "secret1".into(), None).unwrap();
        assert_eq!(
            store.load(),
            Some(Credentials::new("alice", "secret1", "http://saved/"))
        );
    }

    #[test]
    fn test_cmd_set_rejects_blank_password() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("creds.ini"));

        assert!(cmd_set(&store, "alice".into(), "  ".into(), None).is_err());
        assert_eq!(store.load(), None);
    }
}
