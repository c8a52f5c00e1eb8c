use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use promptlift_client::{DEFAULT_API_URL, DEFAULT_ORIGIN};

#[derive(Parser)]
#[command(
    name = "promptlift",
    about = "Improve prompts, see what changed, and share the result",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the backend API
    #[arg(long, global = true, env = "PROMPTLIFT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Public origin share links are built on
    #[arg(long, global = true, env = "PROMPTLIFT_ORIGIN", default_value = DEFAULT_ORIGIN)]
    pub origin: String,

    /// Where the API key is stored
    #[arg(long, global = true, env = "PROMPTLIFT_CREDENTIAL_FILE")]
    pub credential_file: Option<PathBuf>,

    /// OpenAI API key; replaces the stored one
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Mark changes with {+ +} and [- -] instead of colors
    #[arg(long, global = true)]
    pub plain: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set when `--api-key` was typed rather than taken from the environment.
    #[arg(skip)]
    pub api_key_on_command_line: bool,
}

impl Cli {
    /// Parse the process arguments, exiting with usage on error.
    pub fn parse_args() -> Self {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_args_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let mut cli = Self::from_arg_matches(matches)?;
        cli.api_key_on_command_line =
            matches.value_source("api_key") == Some(ValueSource::CommandLine);
        Ok(cli)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Improve a prompt and show what changed
    Improve(ImproveArgs),
    /// Open a shared prompt
    Show(ShowArgs),
    /// List prompts published to the gallery
    Gallery,
    /// Diff two local text files
    Diff(DiffArgs),
    /// Manage the stored API key
    Key(KeyArgs),
    /// Check that the backend is reachable
    Status,
}

#[derive(Args)]
pub struct ImproveArgs {
    /// Prompt text; read from stdin when omitted
    pub prompt: Option<String>,
    /// Read the prompt from a file
    #[arg(short, long, conflicts_with = "prompt")]
    pub file: Option<PathBuf>,
    /// Create a share link for the result
    #[arg(long)]
    pub share: bool,
    /// Share and publish the result to the gallery
    #[arg(long)]
    pub publish: bool,
    /// Print the diff as HTML
    #[arg(long)]
    pub html: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Share id or share link
    pub id: String,
    #[arg(long)]
    pub html: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub original: PathBuf,
    pub revised: PathBuf,
    #[arg(long)]
    pub html: bool,
}

#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub action: KeyAction,
}

#[derive(Subcommand)]
pub enum KeyAction {
    /// Store an API key
    Set { key: String },
    /// Show the stored key, masked
    Show,
    /// Remove the stored key
    Clear,
}
