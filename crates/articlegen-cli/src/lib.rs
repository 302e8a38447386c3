#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use articlegen_client::config::normalize_base_url;
use articlegen_client::{
    AppRoute, ArticleClient, ClientConfig, ClientError, CredentialStore, FileCredentialStore,
    GenerationRequest, GenerationStrategy, Navigation, Screen, navigate,
};
use clap::{Args, Parser, Subcommand, ValueEnum};

mod display;

pub use display::{export_file_name, render_article, result_json, write_export};

pub const ENV_PASSWORD: &str = "ARTICLEGEN_PASSWORD";
pub const ENV_LOG_FILTER: &str = "ARTICLEGEN_LOG_FILTER";

const SIGN_IN_HINT: &str = "Run `articlegen login --username <name>` to sign in.";

#[derive(Parser, Debug)]
#[command(name = "articlegen")]
#[command(about = "Generate an article, its SEO metadata, and an HTML page from a query")]
pub struct ArticlegenCli {
    #[command(flatten)]
    pub options: GlobalOptions,
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags here win over the `ARTICLEGEN_*` environment.
#[derive(Args, Debug, Default)]
pub struct GlobalOptions {
    /// Backend base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// One call for everything, or article/SEO/HTML as separate calls
    #[arg(long, global = true, value_enum)]
    pub strategy: Option<StrategyArg>,
    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
    /// Credential file location
    #[arg(long, global = true)]
    pub credential_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and remember the session token
    Login(LoginArgs),
    /// Forget the stored session token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Generate an article from a query
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long, env = ENV_PASSWORD, hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// What the article should be about
    #[arg(long)]
    pub query: String,
    /// Optional source URL for context
    #[arg(long)]
    pub url: Option<String>,
    /// Also write the rendered HTML into this directory
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
    /// Print the result as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    OneShot,
    Staged,
}

impl From<StrategyArg> for GenerationStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::OneShot => Self::OneShot,
            StrategyArg::Staged => Self::Staged,
        }
    }
}

pub async fn run() -> Result<()> {
    run_with(ArticlegenCli::parse()).await
}

pub async fn run_with(cli: ArticlegenCli) -> Result<()> {
    let config = resolve_config(&cli.options)?;
    let store = open_store(&config);

    match cli.command {
        Commands::Login(args) => login(&ArticleClient::new(config, store), args).await,
        Commands::Logout => {
            ArticleClient::new(config, store).session().logout();
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => whoami(&ArticleClient::initialize(config, store).await),
        Commands::Generate(args) => {
            generate(&ArticleClient::initialize(config, store).await, args).await
        }
    }
}

pub fn resolve_config(options: &GlobalOptions) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("invalid ARTICLEGEN_* configuration")?;
    if let Some(base_url) = options.base_url.as_deref() {
        config.base_url = normalize_base_url(base_url).context("invalid --base-url")?;
    }
    if let Some(strategy) = options.strategy {
        config.strategy = strategy.into();
    }
    if let Some(timeout_ms) = options.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(path) = options.credential_path.clone() {
        config.credential_path = Some(path);
    }
    Ok(config)
}

fn open_store(config: &ClientConfig) -> Arc<dyn CredentialStore> {
    let store = match config.credential_path.clone() {
        Some(path) => FileCredentialStore::new(path),
        None => FileCredentialStore::at_default_location(),
    };
    tracing::debug!(path = %store.path().display(), "using credential store");
    Arc::new(store)
}

async fn login(client: &ArticleClient, args: LoginArgs) -> Result<()> {
    let profile = client.session().login(&args.username, &args.password).await?;
    println!("Signed in as {}.", profile.username);
    Ok(())
}

fn whoami(client: &ArticleClient) -> Result<()> {
    require_session(client, AppRoute::Generator)?;
    let state = client.session().state();
    let username = state
        .user
        .map(|user| user.username)
        .ok_or_else(|| anyhow!("signed in, but no profile was loaded"))?;
    println!("{username}");
    Ok(())
}

async fn generate(client: &ArticleClient, args: GenerateArgs) -> Result<()> {
    require_session(client, AppRoute::Generator)?;

    let mut request = GenerationRequest::new(args.query);
    if let Some(url) = args.url {
        request = request.with_context_url(url);
    }

    eprintln!("Generating article...");
    let navigation = client.submit(&request).await?;

    let result = match navigate(navigation, &client.session().state()).screen {
        Screen::Article(result) => result,
        Screen::Login => bail!("{SIGN_IN_HINT}"),
        other => bail!("generation finished but the article could not be shown ({other:?})"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result_json(&result))?);
    } else {
        print!("{}", render_article(&result));
    }

    if let Some(dir) = args.export_dir.as_deref() {
        let path = write_export(dir, &result)?;
        eprintln!("HTML written to {}", path.display());
    }
    Ok(())
}

/// Applies the same guard the routes apply: protected surfaces need a
/// session. Asking for the login route itself is always allowed.
pub fn require_session(client: &ArticleClient, route: AppRoute) -> Result<()> {
    let landing = navigate(Navigation::to(route), &client.session().state());
    if landing.screen == Screen::Login && landing.redirected_from.is_some() {
        bail!("Not signed in. {SIGN_IN_HINT}");
    }
    Ok(())
}

/// The line printed for a failed command.
pub fn describe_error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ClientError>() {
        Some(client_error) if client_error.requires_reauthentication() => {
            format!("{} {SIGN_IN_HINT}", client_error.user_message())
        }
        Some(client_error) => client_error.user_message(),
        None => format!("{error:#}"),
    }
}
