//! `weblib` command-line client.

mod host;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result, anyhow},
    clap::{ArgAction, Parser, Subcommand},
    tracing::{debug, info},
    tracing_subscriber::EnvFilter,
    weblib_backend::{DEFAULT_NUM_RESULTS, HttpBackend, SearchQuery},
    weblib_common::ItemList,
    weblib_config::WeblibConfig,
    weblib_oauth::{ItemRenderer, LoginFlow, Prompt, oidc_config, start_callback_server},
};

use crate::host::{SystemBrowser, TerminalRenderer};

#[derive(Parser, Debug)]
#[command(name = "weblib", version, about = "Browse and save items from the weblib library")]
struct Cli {
    /// Config file (TOML, YAML or JSON). Defaults to the user config directory.
    #[arg(long, global = true, env = "WEBLIB_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in with a Microsoft account and load your lists
    Login {
        /// Skip the silent attempt and ask the provider to show the account picker
        #[arg(long)]
        interactive: bool,
    },
    /// Sign out of the backend and the identity provider
    Logout,
    /// Search the library
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_NUM_RESULTS)]
        num_results: u32,
        /// Search filter as NAME=VALUE, repeatable
        #[arg(long = "filter", value_name = "NAME=VALUE", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Add an item to your saved list
    Save { id: String },
    /// Remove an item from your saved list
    Unsave { id: String },
    /// Record that you opened an item
    View { id: String },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        },
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = weblib_config::discover_and_load(cli.config.as_deref())
        .context("failed to load configuration")?;
    debug!(backend = %config.backend.base_url, "configuration loaded");
    let backend = Arc::new(HttpBackend::from_config(&config.backend)?);

    match cli.command {
        Commands::Login { interactive } => login(&config, backend, interactive).await,
        Commands::Logout => logout(&config, backend).await,
        Commands::Search {
            query,
            num_results,
            filters,
        } => {
            let mut search = SearchQuery::new(query);
            search.num_results = num_results;
            search.filters = filters.into_iter().collect();
            search_items(&config, &backend, &search).await
        },
        Commands::Save { id } => backend
            .save(&id)
            .await
            .map(|()| println!("Saved {id}."))
            .map_err(|e| anyhow!(e.user_message("save"))),
        Commands::Unsave { id } => backend
            .unsave(&id)
            .await
            .map(|()| println!("Removed {id} from saved."))
            .map_err(|e| anyhow!(e.user_message("unsave"))),
        Commands::View { id } => {
            backend.record_view(&id).await;
            Ok(())
        },
    }
}

fn login_flow(config: &WeblibConfig, backend: Arc<HttpBackend>) -> LoginFlow {
    LoginFlow::new(
        oidc_config(config),
        Arc::new(SystemBrowser),
        backend,
        Arc::new(TerminalRenderer::new(&config.backend.base_url)),
    )
}

async fn login(config: &WeblibConfig, backend: Arc<HttpBackend>, interactive: bool) -> Result<()> {
    let mut flow = login_flow(config, backend);
    let (server, mut messages) = start_callback_server(config, flow.config()).await?;

    let prompt = if interactive {
        Prompt::SelectAccount
    } else {
        Prompt::None
    };
    let outcome = match flow.initiate(prompt) {
        Ok(()) => {
            let finished = tokio::select! {
                step = flow.run(&mut messages) => Some(step.map(|_| ())),
                _ = tokio::signal::ctrl_c() => None,
            };
            finished.unwrap_or_else(|| Err(flow.cancel()))
        },
        Err(e) => Err(e),
    };
    server.shutdown().await;

    outcome.context("login did not complete")?;
    info!(state = ?flow.state(), "login finished");
    Ok(())
}

async fn logout(config: &WeblibConfig, backend: Arc<HttpBackend>) -> Result<()> {
    login_flow(config, backend).logout().await?;
    Ok(())
}

async fn search_items(
    config: &WeblibConfig,
    backend: &HttpBackend,
    query: &SearchQuery,
) -> Result<()> {
    let items = backend
        .search(query)
        .await
        .map_err(|e| anyhow!(e.user_message("search")))?;
    let renderer = TerminalRenderer::new(&config.backend.base_url);
    renderer.clear_list(ItemList::SearchResults);
    if items.is_empty() {
        println!("No results for '{}'.", query.query);
    }
    for item in &items {
        renderer.append_item(ItemList::SearchResults, item);
    }
    Ok(())
}
