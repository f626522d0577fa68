//! madea-blog - serve a markdown blog from a GitHub repository or a local directory
//!
//! # Usage
//! ```bash
//! madea-blog --username jamierpond                    # GitHub repo jamierpond/madea.blog
//! madea-blog --provider local --content-dir ./posts   # Local directory
//! madea-blog --subdomain-routing                      # <user>.example.com → user's blog
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use madea_blog::provider::DataProvider;
use madea_blog::routes::{self, pages, AppState, Owners, Site};
use madea_blog::{ConfigError, GitHubDataProvider, GitHubOptions, LocalFsDataProvider, LocalFsOptions, SeoConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProviderKind {
    Github,
    Local,
}

/// madea-blog - Serve a markdown blog from git
#[derive(Parser)]
#[command(name = "madea-blog")]
#[command(about = "Serve a markdown blog from a GitHub repository or a local directory", long_about = None)]
struct Cli {
    /// Where content comes from
    #[arg(long, value_enum, default_value = "github")]
    provider: ProviderKind,

    /// Blog owner (GitHub account for the github provider)
    #[arg(long, env = "MADEA_USERNAME")]
    username: Option<String>,

    /// Repository holding the content
    #[arg(long, default_value = "madea.blog")]
    repo: String,

    /// GitHub token; falls back to GITHUB_PAT
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Only serve markdown below this repository directory
    #[arg(long)]
    sub_dir: Option<String>,

    /// Content directory for the local provider
    #[arg(long, default_value = ".")]
    content_dir: PathBuf,

    /// Author shown for local content without git history
    #[arg(long)]
    author_name: Option<String>,

    /// Source link for local content
    #[arg(long)]
    source_url: Option<String>,

    /// Public site URL used in canonical links and feeds
    #[arg(long, default_value = "http://127.0.0.1:3001")]
    base_url: String,

    #[arg(long, default_value = "madea.blog")]
    site_name: String,

    #[arg(long, default_value = "Blog posts written in markdown")]
    site_description: String,

    /// Path pages are served under
    #[arg(long, default_value = "/blog")]
    base_path: String,

    #[arg(long)]
    twitter_handle: Option<String>,

    /// Take the blog owner from the request subdomain
    #[arg(long)]
    subdomain_routing: bool,

    /// Port to run the server on
    #[arg(short, long, default_value = "3001")]
    port: u16,
}

fn github_options(cli: &Cli, username: &str, token: Option<String>) -> GitHubOptions {
    GitHubOptions::new(username, cli.repo.clone())
        .with_token(token)
        .with_sub_dir(cli.sub_dir.clone())
}

fn build_owners(cli: &Cli) -> anyhow::Result<Owners> {
    let token = cli.token.clone().or_else(|| std::env::var("GITHUB_PAT").ok());

    if cli.subdomain_routing {
        if cli.provider != ProviderKind::Github {
            bail!("--subdomain-routing requires the github provider");
        }

        let repo = cli.repo.clone();
        let sub_dir = cli.sub_dir.clone();
        return Ok(Owners::subdomain(Box::new(
            move |username: &str| -> Result<Arc<dyn DataProvider>, ConfigError> {
                let options = GitHubOptions::new(username, repo.clone())
                    .with_token(token.clone())
                    .with_sub_dir(sub_dir.clone());
                let provider = GitHubDataProvider::new(options)?;
                Ok(Arc::new(provider))
            },
        )));
    }

    match cli.provider {
        ProviderKind::Github => {
            let username = cli
                .username
                .clone()
                .context("--username is required for the github provider")?;
            let provider = GitHubDataProvider::new(github_options(cli, &username, token))?;
            Ok(Owners::single(username, Arc::new(provider)))
        }
        ProviderKind::Local => {
            let options = LocalFsOptions::new(&cli.content_dir)
                .with_author_name(cli.author_name.clone())
                .with_source_url(cli.source_url.clone());
            let provider = LocalFsDataProvider::new(options)?;
            let username = cli
                .username
                .clone()
                .or_else(|| cli.author_name.clone())
                .unwrap_or_else(|| "local".to_string());
            Ok(Owners::single(username, Arc::new(provider)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (quieter for production)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let owners = build_owners(&cli)?;

    let site = Site {
        seo: SeoConfig {
            base_url: cli.base_url.trim_end_matches('/').to_string(),
            site_name: cli.site_name.clone(),
            default_description: Some(cli.site_description.clone()),
            twitter_handle: cli.twitter_handle.clone(),
            author_name: cli.author_name.clone(),
            ..SeoConfig::default()
        },
        description: cli.site_description.clone(),
        base_path: cli.base_path.clone(),
    };

    let state = Arc::new(AppState {
        owners,
        site,
        views: pages::json_views(),
    });

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to port {} (try --port <PORT>)", cli.port))?;

    tracing::info!("Serving blog on http://{}{}", addr, cli.base_path);
    println!();
    println!("  madea-blog");
    println!();
    println!("  Server:  http://{}{}", addr, cli.base_path);
    println!("  Source:  {:?}", cli.provider);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
