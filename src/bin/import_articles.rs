//! Bulk import of an article file from the command line.
//!
//! Usage: `cliniclane-import articles.json [--commit] [--language german] [--as admin@example.com]`
//!
//! Runs the same normalization and validation as `POST /api/v1/articles/import`.
//! Without `--commit` nothing is written and the preview is printed.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cliniclane::{
    api,
    config::Config,
    db::{
        self,
        repositories::{SqlxUserRepository, UserRepository},
    },
    services::{ImportMode, ImportOptions, ImportResult},
};

#[derive(Parser)]
#[command(name = "cliniclane-import")]
#[command(about = "Import articles from a JSON, JSON Lines or Python-literal file")]
struct Cli {
    /// File to import
    file: PathBuf,

    /// Write the batch instead of previewing it
    #[arg(long)]
    commit: bool,

    /// Language forced onto every base article
    #[arg(long)]
    language: Option<String>,

    /// Email of the importing user; defaults to the first super-admin
    #[arg(long = "as", value_name = "EMAIL")]
    actor: Option<String>,

    /// Configuration file
    #[arg(long, env = "CLINICLANE_CONFIG", default_value = "config.yml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cliniclane=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load_with_env(&cli.config)?;

    let input = tokio::fs::read_to_string(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let users = SqlxUserRepository::boxed(pool.clone());
    let state = api::build_state(pool, config)?;
    state
        .language_service
        .seed_defaults(&state.config.site.locales)
        .await?;

    let actor = match &cli.actor {
        Some(email) => users
            .get_by_email(email)
            .await?
            .with_context(|| format!("No user with email {}", email))?,
        None => match users.list().await?.into_iter().find(|u| u.is_super_admin()) {
            Some(user) => user,
            None => bail!("No super-admin exists yet; register one first"),
        },
    };

    let options = ImportOptions {
        mode: if cli.commit {
            ImportMode::Commit
        } else {
            ImportMode::Preview
        },
        language: cli.language,
    };

    let result = state.import_service.run(&actor, &input, &options).await?;
    match &result {
        ImportResult::Preview(preview) => {
            tracing::info!(
                "Preview: {} articles, {} translations, clean: {}",
                preview.articles.len(),
                preview.translations.len(),
                preview.issues.is_clean()
            );
        }
        ImportResult::Commit(report) => {
            tracing::info!(
                "Imported {} articles and {} translations as {}",
                report.created.len(),
                report.translations,
                actor.email
            );
        }
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
