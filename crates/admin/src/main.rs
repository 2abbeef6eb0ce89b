use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asset_views_core::domain::contract::validate;
use asset_views_core::editor::form::AssetForm;
use asset_views_core::editor::session::{Action, AssetEdit, EditorSession, Outcome};
use asset_views_core::present::card::build_cards;
use asset_views_core::present::chart::SparklineChart;
use asset_views_core::storage::gateway::PersistenceGateway;
use asset_views_core::time::clock::SystemClock;

mod terminal;

#[derive(Debug, Parser)]
#[command(name = "asset_views_admin")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a JSON file against the schema and list every problem.
    Validate { file: PathBuf },

    /// Print the current document as cards.
    Show {
        /// Print the raw document JSON instead.
        #[arg(long)]
        json: bool,
    },

    /// Print a pre-filled edit form (JSON) for one asset.
    Form {
        #[arg(long)]
        id: String,
    },

    /// Apply an edit form (JSON, as printed by `form`) to one asset and save.
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long)]
        form: PathBuf,
    },

    /// Write the current document as pretty JSON.
    Export {
        /// Output file. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace the local override with a validated JSON file.
    Import { file: PathBuf },

    /// Delete the local override and go back to the default dataset.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = asset_views_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // Logs go to stderr so `export` and `show --json` stay pipeable.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(args.command, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
    }
    result
}

async fn run(command: Command, settings: &asset_views_core::config::Settings) -> anyhow::Result<()> {
    let mut session = match &command {
        Command::Validate { file } => return validate_file(file).await,
        _ => open_session(settings).await?,
    };

    match command {
        Command::Validate { .. } => {}
        Command::Show { json } => {
            let doc = session.initialize().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&*doc)?);
            } else {
                for card in build_cards(&doc, &terminal::PlainMarkdown, Some(&SparklineChart)) {
                    println!("{card}");
                }
            }
        }
        Command::Form { id } => {
            session.initialize().await?;
            let form = session
                .form_for(&id)
                .with_context(|| format!("no asset with id {id}"))?;
            println!("{}", serde_json::to_string_pretty(&form)?);
        }
        Command::Edit { id, form: form_path } => {
            session.initialize().await?;
            let text = tokio::fs::read_to_string(&form_path)
                .await
                .with_context(|| format!("failed to read {}", form_path.display()))?;
            let form: AssetForm = serde_json::from_str(&text)
                .with_context(|| format!("{} is not an edit form", form_path.display()))?;
            let outcome = session
                .dispatch(Action::Save(vec![AssetEdit { id, form }]))
                .await;
            report(outcome)?;
        }
        Command::Export { out } => {
            // Export still works without data: it writes the empty placeholder.
            if let Err(e) = session.initialize().await {
                tracing::warn!(error = %e, "exporting without loaded data");
            }
            match session.dispatch(Action::Export).await {
                Outcome::Exported { contents, .. } => match out {
                    Some(path) => {
                        tokio::fs::write(&path, contents)
                            .await
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        eprintln!("Exported JSON file to {}.", path.display());
                    }
                    None => println!("{contents}"),
                },
                other => report(other)?,
            }
        }
        Command::Import { file } => {
            if let Err(e) = session.initialize().await {
                tracing::warn!(error = %e, "importing without loaded data");
            }
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            report(session.dispatch(Action::Import(text)).await)?;
        }
        Command::Reset => {
            report(session.dispatch(Action::Reset).await)?;
        }
    }

    Ok(())
}

async fn open_session(
    settings: &asset_views_core::config::Settings,
) -> anyhow::Result<EditorSession> {
    let gateway = PersistenceGateway::from_settings(settings).await?;
    Ok(EditorSession::new(gateway, Arc::new(SystemClock)))
}

async fn validate_file(file: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not JSON", file.display()))?;

    let report = validate(&value);
    if report.is_ok() {
        println!("{}: ok", file.display());
        return Ok(());
    }
    for error in &report.errors {
        println!("{error}");
    }
    anyhow::bail!("{} has {} problem(s)", file.display(), report.errors.len())
}

fn report(outcome: Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Rejected { errors } => {
            for error in &errors {
                eprintln!("{error}");
            }
            anyhow::bail!("rejected with {} problem(s)", errors.len())
        }
        Outcome::Failed { message } => anyhow::bail!(message),
        ok => {
            eprintln!("{}", ok.status());
            Ok(())
        }
    }
}

fn init_sentry(settings: &asset_views_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
