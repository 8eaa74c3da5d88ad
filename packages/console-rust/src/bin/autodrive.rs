//! `autodrive`: terminal front end of the dealership admin console.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use autodrive_console::client::ClientProvider;
use autodrive_console::config::ConfigArgs;
use autodrive_console::{
    messages, render, telemetry, CollectionStore, ConfirmOutcome, ConfirmationWorkflow,
    ConsoleConfig, HttpApi, LoadStatus, RecordEditor,
};
use autodrive_core::{Catalog, EntityId};

#[derive(Parser)]
#[command(name = "autodrive")]
#[command(about = "AutoDrive dealership admin console", long_about = None, version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the resource kinds the console manages
    Resources,

    /// List every record of a resource kind
    List {
        /// Resource path segment, e.g. vendas
        resource: String,
    },

    /// Show one record with its references resolved
    Show { resource: String, id: EntityId },

    /// Create a record
    New {
        resource: String,

        /// Field assignment, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },

    /// Change fields of an existing record
    Edit {
        resource: String,
        id: EntityId,

        /// Field assignment, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },

    /// Delete a record after confirmation
    Delete {
        resource: String,
        id: EntityId,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| format!("expected FIELD=VALUE, got {raw:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConsoleConfig::from(cli.config);
    telemetry::init_tracing(config.log_format).context("failed to install log subscriber")?;

    let catalog = Arc::new(Catalog::autodrive().context("resource catalog is inconsistent")?);
    let api = HttpApi::new(&config, Arc::clone(&catalog))?;
    debug!(base_url = %api.base_url(), "console ready");

    match cli.command {
        Command::Resources => {
            for descriptor in catalog.iter() {
                println!("{:<14} {}", descriptor.name(), descriptor.noun().plural);
            }
        }
        Command::List { resource } => list(&api, &resource).await?,
        Command::Show { resource, id } => show(&api, &resource, id).await?,
        Command::New { resource, set } => save(&api, &resource, None, set).await?,
        Command::Edit { resource, id, set } => save(&api, &resource, Some(id), set).await?,
        Command::Delete { resource, id, yes } => delete(&api, &resource, id, yes).await?,
    }
    Ok(())
}

async fn list(api: &HttpApi, resource: &str) -> Result<()> {
    let store = CollectionStore::new(api.client(resource)?);
    if store.load().await == LoadStatus::Failed {
        bail!("{}", store.last_error().unwrap_or_default());
    }
    let descriptor = store.descriptor();
    if store.is_empty() {
        println!("{}", messages::empty_list(descriptor.noun()));
    } else {
        print!("{}", render::table(api.catalog(), descriptor, &store.records()));
    }
    Ok(())
}

async fn show(api: &HttpApi, resource: &str, id: EntityId) -> Result<()> {
    let mut editor = RecordEditor::new(api, resource)?;
    if !editor.load_for_edit(id).await {
        bail!("{}", editor.error().unwrap_or_default());
    }
    print!(
        "{}",
        render::detail(api.catalog(), editor.descriptor(), editor.record())
    );
    Ok(())
}

async fn save(
    api: &HttpApi,
    resource: &str,
    id: Option<EntityId>,
    assignments: Vec<(String, String)>,
) -> Result<()> {
    let mut editor = RecordEditor::new(api, resource)?;
    let loaded = match id {
        Some(id) => editor.load_for_edit(id).await,
        None => editor.load_for_create().await,
    };
    if !loaded {
        bail!("{}", editor.error().unwrap_or_default());
    }

    for (field, value) in assignments {
        editor
            .set_field(&field, value)
            .with_context(|| format!("cannot set {field}"))?;
    }

    match editor.submit().await {
        Ok(outcome) => {
            println!("{}", editor.notice().unwrap_or_default());
            print!(
                "{}",
                render::detail(api.catalog(), editor.descriptor(), outcome.record())
            );
            Ok(())
        }
        Err(err) => bail!("{} ({err})", editor.error().unwrap_or_default()),
    }
}

async fn delete(api: &HttpApi, resource: &str, id: EntityId, yes: bool) -> Result<()> {
    let store = Arc::new(CollectionStore::new(api.client(resource)?));
    if store.load().await == LoadStatus::Failed {
        bail!("{}", store.last_error().unwrap_or_default());
    }
    let noun = *store.descriptor().noun();

    let mut workflow = ConfirmationWorkflow::new(Arc::clone(&store));
    let prompt = workflow
        .request(id)
        .with_context(|| messages::not_found(&noun))?;
    if !yes && !ask(&prompt).await? {
        workflow.cancel();
        println!("Exclusão cancelada.");
        return Ok(());
    }

    match workflow.confirm().await {
        ConfirmOutcome::Removed { message, .. } => println!("{message}"),
        ConfirmOutcome::Failed { message, error, .. } => bail!("{message} ({error})"),
        ConfirmOutcome::NothingPending | ConfirmOutcome::TargetGone(_) => {
            println!("{}", messages::not_found(&noun));
        }
    }
    Ok(())
}

async fn ask(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{prompt} [s/N] ").as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "sim" | "y" | "yes"
    ))
}
