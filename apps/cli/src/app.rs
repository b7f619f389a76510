//! Command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use assetlane_platform::Client;
use assetlane_publish::{UploadEngine, UploadEvent, UploadTicket};
use assetlane_transfer::DirectTransferClient;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::accounts::TomlAccountStore;
use crate::config::Config;

/// Builds the engine and starts logging its events.
fn build_engine(config: &Config) -> anyhow::Result<UploadEngine> {
    let client = Client::new(config.platform.clone()).context("creating platform client")?;
    let mut engine = UploadEngine::new(
        Arc::new(client),
        Arc::new(TomlAccountStore::new(&config.accounts_file)),
        config.category_map(),
        config.engine_settings(),
    );

    if let Some(mut rx) = engine.take_events() {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    UploadEvent::StateChanged { session_id, state } => {
                        info!(session = %session_id, state = %state, "session state");
                    }
                    UploadEvent::CandidateFailed {
                        session_id,
                        endpoint,
                        error,
                    } => {
                        debug!(session = %session_id, endpoint = %endpoint, error = %error, "candidate skipped");
                    }
                    UploadEvent::TransferProgress {
                        session_id,
                        bytes_sent,
                        total_bytes,
                    } => {
                        debug!(session = %session_id, bytes_sent, total_bytes, "transfer progress");
                    }
                }
            }
        });
    }

    Ok(engine)
}

/// Cancels the returned token on Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling transfer");
            token.cancel();
        }
    });
    cancel
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}

pub async fn publish(
    config: &Config,
    account: &str,
    category: &str,
    file: &Path,
) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    let client = DirectTransferClient::new()?;
    let item = engine
        .publish(account, file, category, &client, &ctrl_c_token())
        .await?;
    print_json(&item)
}

pub async fn prepare(
    config: &Config,
    account: &str,
    category: &str,
    file: &Path,
) -> anyhow::Result<()> {
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no file name", file.display()))?;
    let size = std::fs::metadata(file)
        .with_context(|| format!("reading {}", file.display()))?
        .len();

    let engine = build_engine(config)?;
    let session = engine.prepare(account, file_name, size, category).await?;
    let ticket = session
        .ticket()
        .context("prepared session has no transfer target")?;
    print_json(&ticket)
}

pub async fn finalize(config: &Config, ticket: &Path) -> anyhow::Result<()> {
    let content = if ticket == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("reading ticket from stdin")?
    } else {
        std::fs::read_to_string(ticket)
            .with_context(|| format!("reading ticket {}", ticket.display()))?
    };
    let ticket: UploadTicket = serde_json::from_str(&content).context("parsing ticket")?;

    let engine = build_engine(config)?;
    let outcome = engine.finalize_ticket(ticket.finalize_request()).await;
    print_json(&outcome)?;
    if !outcome.success {
        anyhow::bail!(outcome.message);
    }
    Ok(())
}

pub async fn check_account(config: &Config, account: &str) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    let check = engine.check_account(account).await?;
    print_json(&check)
}

#[derive(Serialize)]
struct CandidateRow<'a> {
    position: usize,
    id: &'a str,
    url: String,
    payload: &'a serde_json::Value,
}

pub fn candidates(config: &Config) -> anyhow::Result<()> {
    let rows: Vec<CandidateRow<'_>> = config
        .candidates
        .iter()
        .enumerate()
        .map(|(i, c)| CandidateRow {
            position: i + 1,
            id: c.id(),
            url: c.resolve_url(&config.platform.base_url),
            payload: &c.payload,
        })
        .collect();
    if rows.is_empty() {
        warn!("no upload candidates configured");
    }
    print_json(&rows)
}

/// Resolves `--config`, falling back to the per-user default.
pub fn config_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(crate::config::default_path)
}
