//! Subcommand handlers.

use std::path::Path;

use futures::future::join_all;
use serde_json::{json, Value};
use tracing::info;

use jobfill_config::Config;
use jobfill_fields::{FieldAutomation, Page};
use jobfill_protocols::{AnswerStore, FieldSnapshot};

use crate::session::Session;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn load_page(path: &Path) -> Result<Page, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(Page::load_json(&content)?)
}

fn load_answers(path: &Path) -> Result<Vec<FieldSnapshot>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json(value: &Value) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Live value for output, masked for sensitive kinds.
fn shown_value(field: &FieldAutomation) -> Option<Value> {
    let value = field.current_value()?;
    if field.kind().is_sensitive() {
        Some(json!("********"))
    } else {
        Some(value)
    }
}

pub(crate) async fn discover(config: &Config, document: &Path) -> CmdResult {
    let session = Session::start(config, load_page(document)?, Vec::new())?;
    let fields = session.discoverer.auto_discover_document();

    let listed: Vec<Value> = fields
        .iter()
        .map(|field| {
            json!({
                "instanceId": field.id(),
                "element": field.element().index(),
                "channel": field.channel_id(),
                "path": field.path(),
            })
        })
        .collect();
    print_json(&Value::Array(listed))
}

pub(crate) async fn snapshot(config: &Config, document: &Path) -> CmdResult {
    let session = Session::start(config, load_page(document)?, Vec::new())?;
    let fields = session.discoverer.auto_discover_document();

    let snapshots: Vec<Value> = fields
        .iter()
        .map(|field| {
            let mut snapshot = serde_json::to_value(field.path())?;
            snapshot["answer"] = shown_value(field).unwrap_or(Value::Null);
            Ok(snapshot)
        })
        .collect::<Result<_, serde_json::Error>>()?;
    print_json(&Value::Array(snapshots))
}

pub(crate) async fn fill(config: &Config, document: &Path, answers: &Path) -> CmdResult {
    let seed = load_answers(answers)?;
    info!("Loaded {} saved answer(s)", seed.len());

    let session = Session::start(config, load_page(document)?, seed)?;
    let fields = session.discoverer.auto_discover_document();
    join_all(fields.iter().map(|field| field.wait_ready())).await;

    let mut report = Vec::with_capacity(fields.len());
    let mut filled_count = 0;
    for field in &fields {
        let filled = field.is_filled().await?;
        if filled {
            filled_count += 1;
        }
        report.push(json!({
            "path": field.path(),
            "state": field.state(),
            "filled": filled,
            "value": shown_value(field),
        }));
    }

    info!(
        "Filled {} of {} field(s) from {} stored answer(s)",
        filled_count,
        fields.len(),
        session.store.len().await?
    );
    print_json(&Value::Array(report))
}
