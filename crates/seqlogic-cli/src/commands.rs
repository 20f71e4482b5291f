//! Command implementations.

use crate::config::CliConfig;
use anyhow::{bail, Context, Result};
use seqlogic_core::{
    CollectingNotifier, Diagram, DiagramServices, DiagramStorage, FixedTime, MergedIds,
    PoweredKind,
};
use seqlogic_library::{LibraryClient, LibraryClientConfig, LibraryIndexes};
use seqlogic_proto::{decode_json, encode_json, Clipboard};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Read a diagram file. `.cbor` files hold a clipboard envelope, anything
/// else a JSON document.
pub fn load_storage(path: &Path) -> Result<DiagramStorage> {
    if is_cbor(path) {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let clipboard = Clipboard::from_cbor(&bytes)
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        return Ok(clipboard.into_storage());
    }
    let json =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_json(&json).with_context(|| format!("Failed to decode {}", path.display()))
}

/// Write a diagram file in the format implied by its extension.
pub fn write_storage(path: &Path, storage: &DiagramStorage) -> Result<()> {
    if is_cbor(path) {
        let bytes = Clipboard::new(storage.clone()).to_cbor()?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    } else {
        let json = encode_json(storage)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    tracing::debug!(path = %path.display(), "Wrote diagram");
    Ok(())
}

fn is_cbor(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "cbor")
}

/// Build collaborators from configuration, collecting notifications.
pub fn services(config: &CliConfig) -> (DiagramServices, CollectingNotifier) {
    let notifier = CollectingNotifier::new();
    let mut services = match config.seed {
        Some(seed) => DiagramServices::seeded(seed),
        None => DiagramServices::default(),
    }
    .with_notifier(notifier.clone());
    if let Some(elapsed) = config.elapsed_ms {
        services = services.with_time(FixedTime(elapsed));
    }
    (services, notifier)
}

/// Load `storage` into a diagram, failing if it was rejected.
fn open(storage: DiagramStorage, config: &CliConfig) -> Result<(Diagram, CollectingNotifier)> {
    let (services, notifier) = services(config);
    let diagram = Diagram::with_services(storage, services);
    let rejected = notifier.drain();
    if !rejected.is_empty() {
        bail!("{}", rejected.join("; "));
    }
    Ok((diagram, notifier))
}

/// Validate a diagram file and summarize it.
pub fn check(path: &Path, config: &CliConfig) -> Result<Value> {
    let storage = load_storage(path)?;
    storage
        .validate_wires()
        .with_context(|| format!("Invalid wires in {}", path.display()))?;

    let mut kinds = serde_json::Map::new();
    for kind in PoweredKind::ALL {
        let count = storage
            .nodes
            .values()
            .filter(|n| n.powered.kind() == kind)
            .count();
        kinds.insert(kind.to_string(), json!(count));
    }

    let (diagram, _) = open(storage, config)?;
    Ok(json!({
        "nodes": diagram.nodes().len(),
        "wires": diagram.wires().len(),
        "texts": diagram.texts().len(),
        "groups": diagram.group_count(),
        "powered": kinds,
    }))
}

/// Run the diagram for `config.ticks` ticks and report the final outputs.
pub fn simulate(path: &Path, config: &CliConfig) -> Result<Value> {
    let storage = load_storage(path)?;
    let (mut diagram, _) = open(storage, config)?;

    let mut flips = 0;
    let mut settled_at = None;
    for _ in 0..config.ticks {
        if diagram.pending_toggles() == 0 {
            settled_at = Some(diagram.current_tick());
            break;
        }
        flips += diagram.next_tick();
    }
    if settled_at.is_none() && diagram.pending_toggles() == 0 {
        settled_at = Some(diagram.current_tick());
    }
    tracing::info!(
        ticks = diagram.current_tick(),
        flips,
        settled = settled_at.is_some(),
        "Simulation finished"
    );

    let active: serde_json::Map<String, Value> = diagram
        .nodes()
        .keys()
        .map(|id| (id.clone(), json!(diagram.is_active(id))))
        .collect();
    Ok(json!({
        "ticks": diagram.current_tick(),
        "flips": flips,
        "settled_at": settled_at,
        "pending": diagram.pending_toggles(),
        "active": active,
    }))
}

/// Paste `clip` into `base` and write the result to `out`.
pub fn merge(base: &Path, clip: &Path, out: &Path, config: &CliConfig) -> Result<MergedIds> {
    let (mut diagram, notifier) = open(load_storage(base)?, config)?;
    let incoming = load_storage(clip)?;

    let Some(merged) = diagram.merge(&incoming) else {
        bail!(
            "Cannot merge {}: {}",
            clip.display(),
            notifier.drain().join("; ")
        );
    };
    write_storage(out, &diagram.to_storage())?;
    tracing::info!(
        nodes = merged.nodes.len(),
        wires = merged.wires.len(),
        texts = merged.texts.len(),
        out = %out.display(),
        "Merged diagram"
    );
    Ok(merged)
}

/// Copy the listed nodes and texts of `path` into `out`.
pub fn extract(
    path: &Path,
    node_ids: &[String],
    text_ids: &[String],
    out: &Path,
    config: &CliConfig,
) -> Result<DiagramStorage> {
    let (diagram, _) = open(load_storage(path)?, config)?;
    let nodes: HashSet<String> = node_ids.iter().cloned().collect();
    let texts: HashSet<String> = text_ids.iter().cloned().collect();
    for id in &nodes {
        if !diagram.nodes().has(id) {
            bail!("Unknown node {id}");
        }
    }
    for id in &texts {
        if !diagram.texts().has(id) {
            bail!("Unknown text {id}");
        }
    }

    let extracted = diagram.extract(&nodes, &texts);
    write_storage(out, &extracted)?;
    Ok(extracted)
}

fn client(config: &CliConfig) -> Result<LibraryClient> {
    LibraryClient::new(LibraryClientConfig {
        base_url: config.library_url.clone(),
        timeout: config.http_timeout,
    })
    .context("Failed to create library client")
}

/// List both library indexes.
pub async fn list(config: &CliConfig) -> Result<LibraryIndexes> {
    client(config)?
        .indexes()
        .await
        .context("Failed to fetch library indexes")
}

/// Fetch a sample by name and write it to `out`.
pub async fn fetch_sample(name: &str, out: &Path, config: &CliConfig) -> Result<DiagramStorage> {
    let client = client(config)?;
    let index = client
        .samples_index()
        .await
        .context("Failed to fetch samples index")?;
    let Some(url) = index.get(name) else {
        bail!("Unknown sample {name}");
    };
    let storage = client
        .sample(url)
        .await
        .with_context(|| format!("Failed to fetch sample {name}"))?;
    write_storage(out, &storage)?;
    Ok(storage)
}

/// Fetch a unit by name and write it to `out`.
pub async fn fetch_unit(name: &str, out: &Path, config: &CliConfig) -> Result<DiagramStorage> {
    let storage = client(config)?
        .unit(name)
        .await
        .with_context(|| format!("Failed to fetch unit {name}"))?;
    write_storage(out, &storage)?;
    Ok(storage)
}
