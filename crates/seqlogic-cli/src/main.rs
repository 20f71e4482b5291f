//! # seqlogic CLI
//!
//! Check, simulate, merge and extract diagram files, and fetch documents
//! from a sample and unit library.

use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = CliConfig::from_env()?;
    let raw: Vec<String> = env::args().skip(1).collect();
    let args = config.apply_flags(&raw)?;

    let Some(command) = args.first() else {
        print_help();
        return Ok(());
    };
    let operands = &args[1..];

    tracing::debug!(command = %command, ?config, "Running command");

    match command.as_str() {
        "check" => {
            let [path] = operands else {
                usage("check <diagram>");
            };
            print_json(&commands::check(Path::new(path), &config)?)?;
        }
        "simulate" => {
            let [path] = operands else {
                usage("simulate <diagram> [--ticks N] [--seed N] [--elapsed-ms T]");
            };
            print_json(&commands::simulate(Path::new(path), &config)?)?;
        }
        "merge" => {
            let [base, clip, out] = operands else {
                usage("merge <diagram> <clipboard> <out>");
            };
            let merged =
                commands::merge(Path::new(base), Path::new(clip), Path::new(out), &config)?;
            println!(
                "Merged {} nodes, {} wires, {} texts into {out}",
                merged.nodes.len(),
                merged.wires.len(),
                merged.texts.len()
            );
        }
        "extract" => {
            let [path, out, ids @ ..] = operands else {
                usage("extract <diagram> <out> <node-id>... [-- <text-id>...]");
            };
            let (node_ids, text_ids) = split_ids(ids);
            let extracted =
                commands::extract(Path::new(path), &node_ids, &text_ids, Path::new(out), &config)?;
            println!(
                "Extracted {} nodes, {} wires, {} texts into {out}",
                extracted.nodes.len(),
                extracted.wires.len(),
                extracted.texts.len()
            );
        }
        "list" => {
            let indexes = commands::list(&config).await?;
            println!("Samples:");
            for (name, url) in indexes.samples.iter() {
                println!("    {name}  {url}");
            }
            println!("Units:");
            for name in indexes.units.names() {
                println!("    {name}");
            }
        }
        "fetch-sample" => {
            let [name, out] = operands else {
                usage("fetch-sample <name> <out>");
            };
            commands::fetch_sample(name, Path::new(out), &config).await?;
            println!("Saved sample {name} to {out}");
        }
        "fetch-unit" => {
            let [name, out] = operands else {
                usage("fetch-unit <name> <out>");
            };
            commands::fetch_unit(name, Path::new(out), &config).await?;
            println!("Saved unit {name} to {out}");
        }
        "popular" => {
            for name in seqlogic_proto::popular_units() {
                println!("{name}");
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn usage(synopsis: &str) -> ! {
    eprintln!("Usage: seqlogic {synopsis}");
    std::process::exit(1);
}

/// Node ids come first; ids after a `--` separator are text ids.
fn split_ids(ids: &[String]) -> (Vec<String>, Vec<String>) {
    match ids.iter().position(|id| id == "--") {
        Some(at) => (ids[..at].to_vec(), ids[at + 1..].to_vec()),
        None => (ids.to_vec(), Vec::new()),
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format output")?;
    println!("{text}");
    Ok(())
}

fn print_help() {
    println!(
        r#"seqlogic CLI

USAGE:
    seqlogic <COMMAND> [OPTIONS]

COMMANDS:
    check <diagram>                     Validate a diagram and summarize it
    simulate <diagram>                  Run ticks and print every node's output
    merge <diagram> <clipboard> <out>   Paste a clipboard into a diagram
    extract <diagram> <out> <ids>...    Copy nodes (and texts after --) to a file
    list                                List library samples and units
    fetch-sample <name> <out>           Download a sample
    fetch-unit <name> <out>             Download a unit
    popular                             Show popular unit names
    help                                Show this help message

OPTIONS:
    --library <url>      Library root (SEQLOGIC_LIBRARY_URL)
    --ticks <n>          Ticks to simulate (SEQLOGIC_TICKS, default 64)
    --seed <n>           Random seed (SEQLOGIC_SEED)
    --elapsed-ms <t>     Fixed clock time (SEQLOGIC_ELAPSED_MS)
    --timeout <secs>     HTTP timeout (SEQLOGIC_HTTP_TIMEOUT_SECS, default 30)

Files ending in .cbor hold a clipboard envelope; anything else is JSON.

EXAMPLES:
    seqlogic simulate latch.json --ticks 200 --seed 7
    seqlogic extract latch.json part.cbor n1 n2 -- t1
    seqlogic fetch-unit d-latch latch.json
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn ids_split_on_separator() {
        let (nodes, texts) = split_ids(&strings(&["a", "b", "--", "t"]));
        assert_eq!(nodes, strings(&["a", "b"]));
        assert_eq!(texts, strings(&["t"]));

        let (nodes, texts) = split_ids(&strings(&["a"]));
        assert_eq!(nodes, strings(&["a"]));
        assert!(texts.is_empty());
    }
}
