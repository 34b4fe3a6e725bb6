//! CLI entry point for safetypin.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use safetypin::{Jcr, Node, PropertyReplacement, Query, QueryBuilder, Value};
use safetypin_core::JcrConfig;
use safetypin_jcr::MemoryRepository;

#[derive(Parser)]
#[command(name = "safetypin")]
#[command(about = "Query and edit JCR content")]
struct Cli {
    /// Config file prefix (default: safetypin).
    #[arg(short, long, default_value = "safetypin")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the JCR-SQL2 statement for a fluent query.
    Sql {
        /// Node type to select (default nt:base).
        #[arg(short = 't', long = "type")]
        node_type: Option<String>,

        /// Equality condition, `name=value`. Repeatable.
        #[arg(short = 'w', long = "where", value_parser = parse_pair)]
        conditions: Vec<(String, String)>,

        /// Path prefix to search within. Repeatable.
        #[arg(long)]
        within: Vec<String>,
    },

    /// Run a JCR-SQL2 statement against a content snapshot.
    Query {
        statement: String,

        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Print a node's properties from a content snapshot as JSON.
    Show {
        path: String,

        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Rewrite matching string properties in a content snapshot.
    Replace {
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Node to start from.
        #[arg(long, default_value = "/")]
        root: String,

        /// Property name pattern (regex).
        #[arg(long)]
        name: String,

        /// Property value pattern (regex).
        #[arg(long)]
        target: String,

        /// New value; parsed as JSON when possible, otherwise a string.
        #[arg(long = "with")]
        replacement: String,

        /// Descend into child nodes.
        #[arg(short, long)]
        recursive: bool,

        /// Write the edited snapshot here. Without it nothing is written.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Query the search service; prints hit paths.
    Search {
        /// Query parameter, `name=value`. Repeatable, order kept.
        #[arg(value_parser = parse_pair, required = true)]
        params: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = JcrConfig::load(&cli.config)?;

    match cli.command {
        Command::Sql {
            node_type,
            conditions,
            within,
        } => {
            println!("{}", render_sql(node_type, conditions, within));
        }
        Command::Query {
            statement,
            snapshot,
        } => {
            let (_repo, jcr) = open_snapshot(&snapshot, &config).await?;
            for node in Query::execute_sql(&jcr, &statement).await? {
                println!("{}", node.path());
            }
        }
        Command::Show { path, snapshot } => {
            let (_repo, jcr) = open_snapshot(&snapshot, &config).await?;
            let node = Node::find(&jcr, &path)
                .await?
                .with_context(|| format!("No node at {path}"))?;
            println!("{}", serde_json::to_string_pretty(&describe(&node).await?)?);
        }
        Command::Replace {
            snapshot,
            root,
            name,
            target,
            replacement,
            recursive,
            out,
        } => {
            let rule = PropertyReplacement::new(&name, &target)?
                .with_value(parse_value(&replacement)?);
            let modified =
                replace_in_snapshot(&snapshot, &config, &root, &rule, recursive, out.as_deref())
                    .await?;
            for path in modified {
                println!("{path}");
            }
        }
        Command::Search { params } => {
            let builder = QueryBuilder::new(&config)?;
            for path in builder.fetch_paths(params).await? {
                println!("{path}");
            }
        }
    }

    Ok(())
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got {s:?}"))
}

fn parse_value(raw: &str) -> anyhow::Result<Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Ok(Value::try_from(json)?),
        Err(_) => Ok(Value::from(raw)),
    }
}

fn render_sql(
    node_type: Option<String>,
    conditions: Vec<(String, String)>,
    within: Vec<String>,
) -> String {
    let mut query = Query::new().where_equal(conditions).within(within);
    if let Some(node_type) = node_type {
        query = query.of_type(node_type);
    }
    query.sql()
}

async fn open_snapshot(
    snapshot: &Path,
    config: &JcrConfig,
) -> anyhow::Result<(MemoryRepository, Jcr)> {
    let raw = std::fs::read_to_string(snapshot)
        .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Snapshot {} is not valid JSON", snapshot.display()))?;
    let repo = MemoryRepository::from_json(&json)?;
    let jcr = Jcr::login(&repo, config).await?;
    tracing::info!(snapshot = %snapshot.display(), "Loaded content snapshot");
    Ok((repo, jcr))
}

async fn describe(node: &Node) -> anyhow::Result<serde_json::Value> {
    let to_json = |props: std::collections::BTreeMap<String, Value>| {
        props
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect::<serde_json::Map<_, _>>()
    };
    Ok(serde_json::json!({
        "path": node.path(),
        "primaryType": node.primary_type().await?,
        "properties": to_json(node.properties().await?),
        "protected": to_json(node.protected_properties().await?),
        "children": node
            .children()
            .await?
            .iter()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>(),
    }))
}

async fn replace_in_snapshot(
    snapshot: &Path,
    config: &JcrConfig,
    root: &str,
    rule: &PropertyReplacement,
    recursive: bool,
    out: Option<&Path>,
) -> anyhow::Result<Vec<String>> {
    let (repo, jcr) = open_snapshot(snapshot, config).await?;
    let root = Node::find(&jcr, root)
        .await?
        .with_context(|| format!("No node at {root}"))?;
    let modified = root.replace_property(rule, recursive).await?;
    tracing::info!(modified = modified.len(), "Replacement finished");

    if let Some(out) = out {
        jcr.save().await?;
        let exported = repo.to_json("/")?;
        std::fs::write(out, serde_json::to_string_pretty(&exported)?)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        tracing::info!(out = %out.display(), "Wrote edited snapshot");
    }
    Ok(modified.iter().map(|n| n.path().to_string()).collect())
}
