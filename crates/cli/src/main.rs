#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use topo_api::{ErrorReply, Expansion, ReconcileConfig, ReconcileError, ReconcileResult, Reconciler, TopologyReconciler};

#[derive(Parser, Debug)]
#[command(name = "topoctl", version, about = "Expand Topology documents into Node and Link resources")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Reject documents larger than this many bytes
    #[arg(long = "max-input-bytes", env = "TOPO_MAX_INPUT_BYTES", global = true)]
    max_input_bytes: Option<usize>,

    /// Reject documents with more than this many JSON values
    #[arg(long = "max-document-nodes", env = "TOPO_MAX_DOCUMENT_NODES", global = true)]
    max_document_nodes: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Expand a Topology (JSON or YAML) and print the generated resources
    Expand {
        /// Path to the Topology document
        file: PathBuf,
    },
    /// Validate a Topology and print the issue report only
    Check {
        /// Path to the Topology document
        file: PathBuf,
    },
}

fn init_tracing() {
    let env = std::env::var("TOPO_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Format { Json, Yaml }

fn detect_format(path: &Path, raw: &[u8]) -> Format {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("json") => Format::Json,
        Some("yaml") | Some("yml") => Format::Yaml,
        _ => {
            // Sniff: JSON documents open with an object or array
            match raw.iter().find(|b| !b.is_ascii_whitespace()) {
                Some(b'{') | Some(b'[') => Format::Json,
                _ => Format::Yaml,
            }
        }
    }
}

fn run(reconciler: &TopologyReconciler, path: &Path) -> Result<ReconcileResult> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let format = detect_format(path, &raw);
    info!(file = %path.display(), ?format, bytes = raw.len(), "reconcile invoked");
    let res = match format {
        Format::Json => reconciler.reconcile(&raw),
        Format::Yaml => {
            let max = reconciler.config().max_input_bytes;
            if raw.len() > max {
                Err(ReconcileError::MalformedInput(format!("input too large (>{} bytes)", max)))
            } else {
                match serde_yaml::from_slice::<serde_json::Value>(&raw) {
                    Ok(doc) => reconciler.reconcile_value(doc),
                    Err(e) => Err(ReconcileError::MalformedInput(format!("invalid YAML: {}", e))),
                }
            }
        }
    };
    Ok(res)
}

fn print_reply(output: Output, reply: &ErrorReply) -> Result<()> {
    match output {
        Output::Human => eprintln!("error (code {}): {}", reply.code, reply.message),
        Output::Json => println!("{}", serde_json::to_string_pretty(reply)?),
    }
    Ok(())
}

struct Row<'a> {
    kind: &'a str,
    namespace: &'a str,
    name: &'a str,
    detail: String,
}

fn rows(exp: &Expansion) -> Vec<Row<'_>> {
    let mut out = Vec::with_capacity(exp.nodes.len() + exp.links.len());
    for n in &exp.nodes {
        let detail = n
            .spec
            .as_ref()
            .map(|s| format!("{} {}", s.infra.model.type_, s.infra.admin_state))
            .unwrap_or_default();
        out.push(Row {
            kind: &n.kind,
            namespace: n.metadata.namespace.as_deref().unwrap_or(""),
            name: n.metadata.name.as_deref().unwrap_or(""),
            detail,
        });
    }
    for l in &exp.links {
        let detail = l
            .spec
            .as_ref()
            .map(|s| format!("{} <-> {}", s.endpoints[0].name_parts().join("."), s.endpoints[1].name_parts().join(".")))
            .unwrap_or_default();
        out.push(Row {
            kind: &l.kind,
            namespace: l.metadata.namespace.as_deref().unwrap_or(""),
            name: l.metadata.name.as_deref().unwrap_or(""),
            detail,
        });
    }
    out
}

fn exit_code(reply: &ErrorReply) -> i32 {
    // Reply codes start at 0 (internal); keep every failure non-zero
    reply.code as i32 + 1
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let defaults = ReconcileConfig::from_env();
    let config = ReconcileConfig {
        max_input_bytes: cli.max_input_bytes.unwrap_or(defaults.max_input_bytes),
        max_document_nodes: cli.max_document_nodes.unwrap_or(defaults.max_document_nodes),
    };
    debug!(?config, "reconcile budgets");
    let reconciler = TopologyReconciler::new(config);

    match cli.command {
        Commands::Expand { file } => match run(&reconciler, &file)? {
            Ok(outcome) => match cli.output {
                Output::Human => {
                    println!("KIND  NAMESPACE/NAME                          DETAIL");
                    for r in rows(&outcome.result) {
                        println!("{:<5} {:<39} {}", r.kind, format!("{}/{}", r.namespace, r.name), r.detail);
                    }
                    println!("requeue after {}s", outcome.requeue_after.as_secs());
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            },
            Err(e) => {
                let reply = e.reply();
                print_reply(cli.output, &reply)?;
                std::process::exit(exit_code(&reply));
            }
        },
        Commands::Check { file } => match run(&reconciler, &file)? {
            Ok(outcome) => match cli.output {
                Output::Human => println!(
                    "OK ({} nodes, {} links)",
                    outcome.result.nodes.len(),
                    outcome.result.links.len()
                ),
                Output::Json => println!("{}", serde_json::json!({"ok": true, "issues": []})),
            },
            Err(e) => {
                let reply = e.reply();
                match (&e, cli.output) {
                    (ReconcileError::ValidationFailed(errs), Output::Human) => {
                        for issue in errs {
                            println!("{}", issue);
                        }
                    }
                    (ReconcileError::ValidationFailed(errs), Output::Json) => {
                        println!("{}", serde_json::to_string_pretty(&serde_json::json!({"ok": false, "issues": errs}))?)
                    }
                    _ => print_reply(cli.output, &reply)?,
                }
                std::process::exit(exit_code(&reply));
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension_then_content() {
        assert_eq!(detect_format(Path::new("t.json"), b"kind: Topology"), Format::Json);
        assert_eq!(detect_format(Path::new("t.YML"), b"{}"), Format::Yaml);
        assert_eq!(detect_format(Path::new("topo"), b"  \n{\"kind\": 1}"), Format::Json);
        assert_eq!(detect_format(Path::new("topo"), b"kind: Topology\n"), Format::Yaml);
    }

    #[test]
    fn yaml_documents_reconcile_like_json() {
        let dir = std::env::temp_dir().join(format!("topoctl-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fabric.yaml");
        std::fs::write(
            &path,
            "metadata:\n  name: fabric1\nspec:\n  defaults:\n    type: ixr-d3\n  nodes:\n    - name: leaf1\n    - name: leaf2\n  links:\n    - endpoints:\n        - {node: leaf1, port: 1}\n        - {node: leaf2, port: 1}\n",
        )
        .unwrap();
        let out = run(&TopologyReconciler::default(), &path).unwrap().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(out.result.nodes.len(), 2);
        let rows = rows(&out.result);
        assert_eq!(rows[2].name, "fabric1.leaf1.1.leaf2.1");
        assert_eq!(rows[2].namespace, "default");
        assert_eq!(rows[0].detail, "ixr-d3 enable");
    }

    #[test]
    fn every_failure_exits_non_zero() {
        for code in 0..=2 {
            assert!(exit_code(&ErrorReply { code, message: String::new() }) > 0);
        }
    }
}
