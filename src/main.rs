//! Bridgekit CLI - tools for looking at bridge traffic
//!
//! Commands:
//!   bridgekit inspect <file>  - Decode a wire value and show what it primes
//!   bridgekit fault <text>    - Parse an error sentinel string

use bridgekit::proxy::{Member, ProxyClass};
use bridgekit::{BridgeConfig, EnvelopeBody, TypeDescriptor, WireValue};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "bridgekit")]
#[command(about = "Tools for inspecting remote-object bridge traffic", long_about = None)]
struct Cli {
    /// JSON file with a bridge configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a JSON wire value and list the types, refs and values it carries
    Inspect {
        /// Path to the JSON file ("-" for stdin)
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse an error sentinel string returned by a remote endpoint
    Fault {
        /// The raw string
        text: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bridgekit=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    match cli.command {
        Commands::Inspect { file, json } => inspect_command(&file, json, &config),
        Commands::Fault { text } => fault_command(&text, &config),
    }
}

fn read_input(file: &Path) -> anyhow::Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))
}

/// Everything a wire value would prime on a receiving bridge.
#[derive(Default)]
struct Summary<'a> {
    types: Vec<&'a TypeDescriptor>,
    refs: Vec<(u32, &'a str)>,
    faults: Vec<String>,
}

fn collect<'a>(wire: &'a WireValue, config: &BridgeConfig, summary: &mut Summary<'a>) {
    match wire {
        WireValue::String(text) => {
            if let Some(fault) = config.fault.parse(text) {
                summary.faults.push(fault.message);
            }
        }
        WireValue::Sequence(items) => {
            for item in items {
                collect(item, config, summary);
            }
        }
        WireValue::Envelope(env) => {
            summary.types.extend(env.new_types.iter());
            summary
                .refs
                .extend(env.new_refs.iter().map(|(id, name)| (*id, name.as_str())));
            if let EnvelopeBody::Primitive(inner) = &env.body {
                collect(inner, config, summary);
            }
        }
        _ => {}
    }
}

/// One-line rendering of a wire value's shape.
fn describe(wire: &WireValue) -> String {
    match wire {
        WireValue::Undefined => "undefined".to_string(),
        WireValue::Null => "null".to_string(),
        WireValue::Bool(b) => b.to_string(),
        WireValue::Number(n) => n.to_string(),
        WireValue::String(s) => format!("{:?}", s),
        WireValue::Sequence(items) => format!(
            "[{}]",
            items.iter().map(describe).collect::<Vec<_>>().join(", ")
        ),
        WireValue::Envelope(env) => match &env.body {
            EnvelopeBody::Primitive(inner) => describe(inner),
            EnvelopeBody::RemoteInstance(id) => format!("instance#{}", id),
            EnvelopeBody::RemoteFunction(id) => format!("remote-fn#{}", id),
            EnvelopeBody::LocalFunction(id) => format!("local-fn#{}", id.raw()),
            EnvelopeBody::Opaque(json) => format!("opaque {}", json),
        },
    }
}

fn member_label(name: &str, member: &Member) -> String {
    match member {
        Member::Getter(accessor) => format!("{} -> get {}", name, accessor),
        Member::Setter(accessor) => format!("{} -> set {}", name, accessor),
        Member::Method(method) => format!("{} -> call {}", name, method),
    }
}

fn inspect_command(file: &Path, json: bool, config: &BridgeConfig) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let wire = WireValue::from_json_str(&text)
        .map_err(|e| anyhow::anyhow!("Failed to decode wire value: {}", e))?;

    let mut summary = Summary::default();
    collect(&wire, config, &mut summary);

    if json {
        print_json(&wire, &summary)
    } else {
        print_summary(&wire, &summary);
        Ok(())
    }
}

fn print_summary(wire: &WireValue, summary: &Summary<'_>) {
    println!("value: {}", describe(wire));

    if !summary.types.is_empty() {
        println!("types:");
        for descriptor in &summary.types {
            let class = ProxyClass::build(descriptor);
            println!("  {}:", class.type_name());
            for (name, member) in class.members() {
                println!("    {}", member_label(name, member));
            }
        }
    }

    if !summary.refs.is_empty() {
        println!("refs:");
        for (id, type_name) in &summary.refs {
            println!("  {}: {}", id, type_name);
        }
    }

    for message in &summary.faults {
        println!("fault: {}", message);
    }
}

fn print_json(wire: &WireValue, summary: &Summary<'_>) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "value": describe(wire),
        "types": summary.types.iter().map(|descriptor| {
            let class = ProxyClass::build(descriptor);
            serde_json::json!({
                "name": class.type_name(),
                "members": class
                    .members()
                    .map(|(name, member)| member_label(name, member))
                    .collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
        "refs": summary.refs.iter().map(|(id, type_name)| serde_json::json!({
            "id": id,
            "type": type_name,
        })).collect::<Vec<_>>(),
        "faults": summary.faults,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn fault_command(text: &str, config: &BridgeConfig) -> anyhow::Result<()> {
    match config.fault.parse(text) {
        Some(fault) => {
            println!("message: {}", fault.message);
            for detail in &fault.details {
                println!("detail: {}", detail);
            }
            Ok(())
        }
        None => anyhow::bail!(
            "not a fault string (expected prefix {:?})",
            config.fault.sentinel
        ),
    }
}
