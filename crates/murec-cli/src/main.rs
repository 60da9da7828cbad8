//! murec - evaluate saved block workspaces
//!
//! Loads a workspace document, prints the tree, and either evaluates it
//! instantly or replays the step-event stream. Stands in for the
//! graphical editor as the session's external collaborator.

use std::path::PathBuf;

use clap::Parser;
use murec_core::{BlockNode, Session};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "murec")]
#[command(about = "Evaluate a saved mu-recursive block workspace")]
struct Cli {
    /// Path to a saved workspace document (JSON)
    workspace: PathBuf,

    /// Override the declared inputs, comma separated (e.g. "3,4")
    #[arg(long, value_delimiter = ',')]
    inputs: Option<Vec<i64>>,

    /// Replay the step-event stream instead of evaluating instantly
    #[arg(long)]
    trace: bool,
}

fn print_tree(node: &BlockNode, indent: usize) {
    let pad = "  ".repeat(indent);
    let params: Vec<String> = node
        .params
        .iter()
        .map(|p| format!("{}={}", p.name, p.value))
        .collect();
    let params = if params.is_empty() {
        String::new()
    } else {
        format!(" [{}]", params.join(", "))
    };
    println!("{}{} {}{} ({} inputs)", pad, node.id, node.title(), params, node.arity);
    for slot in &node.slots {
        match &slot.child {
            Some(child) => {
                println!("{}  {}:", pad, slot.name);
                print_tree(child, indent + 2);
            }
            None => println!(
                "{}  {}: (empty, expects {})",
                pad,
                slot.name,
                slot.rule.describe(node.arity)
            ),
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murec=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("loading workspace: {}", cli.workspace.display());
    let json = match std::fs::read_to_string(&cli.workspace) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to read {}: {}", cli.workspace.display(), e);
            std::process::exit(1);
        }
    };

    let mut session = Session::new();
    if let Err(e) = session.load_json(&json) {
        error!("failed to load workspace: {}", e);
        std::process::exit(1);
    }

    if let Some(inputs) = &cli.inputs {
        session.set_declared_arity(inputs.len());
        for (i, value) in inputs.iter().enumerate() {
            if let Err(e) = session.set_input(i, *value) {
                error!("bad input override: {}", e);
                std::process::exit(1);
            }
        }
    }

    let Some(root) = session.root() else {
        error!("workspace has no root block");
        std::process::exit(1);
    };
    print_tree(root, 0);
    println!("inputs: {:?}", session.inputs());

    if cli.trace {
        let mut trace = match session.trace() {
            Ok(t) => t,
            Err(e) => {
                error!("cannot step: {}", e);
                std::process::exit(1);
            }
        };
        for item in &mut trace {
            match item {
                Ok(event) => println!("step: {} {} -> {}", event.node, event.kind, event.result),
                Err(e) => {
                    error!("evaluation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        match trace.final_result() {
            Some(value) => println!("result: {}", value),
            None => {
                error!("trace ended without a result");
                std::process::exit(1);
            }
        }
    } else {
        match session.evaluate() {
            Ok(value) => println!("result: {}", value),
            Err(e) => {
                error!("evaluation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}
