// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Orthoroute CLI entrypoint.
//!
//! Routes every edge of a scene file and prints the routes plus engine statistics as
//! JSON. Logs go to stderr; set `RUST_LOG` to change the level.

use std::error::Error;
use std::sync::Arc;

use orthoroute::model::{DiagramSnapshot, Edge, Node};
use orthoroute::{InMemoryDiagram, Operation, RoutingEngine, RoutingOptions};
use serde::Deserialize;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <scene.json> [--config <options.json>] [--operation <op>]\n  {program} --schema\n\nThe scene is a JSON object with `nodes` and `edges` arrays.\n--operation is one of fullRoute (default), optimize, virtualBends, intersections.\n--schema prints the JSON schema of the options file."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    scene: Option<String>,
    config: Option<String>,
    operation: Option<String>,
    schema: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if options.config.is_some() {
                    return Err(());
                }
                options.config = Some(args.next().ok_or(())?);
            }
            "--operation" => {
                if options.operation.is_some() {
                    return Err(());
                }
                options.operation = Some(args.next().ok_or(())?);
            }
            "--schema" => {
                if options.schema {
                    return Err(());
                }
                options.schema = true;
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if options.scene.is_some() {
                    return Err(());
                }
                options.scene = Some(arg);
            }
        }
    }

    if options.schema == options.scene.is_some() {
        return Err(());
    }

    Ok(options)
}

#[derive(Debug, Deserialize)]
struct Scene {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "orthoroute".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        if options.schema {
            println!("{}", serde_json::to_string_pretty(&RoutingOptions::json_schema())?);
            return Ok(());
        }

        init_logging();

        let routing = match &options.config {
            Some(path) => RoutingOptions::from_json(&std::fs::read_to_string(path)?)?,
            None => RoutingOptions::default(),
        };
        let operation = match &options.operation {
            Some(raw) => raw.parse::<Operation>()?,
            None => Operation::FullRoute,
        };
        let scene_path = options.scene.unwrap_or_default();
        let scene: Scene = serde_json::from_str(&std::fs::read_to_string(&scene_path)?)?;
        tracing::info!(
            scene = %scene_path,
            nodes = scene.nodes.len(),
            edges = scene.edges.len(),
            op = %operation,
            "routing scene"
        );

        let diagram = Arc::new(InMemoryDiagram::new(DiagramSnapshot::new(scene.nodes, scene.edges)));
        let engine = RoutingEngine::in_memory(diagram.clone(), routing)?;
        let edge_ids = diagram.update(|snapshot| snapshot.edges().keys().cloned().collect::<Vec<_>>());
        engine.register_edges(edge_ids.iter().cloned());

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let routes = runtime.block_on(engine.batch_route(&edge_ids, operation))?;

        let output = serde_json::json!({
            "routes": routes,
            "statistics": engine.get_statistics(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("orthoroute: {err}");
        std::process::exit(1);
    }
}
