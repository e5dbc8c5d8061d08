//! WARDEN: stdio JSON-RPC runtime and demo CLI
//!
//! `serve` runs the trust core behind a Content-Length framed JSON-RPC
//! transport on stdin/stdout.  The remaining subcommands run demo scenarios
//! against the bundled example configuration.
//!
//! Usage:
//!   cargo run -p warden-demo -- serve --config demo/config/warden.toml
//!   cargo run -p warden-demo -- run-all
//!   cargo run -p warden-demo -- routing
//!   cargo run -p warden-demo -- check-config --config demo/config/warden.toml

mod config;
mod runner;
mod scenarios;
mod transport;

use std::{
    io::{self, BufReader},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use warden_contracts::error::WardenResult;

use crate::{config::WardenConfig, transport::ContentLengthTransport};

// ── CLI definition ────────────────────────────────────────────────────────────

/// WARDEN: tamper-evident audit, routing and tool authorization core.
#[derive(Parser)]
#[command(
    name = "warden",
    about = "WARDEN trust core runtime",
    long_about = "Serves the WARDEN trust core over stdio JSON-RPC, or runs demo\n\
                  scenarios showing route precedence, tool authorization and\n\
                  audit chain tamper evidence."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve JSON-RPC over stdin/stdout until end of stream or `shutdown`.
    Serve {
        /// Combined routing / tools / grants TOML file.
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Load and validate a configuration file, then exit.
    CheckConfig {
        #[arg(long, short)]
        config: PathBuf,
    },
    /// Run all demo scenarios in sequence.
    RunAll,
    /// Scenario 1: route resolution precedence and session keys.
    Routing,
    /// Scenario 2: tool authorization levels and grants.
    Authorization,
    /// Scenario 3: audit chain tamper evidence.
    Tamper,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // stdout carries the transport; logs go to stderr.  RUST_LOG=debug for detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve { config } => return serve(config),
        Command::CheckConfig { config } => check_config(config),
        Command::RunAll => scenarios::run_all(),
        Command::Routing => scenarios::run_routing(),
        Command::Authorization => scenarios::run_authorization(),
        Command::Tamper => scenarios::run_tamper(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("warden error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>) -> WardenResult<WardenConfig> {
    match path {
        Some(path) => WardenConfig::from_file(&path),
        None => Ok(WardenConfig::default()),
    }
}

fn serve(config: Option<PathBuf>) -> ExitCode {
    let runtime = match load_config(config).and_then(|config| config.build_in_memory()) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = runtime.initialize() {
        error!(error = %e, "runtime initialization failed");
    }

    info!("serving JSON-RPC on stdio");
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut transport = ContentLengthTransport::new(BufReader::new(stdin.lock()), stdout.lock());
    let code = runtime.run_dispatch_loop(&mut transport);
    runtime.shutdown();

    info!(exit_code = code, "dispatch loop finished");
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn check_config(path: PathBuf) -> WardenResult<()> {
    let config = WardenConfig::from_file(&path)?;
    println!(
        "{}: ok ({} routing rules, default agent {}, {} tools, {} grants)",
        path.display(),
        config.routing.rule_count(),
        config.routing.default_agent.as_deref().unwrap_or("<none>"),
        config.tools.len(),
        config.grants.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::{json, Value};

    use warden_contracts::rpc::RpcRequest;
    use warden_core::runtime::{EXIT_NOT_INITIALIZED, EXIT_OK};

    use crate::{config::WardenConfig, scenarios::EXAMPLE_CONFIG, transport::ContentLengthTransport};

    fn frames(requests: &[RpcRequest]) -> Vec<u8> {
        let mut out = Vec::new();
        for request in requests {
            let body = serde_json::to_string(request).unwrap();
            out.extend_from_slice(format!("Content-Length: {}\r\n\r\n{}", body.len(), body).as_bytes());
        }
        out
    }

    fn responses(written: Vec<u8>) -> Vec<Value> {
        let text = String::from_utf8(written).unwrap();
        text.split("Content-Length: ")
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                let (_, body) = chunk.split_once("\r\n\r\n").unwrap();
                serde_json::from_str(body).unwrap()
            })
            .collect()
    }

    /// Full stdio session: framed requests in, framed responses out.
    #[test]
    fn serves_framed_session_until_shutdown() {
        let runtime = WardenConfig::from_toml_str(EXAMPLE_CONFIG)
            .unwrap()
            .build_in_memory()
            .unwrap();
        runtime.initialize().unwrap();

        let input = frames(&[
            RpcRequest::new(1, "process_tool_call", json!({
                "request_id": "req-1",
                "context": {"channel": "irc"},
                "tool_name": "echo",
                "arguments": {"text": "hi"},
            })),
            RpcRequest::new(2, "query_audit", json!({"agent_id": "main"})),
            RpcRequest::new(3, "shutdown", Value::Null),
            RpcRequest::new(4, "status", Value::Null),
        ]);

        let mut transport = ContentLengthTransport::new(Cursor::new(input), Vec::new());
        assert_eq!(runtime.run_dispatch_loop(&mut transport), EXIT_OK);

        let out = responses(transport.into_writer());
        assert_eq!(out.len(), 3, "nothing is served after shutdown");
        assert_eq!(out[0]["result"]["status"], json!("executed"));
        assert_eq!(out[0]["result"]["output"]["arguments"]["text"], json!("hi"));
        assert_eq!(out[1]["result"].as_array().unwrap().len(), 3);
        assert_eq!(out[2]["result"], Value::Null);
    }

    #[test]
    fn refuses_to_serve_before_initialize() {
        let runtime = WardenConfig::default().build_in_memory().unwrap();
        let mut transport = ContentLengthTransport::new(Cursor::new(Vec::new()), Vec::new());
        assert_eq!(runtime.run_dispatch_loop(&mut transport), EXIT_NOT_INITIALIZED);
    }
}
