mod api;
mod attendance;
mod config;
mod grading;
mod ipc;
mod notify;
mod session;
mod views;

use anyhow::Context;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the protocol; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn spawn_reader(tx: mpsc::Sender<ipc::Inbound>) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(ipc::Inbound::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(ipc::Inbound::Closed);
        })
        .context("spawn stdin reader")?;
    Ok(())
}

fn write_line(stdout: &mut impl Write, v: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(v).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn flush_notices(state: &ipc::AppState, stdout: &mut impl Write) {
    for notice in state.outbox.drain() {
        let payload = serde_json::to_value(&notice).unwrap_or(serde_json::Value::Null);
        write_line(stdout, &ipc::event("notify", payload));
    }
}

fn main() -> anyhow::Result<()> {
    let config = config::Config::parse();
    init_tracing(&config.log);

    let transport = api::HttpTransport::new(&config.api_base_url, config.http_timeout_secs)?;
    let client = api::PortalClient::new(Arc::new(transport), session::SessionHandle::new());
    let (tx, rx) = mpsc::channel();
    let loader = ipc::Loader::new(client.clone(), tx.clone(), config.debounce());
    tracing::info!(api = %config.api_base_url, "schoold starting");
    let mut state = ipc::AppState::new(config, client, loader);

    spawn_reader(tx)?;
    let mut stdout = io::stdout();

    while let Ok(msg) = rx.recv() {
        match msg {
            ipc::Inbound::Line(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let req: ipc::Request = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        // Without an id the shell cannot correlate this; answer anyway.
                        write_line(&mut stdout, &ipc::err("", "bad_json", e.to_string(), None));
                        continue;
                    }
                };
                let resp = ipc::handle_request(&mut state, req);
                write_line(&mut stdout, &resp);
            }
            ipc::Inbound::Loaded(loaded) => {
                if let Some(ev) = ipc::apply_loaded(&mut state, loaded) {
                    write_line(&mut stdout, &ev);
                }
            }
            ipc::Inbound::Closed => break,
        }
        flush_notices(&state, &mut stdout);
    }
    tracing::info!("stdin closed, exiting");
    Ok(())
}
