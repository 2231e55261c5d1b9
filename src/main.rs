mod backup;
mod calc;
mod db;
mod export;
mod ids;
mod ipc;
mod logging;
mod model;
mod repository;
mod store;

use std::io::{self, BufRead, Write};

fn main() {
    logging::init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reportcardd started");

    let mut state = ipc::AppState {
        workspace: None,
        repo: None,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    // One request per line, answered in order. Each request runs to completion
    // before the next is read, which serializes every store read-modify-write.
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                // Can't reply with the caller's id.
                ipc::err("", "bad_json", e.to_string(), None)
            }
        };

        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("reportcardd stopped");
}
