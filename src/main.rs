//! Krane
//!
//! A reparenting X11 window manager with tiling and floating layouts,
//! per-output contexts and workspaces, and window swallowing.

mod config;
mod event_loop;
mod ipc;
mod wm;
mod x11;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::event_loop::EventLoop;
use crate::ipc::IpcServer;
use crate::wm::Model;
use crate::x11::X11Connection;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "krane=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting krane {}", env!("CARGO_PKG_VERSION"));

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let replace = args.iter().any(|arg| arg == "--replace" || arg == "-r");

    if replace {
        info!("--replace flag detected: will attempt to replace existing WM");
    }

    let config = Config::load();
    let conn = X11Connection::new(replace)?;
    let mut model = Model::new(conn, &config)?;

    let ipc = IpcServer::bind()?;
    let mut event_loop = EventLoop::new(&model, ipc)?;

    let result = event_loop.run(&mut model);
    if let Err(e) = &result {
        error!("Event loop error: {:#}", e);
    }

    info!("Shutting down");
    model.exit();

    result
}
