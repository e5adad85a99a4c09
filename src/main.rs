//! Wisp
//!
//! A minimalist multi-output X11 window manager: no decorations beyond a
//! one-pixel border, keyboard driven desktops per output, and pointer
//! move and resize with snapping.

mod config;
mod shared;
mod wm;
mod x11_async;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::protocol::Event;

use crate::config::Config;
use crate::wm::display::X11Display;
use crate::wm::WindowManager;
use crate::x11_async::X11EventStream;

const USAGE: &str = "usage: wisp [--config <path>]";

/// Command line options
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let Some(path) = args.next() else {
                        bail!("--config needs a path\n{USAGE}");
                    };
                    parsed.config = Some(PathBuf::from(path));
                }
                "--help" | "-h" => return Ok(None),
                other => bail!("unknown argument: {other}\n{USAGE}"),
            }
        }
        Ok(Some(parsed))
    }
}

/// Window manager plus the stream feeding it
struct App {
    wm: WindowManager<X11Display>,
    stream: X11EventStream,
    /// Events read but not yet handled
    pending: VecDeque<Event>,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let (conn, _screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        info!("Connected to X server");

        let display = X11Display::new(conn.clone(), &config.font)?;
        if let Some(base) = display.randr_event_base() {
            info!("Watching RandR screen changes (event base {})", base);
        }
        let stream = X11EventStream::new(conn)?;
        let mut wm = WindowManager::new(display, config)?;
        wm.scan_windows()?;

        Ok(Self {
            wm,
            stream,
            pending: VecDeque::new(),
        })
    }

    /// Read everything x11rb has queued. Returns false once the connection is gone.
    fn drain(&mut self) -> bool {
        loop {
            match self.stream.poll_next_event() {
                Ok(Some(event)) => self.pending.push_back(event),
                Ok(None) => return true,
                Err(e) => {
                    error!("X11 connection lost: {}", e);
                    return false;
                }
            }
        }
    }

    /// Handle one batch, including events set aside while inspecting a key.
    fn dispatch(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            self.wm.handle_event(&event);
            let deferred = self.wm.display_mut().take_deferred_events();
            self.pending.extend(deferred);
        }
        self.wm.after_events();
    }

    async fn run(&mut self, shutdown: &mut tokio::sync::mpsc::Receiver<()>) -> Result<()> {
        info!("Starting main event loop");
        loop {
            if let Err(e) = self.stream.flush() {
                warn!("Failed to flush X11 requests: {}", e);
                return Ok(());
            }
            if !self.drain() {
                return Ok(());
            }
            if !self.pending.is_empty() {
                self.dispatch();
                continue;
            }

            tokio::select! {
                () = self.stream.wait_readable() => {}
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, releasing clients");
                    return self.stop();
                }
            }
        }
    }

    /// Hand every window back to the root and close the connection.
    fn stop(&mut self) -> Result<()> {
        self.wm.shutdown()?;
        self.wm.display_mut().close()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "wisp=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(args) = Args::parse(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };

    info!("Starting Wisp");
    let config = Config::load(args.config.as_deref())?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    let mut app = App::new(config)?;
    app.run(&mut shutdown_rx).await
}
