//! X11 Async Event Stream
//!
//! Readiness of the X connection, delivered to the async main loop. A
//! blocking task polls the socket with mio and wakes the loop, which then
//! drains whatever x11rb has queued.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{oneshot, Notify};
use tracing::{info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const X11_TOKEN: mio::Token = mio::Token(0);

/// X11 event stream with async readiness notification
pub struct X11EventStream {
    conn: Arc<RustConnection>,
    notify: Arc<Notify>,
    /// Dropping this stops the polling task
    _task_guard: oneshot::Receiver<()>,
}

impl X11EventStream {
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (guard, task_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let mut events = mio::Events::with_capacity(1);

        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 FD with mio")?;

        // The timeout bounds how long the task outlives the stream
        let timeout = Duration::from_millis(100);
        tokio::task::spawn_blocking(move || loop {
            if guard.is_closed() {
                info!("X11 socket polling task shutting down");
                return;
            }
            if let Err(err) = poll.poll(&mut events, Some(timeout)) {
                warn!("X11 socket poll failed: {:?}", err);
                continue;
            }
            if events.iter().any(|event| event.token() == X11_TOKEN) {
                task_notify.notify_one();
            }
        });

        Ok(Self {
            conn,
            notify,
            _task_guard: task_guard,
        })
    }

    /// Next queued event, or `None` once the queue is drained.
    pub fn poll_next_event(&self) -> Result<Option<Event>> {
        Ok(self.conn.poll_for_event()?)
    }

    /// Wait until the socket has become readable.
    pub async fn wait_readable(&self) {
        self.notify.notified().await;
    }

    /// Send every request issued since the last flush.
    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
