use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Watches the keyboard for `q` and cancels the run when it is pressed.
///
/// The terminal stays in cooked mode, so output keeps rendering normally and
/// Ctrl-C is still delivered as a signal.
pub struct InputHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl InputHandle {
    /// Returns `None` when stdin is not a terminal.
    pub fn start(shutdown: CancellationToken) -> Option<Self> {
        if !std::io::stdin().is_terminal() {
            debug!("stdin is not a terminal, key listener disabled");
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::spawn(move || listen(flag, shutdown));

        Some(Self {
            running,
            thread: Some(thread),
        })
    }

    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.halt();
    }
}

fn listen(running: Arc<AtomicBool>, shutdown: CancellationToken) {
    while running.load(Ordering::Relaxed) && !shutdown.is_cancelled() {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                debug!(error = %e, "key listener stopped");
                return;
            }
        }

        if let Ok(Event::Key(key_event)) = event::read()
            && key_event.kind == KeyEventKind::Press
            && matches!(key_event.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        {
            warn!("cancel requested from the keyboard");
            shutdown.cancel();
            return;
        }
    }
}
