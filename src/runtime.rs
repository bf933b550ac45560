use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the session loop
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Recurring tick scheduler owned by a session driver.
pub trait TickSource {
    /// Start emitting ticks. Calling this while running is a no-op.
    fn begin(&mut self);
    /// Stop emitting ticks and release any background resources.
    fn halt(&mut self);
    /// Mark the last delivered tick as consumed so the next one may be sent.
    fn acknowledge(&self);
    fn is_running(&self) -> bool;
}

struct Beat {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Real-time tick source: a background thread that sends [`SessionEvent::Tick`]
/// every interval. At most one tick is in flight; the next is only sent after
/// the consumer calls [`TickSource::acknowledge`].
pub struct Metronome {
    tx: Sender<SessionEvent>,
    interval: Duration,
    pending: Arc<AtomicBool>,
    beat: Option<Beat>,
}

impl Metronome {
    pub fn new(tx: Sender<SessionEvent>, interval: Duration) -> Self {
        Self {
            tx,
            interval,
            pending: Arc::new(AtomicBool::new(false)),
            beat: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl TickSource for Metronome {
    fn begin(&mut self) {
        if self.beat.is_some() {
            return;
        }

        let (stop, stopped) = mpsc::channel::<()>();
        let tx = self.tx.clone();
        let interval = self.interval;
        let pending = Arc::clone(&self.pending);
        pending.store(false, Ordering::SeqCst);

        let handle = thread::spawn(move || loop {
            match stopped.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            if pending.swap(true, Ordering::SeqCst) {
                continue;
            }
            if tx.send(SessionEvent::Tick).is_err() {
                break;
            }
        });

        tracing::debug!(interval_ms = interval.as_millis() as u64, "metronome started");
        self.beat = Some(Beat { stop, handle });
    }

    fn halt(&mut self) {
        if let Some(beat) = self.beat.take() {
            drop(beat.stop);
            let _ = beat.handle.join();
            tracing::debug!("metronome halted");
        }
    }

    fn acknowledge(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.beat.is_some()
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Tick source for headless use: ticks are delivered by calling the driver directly.
#[derive(Debug, Default, Clone)]
pub struct ManualTicks {
    running: bool,
}

impl TickSource for ManualTicks {
    fn begin(&mut self) {
        self.running = true;
    }

    fn halt(&mut self) {
        self.running = false;
    }

    fn acknowledge(&self) {}

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Forward terminal key and resize events into the session channel.
pub fn spawn_key_reader(tx: Sender<SessionEvent>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let evt = match event::read() {
            Ok(CtEvent::Key(key)) => SessionEvent::Key(key),
            Ok(CtEvent::Resize(_, _)) => SessionEvent::Resize,
            Ok(_) => continue,
            Err(_) => break,
        };

        if tx.send(evt).is_err() {
            break;
        }
    })
}
