use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::content::SourceEvent;
use crate::session::ScheduledAdvance;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum QuizEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Source(SourceEvent),
    AdvanceDue(ScheduledAdvance),
}

/// Source of app events (keyboard, resize, content deliveries, timers)
pub trait QuizEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError>;
}

/// Channel every producer posts into; optionally fed by the terminal
pub struct ChannelEventSource {
    tx: Sender<QuizEvent>,
    rx: Receiver<QuizEvent>,
}

impl ChannelEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// Also forwards crossterm key and resize events
    pub fn with_terminal_input() -> Self {
        let source = Self::new();
        let tx = source.sender();

        thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => tx.send(QuizEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => tx.send(QuizEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        source
    }

    pub fn sender(&self) -> Sender<QuizEvent> {
        self.tx.clone()
    }
}

impl Default for ChannelEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: QuizEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: QuizEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> QuizEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => QuizEvent::Tick,
        }
    }
}

/// Fires scheduled advances once their delay has passed
pub trait AdvanceScheduler {
    fn schedule(&mut self, advance: ScheduledAdvance);
}

/// Sleeps on a worker thread, then posts `AdvanceDue` to the event channel
#[derive(Clone, Debug)]
pub struct ThreadScheduler {
    tx: Sender<QuizEvent>,
}

impl ThreadScheduler {
    pub fn new(tx: Sender<QuizEvent>) -> Self {
        Self { tx }
    }
}

impl AdvanceScheduler for ThreadScheduler {
    fn schedule(&mut self, advance: ScheduledAdvance) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(advance.delay());
            // receiver gone means the app is shutting down
            let _ = tx.send(QuizEvent::AdvanceDue(advance));
        });
    }
}
