//! Terminal key source.
//!
//! Reads key presses from the controlling terminal through crossterm's async
//! event stream. The terminal is put in raw mode for the lifetime of the
//! source so individual keystrokes arrive without line editing; that also
//! swallows the usual SIGINT, so Ctrl+C is forwarded on a separate channel.

use std::time::Duration;

use async_trait::async_trait;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;

use inkwell_core::config::KeyboardConfig;
use inkwell_core::{ControlKey, DeviceError, KeyEvent, KeySource};

/// Map a crossterm key press to a controller key event.
///
/// Returns `None` for presses that carry no meaning of their own (bare
/// modifiers, the null key).
pub fn map_key(key: &crossterm::event::KeyEvent) -> Option<KeyEvent> {
    let chorded = key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);

    let event = match key.code {
        KeyCode::Modifier(_) | KeyCode::Null => return None,
        KeyCode::Char(_) if chorded => KeyEvent::Control(ControlKey::Unknown),
        KeyCode::Char(' ') => KeyEvent::Control(ControlKey::Space),
        KeyCode::Char(c) => KeyEvent::Character(c),
        KeyCode::Enter => KeyEvent::Control(ControlKey::Enter),
        KeyCode::Backspace => KeyEvent::Control(ControlKey::Backspace),
        _ => KeyEvent::Control(ControlKey::Unknown),
    };
    Some(event)
}

/// Ctrl+C (or Ctrl+D) under raw mode.
pub fn is_interrupt(key: &crossterm::event::KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
}

/// Drops presses that arrive within `window` of the last accepted one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

pub struct TerminalKeySource {
    events: Option<EventStream>,
    debounce: Debouncer,
    interrupt_tx: mpsc::Sender<()>,
}

impl std::fmt::Debug for TerminalKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalKeySource")
            .field("attached", &self.events.is_some())
            .finish()
    }
}

impl TerminalKeySource {
    /// Enter raw mode and start reading. The receiver yields one `()` per
    /// interrupt request typed on the keyboard.
    pub fn start(config: &KeyboardConfig) -> Result<(Self, mpsc::Receiver<()>), DeviceError> {
        let (interrupt_tx, interrupt_rx) = mpsc::channel(4);
        attach()?;
        let source = Self {
            events: Some(EventStream::new()),
            debounce: Debouncer::new(config.debounce),
            interrupt_tx,
        };
        tracing::info!(debounce_ms = config.debounce.as_millis() as u64, "Terminal keyboard attached");
        Ok((source, interrupt_rx))
    }

    /// A source with no terminal yet. The first read reports the device as
    /// lost, so the controller falls into its rediscovery schedule.
    pub fn detached(config: &KeyboardConfig) -> (Self, mpsc::Receiver<()>) {
        let (interrupt_tx, interrupt_rx) = mpsc::channel(4);
        let source = Self {
            events: None,
            debounce: Debouncer::new(config.debounce),
            interrupt_tx,
        };
        (source, interrupt_rx)
    }

    fn detach(&mut self, err: DeviceError) -> DeviceError {
        self.events = None;
        err
    }
}

fn attach() -> Result<(), DeviceError> {
    crossterm::terminal::size()
        .map_err(|e| DeviceError::NotFound(format!("no controlling terminal: {e}")))?;
    crossterm::terminal::enable_raw_mode()?;
    Ok(())
}

#[async_trait]
impl KeySource for TerminalKeySource {
    async fn next_event(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, DeviceError> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(stream) = self.events.as_mut() else {
                return Err(DeviceError::Disconnected("terminal detached".to_string()));
            };

            let next = match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(next) => next,
                Err(_) => return Ok(None),
            };

            let key = match next {
                None => {
                    let err = DeviceError::Disconnected("terminal event stream ended".to_string());
                    return Err(self.detach(err));
                }
                Some(Err(e)) => return Err(self.detach(DeviceError::Io(e))),
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => key,
                Some(Ok(_)) => continue,
            };

            if is_interrupt(&key) {
                tracing::info!("Interrupt requested from keyboard");
                let _ = self.interrupt_tx.try_send(());
                continue;
            }

            let Some(event) = map_key(&key) else {
                continue;
            };

            if !self.debounce.accept(Instant::now()) {
                tracing::trace!(?event, "Debounced key press");
                continue;
            }
            return Ok(Some(event));
        }
    }

    async fn rediscover(&mut self) -> Result<(), DeviceError> {
        self.events = None;
        attach()?;
        self.events = Some(EventStream::new());
        Ok(())
    }

    fn name(&self) -> &str {
        "terminal"
    }
}

impl Drop for TerminalKeySource {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}
