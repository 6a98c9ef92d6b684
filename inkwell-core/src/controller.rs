//! The Mode Controller.
//!
//! A single-threaded loop with one suspension point per iteration: a wait on
//! the key source bounded by the time left until the next minute boundary.
//! Key handling, quote selection and rendering all run to completion between
//! waits.
//!
//! | State | Event | Next |
//! |---|---|---|
//! | Clock | minute tick | Clock (new quote rendered) |
//! | Clock | any key | Type (key discarded, typing frame rendered) |
//! | Type | char / Space | Type, or Clock when the escape command completes |
//! | Type | Enter / Backspace | Type |
//! | Type | minute tick | Type (ignored) |

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rand::RngCore;
use tokio::time::Instant;

use crate::config::ControllerConfig;
use crate::device::{Clock, ControlKey, DisplayRenderer, KeyEvent, KeySource};
use crate::error::DeviceError;
use crate::frame::{ClockEntry, DisplayFrame, QuoteHistory};
use crate::line_buffer::LineBuffer;
use crate::quotes::{QuoteDataset, TimeOfDay};
use crate::retry::DeviceHealth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Clock,
    Type,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clock => write!(f, "clock"),
            Self::Type => write!(f, "typewriter"),
        }
    }
}

/// What a key press did. Only non-`Ignored` outcomes render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Ignored,
    Edited,
    EnteredTypeMode,
    EnteredClockMode,
}

/// Time until the next whole minute. Never zero.
pub fn until_next_minute(now: NaiveDateTime) -> Duration {
    let into_minute = Duration::from_secs(u64::from(now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond().min(999_999_999)));
    Duration::from_secs(60)
        .saturating_sub(into_minute)
        .max(Duration::from_millis(1))
}

type MinuteStamp = (NaiveDate, TimeOfDay);

fn stamp(now: NaiveDateTime) -> MinuteStamp {
    (now.date(), TimeOfDay::from_time(&now))
}

pub struct ModeController {
    config: ControllerConfig,
    dataset: Arc<QuoteDataset>,
    keys: Box<dyn KeySource>,
    display: Box<dyn DisplayRenderer>,
    clock: Box<dyn Clock>,
    rng: Box<dyn RngCore + Send>,

    mode: Mode,
    buffer: LineBuffer,
    history: QuoteHistory,
    last_tick: Option<MinuteStamp>,
    device: DeviceHealth,
    dropped_frames: u64,
}

impl std::fmt::Debug for ModeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeController")
            .field("mode", &self.mode)
            .field("device", &self.device)
            .field("keys", &self.keys.name())
            .field("quotes", &self.dataset.len())
            .finish()
    }
}

impl ModeController {
    pub fn new(
        config: ControllerConfig,
        dataset: Arc<QuoteDataset>,
        keys: Box<dyn KeySource>,
        display: Box<dyn DisplayRenderer>,
        clock: Box<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let buffer = LineBuffer::new(config.line_width, config.max_lines_visible);
        let history = QuoteHistory::new(config.history_len);
        Self {
            config,
            dataset,
            keys,
            display,
            clock,
            rng,
            mode: Mode::Clock,
            buffer,
            history,
            last_tick: None,
            device: DeviceHealth::Connected,
            dropped_frames: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn device_health(&self) -> DeviceHealth {
        self.device
    }

    /// Frames the renderer refused.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    // ────────────────────────────────────────────────────────────────
    // Event loop
    // ────────────────────────────────────────────────────────────────

    /// Run until `shutdown` resolves. The loop is only ever cancelled while
    /// parked in its bounded wait.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(mode = %self.mode, keys = self.keys.name(), "Mode controller started");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = self.run_once() => {}
            }
        }
        tracing::info!("Mode controller stopped");
    }

    /// One iteration: deliver a due minute tick, wait once, handle what arrived.
    pub async fn run_once(&mut self) {
        let now = self.clock.now();
        if self.last_tick != Some(stamp(now)) {
            self.handle_tick(now);
        }

        // Rendering may be slow; measure the wait from after it. A tick that
        // ran past the boundary leaves the next minute due at once.
        let after = self.clock.now();
        let wait = if self.last_tick == Some(stamp(after)) {
            until_next_minute(after)
        } else {
            Duration::ZERO
        };
        match self.device {
            DeviceHealth::Connected => match self.keys.next_event(wait).await {
                Ok(Some(event)) => {
                    self.handle_key(event);
                }
                Ok(None) => {}
                Err(err) => self.device_lost(err),
            },
            DeviceHealth::Lost { next_attempt, .. } => {
                let retry_in = next_attempt.saturating_duration_since(Instant::now());
                tokio::time::sleep(wait.min(retry_in)).await;
                if Instant::now() >= next_attempt {
                    self.try_rediscover().await;
                }
            }
            DeviceHealth::Abandoned => tokio::time::sleep(wait).await,
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Events
    // ────────────────────────────────────────────────────────────────

    /// Minute boundary (or startup). Refreshes the clock face in Clock Mode;
    /// ignored while typing.
    pub fn handle_tick(&mut self, now: NaiveDateTime) {
        self.last_tick = Some(stamp(now));
        if self.mode == Mode::Type {
            return;
        }
        self.push_quote(TimeOfDay::from_time(&now));
        self.render_clock(TimeOfDay::from_time(&now));
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> KeyOutcome {
        let outcome = match self.mode {
            Mode::Clock => {
                self.enter_type_mode();
                KeyOutcome::EnteredTypeMode
            }
            Mode::Type => self.type_key(event),
        };

        match outcome {
            KeyOutcome::Ignored => {}
            KeyOutcome::Edited | KeyOutcome::EnteredTypeMode => self.render_typing(),
            KeyOutcome::EnteredClockMode => {
                let now = self.clock.now();
                self.last_tick = Some(stamp(now));
                let time = TimeOfDay::from_time(&now);
                self.push_quote(time);
                self.render_clock(time);
            }
        }
        outcome
    }

    fn type_key(&mut self, event: KeyEvent) -> KeyOutcome {
        let changed = match event {
            KeyEvent::Character(c) => return self.type_char(c),
            KeyEvent::Control(ControlKey::Space) => return self.type_char(' '),
            KeyEvent::Control(ControlKey::Enter) => {
                self.buffer.append_newline();
                true
            }
            KeyEvent::Control(ControlKey::Backspace) => self.buffer.backspace(),
            KeyEvent::Control(ControlKey::Unknown) => false,
        };
        if changed {
            KeyOutcome::Edited
        } else {
            KeyOutcome::Ignored
        }
    }

    fn type_char(&mut self, c: char) -> KeyOutcome {
        if !self.buffer.append_char(c) {
            return KeyOutcome::Ignored;
        }
        if self.config.escape_command.strip_from(&mut self.buffer) {
            self.mode = Mode::Clock;
            self.history.clear();
            tracing::info!("Entered clock mode. Press any key to return to typewriter mode.");
            return KeyOutcome::EnteredClockMode;
        }
        KeyOutcome::Edited
    }

    fn enter_type_mode(&mut self) {
        self.mode = Mode::Type;
        if self.config.reset_on_type_mode {
            self.buffer.reset();
        }
        tracing::info!(
            escape = self.config.escape_command.token(),
            "Switched to typewriter mode. Type the escape command to return to clock mode."
        );
    }

    fn push_quote(&mut self, time: TimeOfDay) {
        let entry = match self
            .dataset
            .select_with_fallback(time, self.config.fallback, &mut *self.rng)
        {
            Ok(selection) => {
                if selection.is_fallback(time) {
                    tracing::debug!(%time, matched = %selection.matched, "Using nearest earlier quote");
                }
                ClockEntry::from_record(selection.record)
            }
            Err(missing) => {
                tracing::debug!(%missing, "Showing placeholder");
                ClockEntry::placeholder(time)
            }
        };
        self.history.push(entry);
    }

    // ────────────────────────────────────────────────────────────────
    // Device recovery
    // ────────────────────────────────────────────────────────────────

    fn device_lost(&mut self, err: DeviceError) {
        tracing::warn!(device = self.keys.name(), error = %err, "Key source lost; serving clock only");
        self.device = DeviceHealth::after_failure(0, &self.config.retry, Instant::now());
        if self.mode == Mode::Type {
            self.mode = Mode::Clock;
            self.history.clear();
            let now = self.clock.now();
            self.handle_tick(now);
        }
    }

    async fn try_rediscover(&mut self) {
        let DeviceHealth::Lost { attempts, .. } = self.device else {
            return;
        };
        let attempts = attempts + 1;
        match self.keys.rediscover().await {
            Ok(()) => {
                tracing::info!(device = self.keys.name(), attempts, "Key source reacquired");
                self.device = DeviceHealth::Connected;
            }
            Err(err) => {
                self.device =
                    DeviceHealth::after_failure(attempts, &self.config.retry, Instant::now());
                if self.device == DeviceHealth::Abandoned {
                    tracing::error!(attempts, error = %err, "Giving up on key source");
                } else {
                    tracing::warn!(attempts, error = %err, "Key source rediscovery failed");
                }
            }
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Rendering
    // ────────────────────────────────────────────────────────────────

    fn render_typing(&mut self) {
        let frame = DisplayFrame::typing(self.buffer.render_text());
        self.present(&frame);
    }

    fn render_clock(&mut self, time: TimeOfDay) {
        let frame = self.history.to_frame(self.config.line_width, time);
        tracing::debug!(quotes = self.history.len(), lines = frame.lines.len(), %time, "Clock display");
        self.present(&frame);
    }

    /// A failed render drops the frame; the previous one stays on the panel.
    fn present(&mut self, frame: &DisplayFrame) {
        if let Err(err) = self.display.render(frame) {
            self.dropped_frames += 1;
            tracing::warn!(kind = ?frame.kind, error = %err, "Display update failed; frame dropped");
        }
    }
}
