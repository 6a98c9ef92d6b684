//! Capability interfaces for the hardware the controller drives.
//!
//! Backends live in `inkwell-io`; tests supply scripted fakes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};

use crate::error::{DeviceError, RenderError};
use crate::frame::DisplayFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    Enter,
    Backspace,
    Space,
    Unknown,
}

/// A discrete key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    Character(char),
    Control(ControlKey),
}

/// Producer of key presses.
#[async_trait]
pub trait KeySource: Send {
    /// Wait at most `timeout` for the next press. `Ok(None)` means the wait
    /// elapsed (or only non-key activity arrived).
    async fn next_event(&mut self, timeout: Duration) -> Result<Option<KeyEvent>, DeviceError>;

    /// Try to reacquire the device after a [`DeviceError`].
    async fn rediscover(&mut self) -> Result<(), DeviceError>;

    /// Human-readable device name for logs.
    fn name(&self) -> &str;
}

/// The panel. Calls are synchronous and may be slow.
pub trait DisplayRenderer: Send {
    fn render(&mut self, frame: &DisplayFrame) -> Result<(), RenderError>;
}

/// Wall-clock time source.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

/// Local time of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
