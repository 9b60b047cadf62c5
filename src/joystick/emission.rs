//! # Emission Loop
//!
//! Forwards one serial sample per line to a virtual joystick.
//!
//! Per-line data problems (non-numeric text, values the backend cannot
//! represent) are logged and skipped. Link and device failures end the loop.

use std::future::Future;
use tracing::{debug, info, warn};

use super::VirtualJoystick;
use crate::error::Result;
use crate::serial::port_trait::LineLink;
use crate::serial::{parse_sample, SampleLine};

/// Number of forwarded values between status log messages
const LOG_INTERVAL_VALUES: u64 = 1000;

/// What happened to one received line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Value written to the joystick
    Emitted { raw: i32, axis: i32 },
    /// Blank line or timed-out read
    Empty,
    /// Line dropped with a warning
    Skipped,
}

/// Serial → virtual joystick loop
pub struct EmissionLoop<L, J> {
    link: L,
    joystick: J,
    emitted: u64,
    skipped: u64,
}

impl<L: LineLink, J: VirtualJoystick> EmissionLoop<L, J> {
    pub fn new(link: L, joystick: J) -> Self {
        Self {
            link,
            joystick,
            emitted: 0,
            skipped: 0,
        }
    }

    /// Reads one line and forwards it.
    ///
    /// # Errors
    ///
    /// Returns link failures and non-recoverable joystick failures.
    pub async fn step(&mut self) -> Result<LineOutcome> {
        let line = self.link.read_line().await?;

        let raw = match parse_sample(&line) {
            SampleLine::Empty => return Ok(LineOutcome::Empty),
            SampleLine::Invalid(text) => {
                warn!("Ignored non-numeric input: {}", text);
                self.skipped += 1;
                return Ok(LineOutcome::Skipped);
            }
            SampleLine::Value(raw) => raw,
        };

        match self.joystick.emit(raw) {
            Ok(axis) => {
                self.emitted += 1;
                Ok(LineOutcome::Emitted { raw, axis })
            }
            Err(e) if e.is_recoverable() => {
                warn!("Ignored sample: {}", e);
                self.skipped += 1;
                Ok(LineOutcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    /// Forwards lines until `shutdown` resolves or a fatal error occurs.
    ///
    /// # Errors
    ///
    /// Returns the first link or joystick failure.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!("Forwarding samples to {} joystick", self.joystick.backend());
        let mut last_log_count: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Emission loop stopped: {} forwarded, {} skipped",
                        self.emitted, self.skipped);
                    return Ok(());
                }

                outcome = self.step() => {
                    let outcome = outcome?;
                    debug!(?outcome, "line handled");

                    if self.emitted - last_log_count >= LOG_INTERVAL_VALUES {
                        info!("Forwarded {} values ({} skipped)", self.emitted, self.skipped);
                        last_log_count = self.emitted;
                    }
                }
            }
        }
    }

    /// Values forwarded so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Lines dropped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
