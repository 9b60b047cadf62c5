//! # Calibration Sequence
//!
//! Guided check run right after pairing. The operator sweeps the sensor to
//! its maximum, then its minimum, and a fixed number of readings is shown as
//! percentages so they can confirm the board reports sensible values.
//!
//! Nothing is captured or stored: the readings exist for the operator only.

use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use super::port_trait::LineLink;
use super::{parse_sample, SampleLine};
use crate::error::Result;
use crate::signal::percent::to_percent;

/// Default time the operator gets for each sweep position
pub const DEFAULT_DWELL: Duration = Duration::from_secs(5);

/// Default number of lines read for verification
pub const DEFAULT_VERIFICATION_SAMPLES: usize = 100;

/// Readings shown during verification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    /// Percentages of full scale, in arrival order
    pub readings: Vec<f64>,
    /// Empty lines (including timed-out reads)
    pub empty: usize,
    /// Non-numeric or out-of-domain lines
    pub skipped: usize,
}

/// Max-then-min sweep followed by a bounded readout
#[derive(Debug, Clone, Copy)]
pub struct CalibrationSequence {
    dwell: Duration,
    samples: usize,
}

impl Default for CalibrationSequence {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL, DEFAULT_VERIFICATION_SAMPLES)
    }
}

impl CalibrationSequence {
    #[must_use]
    pub fn new(dwell: Duration, samples: usize) -> Self {
        Self { dwell, samples }
    }

    /// Prompts the sweep, then reads `samples` lines and reports them.
    ///
    /// Non-numeric lines are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the link's error if a read fails.
    pub async fn run<L: LineLink + ?Sized>(&self, link: &mut L) -> Result<VerificationReport> {
        info!("Calibration...");
        info!("Turn the POT or WHEEL to absolute MAX");
        sleep(self.dwell).await;

        info!("Turn the POT or WHEEL to minimum");
        sleep(self.dwell).await;

        info!("Printing output.");
        let mut report = VerificationReport::default();

        for _ in 0..self.samples {
            let line = link.read_line().await?;
            match parse_sample(&line) {
                SampleLine::Empty => report.empty += 1,
                SampleLine::Value(value) => match to_percent(value) {
                    Ok(percent) => {
                        info!("{:.2}%", percent);
                        report.readings.push(percent);
                    }
                    Err(e) => {
                        warn!("Ignored reading: {}", e);
                        report.skipped += 1;
                    }
                },
                SampleLine::Invalid(text) => {
                    warn!("Ignored non-numeric input: {}", text);
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Verification done: {} readings, {} skipped, {} empty",
            report.readings.len(),
            report.skipped,
            report.empty
        );
        Ok(report)
    }
}
