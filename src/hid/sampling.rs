//! # Sampling Loop
//!
//! Drives the ADC → HID gadget pipeline at a fixed cadence.
//!
//! Each iteration:
//!
//! 1. Read a raw sample from the ADC
//! 2. Clamp it to the calibrated `[min, max]`
//! 3. Map it onto `[-32767, 32767]` with the center held at 0
//! 4. Smooth it against the previous output
//! 5. Encode the truncated result as a 2-byte report
//! 6. Write the report to the gadget
//! 7. Sleep for the update interval
//!
//! Read and write failures end the loop. Nothing is retried.

use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use super::gadget::ReportSink;
use super::report::encode_axis_report;
use crate::adc::AdcChannel;
use crate::error::Result;
use crate::signal::mapping::{map_axis, CalibrationBounds};
use crate::signal::smoothing::Smoother;

/// Default delay between reports.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(2);

/// Number of reports between status log messages (~10 s at 2 ms)
const LOG_INTERVAL_REPORTS: u64 = 5000;

/// One iteration's intermediate values, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleTrace {
    pub raw: i32,
    pub clamped: i32,
    pub mapped: i32,
    pub smoothed: f64,
    pub report_value: i64,
}

/// ADC → gadget loop. Owns the smoothing accumulator.
pub struct SamplingLoop<A, S> {
    adc: A,
    sink: S,
    bounds: CalibrationBounds,
    smoother: Smoother,
    update_interval: Duration,
    reports_written: u64,
}

impl<A: AdcChannel, S: ReportSink> SamplingLoop<A, S> {
    /// Creates a loop with a fresh smoothing accumulator.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `bounds` violate `min < center < max`.
    pub fn new(
        adc: A,
        sink: S,
        bounds: CalibrationBounds,
        smoother: Smoother,
        update_interval: Duration,
    ) -> Result<Self> {
        bounds.validate()?;
        Ok(Self {
            adc,
            sink,
            bounds,
            smoother,
            update_interval,
            reports_written: 0,
        })
    }

    /// Runs one read → write iteration without sleeping.
    ///
    /// # Errors
    ///
    /// Propagates ADC, encoding and sink failures.
    ///
    /// # Panics
    ///
    /// Panics on a current-thread runtime: the ADC read runs under
    /// [`tokio::task::block_in_place`], which needs the multi-thread runtime.
    pub async fn step(&mut self) -> Result<SampleTrace> {
        let raw = tokio::task::block_in_place(|| self.adc.read_channel())?;
        let clamped = self.bounds.clamp(raw);
        let mapped = map_axis(clamped, &self.bounds)?;
        let smoothed = self.smoother.update(mapped);
        let report_value = smoothed.trunc() as i64;
        let report = encode_axis_report(report_value)?;

        self.sink.write_report(&report).await?;
        self.reports_written += 1;

        Ok(SampleTrace {
            raw,
            clamped,
            mapped,
            smoothed,
            report_value,
        })
    }

    /// Runs until `shutdown` resolves or an iteration fails.
    ///
    /// # Errors
    ///
    /// Returns the first ADC, encoding or sink failure.
    ///
    /// # Panics
    ///
    /// Panics on a current-thread runtime, see [`Self::step`].
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Sampling loop started (interval {:?}, smoothing {}, bounds {:?})",
            self.update_interval,
            self.smoother.alpha(),
            self.bounds
        );

        let mut last_log_count: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Sampling loop stopped after {} reports", self.reports_written);
                    return Ok(());
                }

                result = self.step() => {
                    let trace = result?;
                    debug!(?trace, "report written");

                    if self.reports_written - last_log_count >= LOG_INTERVAL_REPORTS {
                        info!("Wrote {} reports (last axis value {})",
                            self.reports_written, trace.report_value);
                        last_log_count = self.reports_written;
                    }
                }
            }

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Sampling loop stopped after {} reports", self.reports_written);
                    return Ok(());
                }

                _ = sleep(self.update_interval) => {}
            }
        }
    }

    /// Reports written since the loop was created.
    pub fn reports_written(&self) -> u64 {
        self.reports_written
    }

    /// Current smoothed output.
    pub fn smoothed(&self) -> f64 {
        self.smoother.last()
    }
}
