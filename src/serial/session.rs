//! # Serial Session
//!
//! Full serial-side flow from an opened port to a streaming virtual axis:
//!
//! 1. Let the board settle after the port opens
//! 2. Pair ([`PairingHandshake`])
//! 3. Guided max/min sweep and readout ([`CalibrationSequence`])
//! 4. Pause so the operator can review the readout
//! 5. Start the virtual joystick backend and give the host time to pick it up
//! 6. Forward samples ([`EmissionLoop`]) until shutdown
//!
//! Monitor mode stops after step 2 and prints percentages instead of
//! driving a joystick.

use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use super::calibration::{CalibrationSequence, DEFAULT_DWELL, DEFAULT_VERIFICATION_SAMPLES};
use super::handshake::{Pairing, PairingHandshake, DEFAULT_PAIR_CODE_DWELL};
use super::port_trait::LineLink;
use super::{parse_sample, SampleLine};
use crate::error::Result;
use crate::joystick::{EmissionLoop, VirtualJoystick};
use crate::signal::percent::to_percent;

/// Delays and counts of a serial session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub settle: Duration,
    pub pair_code_dwell: Duration,
    pub calibration_dwell: Duration,
    pub verification_samples: usize,
    pub review_pause: Duration,
    pub joystick_startup: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            pair_code_dwell: DEFAULT_PAIR_CODE_DWELL,
            calibration_dwell: DEFAULT_DWELL,
            verification_samples: DEFAULT_VERIFICATION_SAMPLES,
            review_pause: Duration::from_secs(4),
            joystick_startup: Duration::from_secs(3),
        }
    }
}

impl SessionTiming {
    /// No delays, for tests and replayed input.
    #[must_use]
    pub fn immediate(verification_samples: usize) -> Self {
        Self {
            settle: Duration::ZERO,
            pair_code_dwell: Duration::ZERO,
            calibration_dwell: Duration::ZERO,
            verification_samples,
            review_pause: Duration::ZERO,
            joystick_startup: Duration::ZERO,
        }
    }
}

/// Settles and pairs.
///
/// # Errors
///
/// Returns handshake and link errors.
pub async fn pair<L: LineLink + ?Sized>(link: &mut L, timing: &SessionTiming) -> Result<Pairing> {
    sleep(timing.settle).await;
    PairingHandshake::new(timing.pair_code_dwell)
        .perform(link)
        .await
}

async fn prepare<L: LineLink + ?Sized>(link: &mut L, timing: &SessionTiming) -> Result<Pairing> {
    let pairing = pair(link, timing).await?;

    CalibrationSequence::new(timing.calibration_dwell, timing.verification_samples)
        .run(link)
        .await?;

    info!("If the output was not correct restart.");
    sleep(timing.review_pause).await;
    Ok(pairing)
}

/// Runs the whole session, creating the joystick with `open_joystick` once
/// the operator has reviewed the calibration readout.
///
/// Returns `Ok(())` when `shutdown` resolves, at any stage.
///
/// # Errors
///
/// Returns the first handshake, link or joystick failure.
pub async fn run_bridge<L, J, O, F>(
    mut link: L,
    timing: SessionTiming,
    open_joystick: O,
    shutdown: F,
) -> Result<()>
where
    L: LineLink,
    J: VirtualJoystick,
    O: FnOnce() -> Result<J>,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tokio::select! {
        biased;

        _ = &mut shutdown => {
            info!("Shutdown requested during setup");
            return Ok(());
        }

        pairing = prepare(&mut link, &timing) => {
            let pairing = pairing?;
            info!("Paired with code {}", pairing.pair_code);
        }
    }

    let joystick = open_joystick()?;
    info!("Starting {} virtual wheel", joystick.backend());

    tokio::select! {
        biased;

        _ = &mut shutdown => return Ok(()),
        _ = sleep(timing.joystick_startup) => {}
    }

    EmissionLoop::new(link, joystick).run(shutdown).await
}

/// Pairs, then logs every numeric line as a percentage until shutdown.
///
/// # Errors
///
/// Returns handshake and link failures.
pub async fn run_monitor<L, F>(mut link: L, timing: SessionTiming, shutdown: F) -> Result<()>
where
    L: LineLink,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tokio::select! {
        biased;

        _ = &mut shutdown => return Ok(()),
        pairing = pair(&mut link, &timing) => {
            pairing?;
        }
    }

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Monitor stopped");
                return Ok(());
            }

            line = link.read_line() => {
                match parse_sample(&line?) {
                    SampleLine::Empty => {}
                    SampleLine::Value(value) => match to_percent(value) {
                        Ok(percent) => info!("{:.2}%", percent),
                        Err(e) => warn!("Ignored reading: {}", e),
                    },
                    SampleLine::Invalid(text) => warn!("Ignored non-numeric input: {}", text),
                }
            }
        }
    }
}
