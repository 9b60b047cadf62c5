//! HID gadget character device sink

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::report::AxisReport;
use crate::error::{Result, WheelError};

/// Default gadget device node.
pub const DEFAULT_GADGET_DEVICE: &str = "/dev/hidg0";

/// Sink accepting one axis report per call
#[async_trait]
pub trait ReportSink: Send {
    /// Write one report; the sink must not buffer it
    async fn write_report(&mut self, report: &AxisReport) -> Result<()>;
}

/// USB HID gadget endpoint (`/dev/hidgN`)
pub struct HidGadget {
    file: File,
    device_path: String,
}

impl std::fmt::Debug for HidGadget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidGadget")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl HidGadget {
    /// Open the gadget device for writing
    ///
    /// # Errors
    ///
    /// Returns `Io` if the device node cannot be opened
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).open(path).await?;
        let device_path = path.display().to_string();
        info!("Opened HID gadget at {}", device_path);
        Ok(Self { file, device_path })
    }

    /// Device path of the opened gadget
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl ReportSink for HidGadget {
    async fn write_report(&mut self, report: &AxisReport) -> Result<()> {
        self.file.write_all(report).await.map_err(|e| {
            WheelError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write report to {}: {}", self.device_path, e),
            ))
        })?;
        self.file.flush().await?;
        Ok(())
    }
}
