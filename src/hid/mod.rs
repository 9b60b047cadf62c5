//! # HID Gadget Module
//!
//! Pipeline from the local ADC to a USB HID gadget axis.
//!
//! This module handles:
//! - Encoding axis values as 2-byte little-endian reports
//! - Writing reports to the gadget character device
//! - The fixed-cadence sampling loop tying ADC, conditioning and gadget together

pub mod gadget;
pub mod report;
pub mod sampling;

pub use gadget::{HidGadget, ReportSink};
pub use sampling::SamplingLoop;
