//! # Wheel Bridge Library
//!
//! Turn a steering sensor into a game controller axis.
//!
//! Two independent pipelines are provided:
//!
//! - **HID gadget**: an ADS1115 sampled over I2C, mapped through a
//!   calibration to a signed 16-bit axis, smoothed, and written as 2-byte
//!   reports to a USB HID gadget device ([`hid`]).
//! - **Serial wheel**: a microcontroller streaming one sample per line is
//!   paired with, calibrated interactively, and forwarded to a virtual
//!   joystick ([`serial`], [`joystick`]).

pub mod adc;
pub mod config;
pub mod error;
pub mod hid;
pub mod joystick;
pub mod serial;
pub mod signal;
