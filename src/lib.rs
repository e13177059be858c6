//! FPGA fleet library - enable, disable and program USB-attached FPGA boards.
//!
//! This library exposes the core functionality of the `fleet` CLI for use in
//! tests and potentially other front-ends.
//!
//! # Modules
//!
//! - `device`: Board enumeration and enable/disable through the device manager
//! - `toolchain`: Long-lived Vivado hardware-manager session
//! - `plan`: Ordered programming steps
//! - `sequencer`: Isolation, programming and restore of boards
//! - `controller`: Background runs with progress and cancellation
//! - `config`: Configuration file handling
//! - `error`: Error types with user-recoverable hints
//! - `output`: Output mode abstraction (robot/human)
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod logging;
pub mod output;
pub mod plan;
pub mod sequencer;
pub mod state;
pub mod theme;
pub mod toolchain;
