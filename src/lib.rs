//! Cycle-accurate conformance harness for valid/ready and FIFO-style
//! handshake interfaces.
//!
//! A [`Testbench`](harness::Testbench) wires one protocol variant to the
//! harness: its signals, a golden model, randomized stimulus drivers and an
//! output monitor. [`harness::run`] resets the DUT, drives stimulus until a
//! target number of events or packets, drains the DUT and returns a
//! [`Verdict`](harness::Verdict).

pub mod biased_mux;
pub mod commit_fifo;
pub mod config;
pub mod dut;
pub mod error;
pub mod executor;
pub mod fifo;
pub mod fwd_pipe;
pub mod golden;
pub mod harness;
pub mod junit;
pub mod monitor;
pub mod prelude;
pub mod scoreboard;
pub mod signal;
pub mod stimulus;
pub mod value;

pub use error::{ConfigError, HarnessError};
pub use harness::{run, Failure, RunSummary, Verdict};
