//! Core pipeline orchestration for Draftmill.
//!
//! This crate ties together the readiness poller, the generation provider
//! ports, rich-text parsing, and storage into the end-to-end
//! `run_generation_job` workflow.

pub mod pipeline;
pub mod poller;
pub mod ports;
pub mod slug;
