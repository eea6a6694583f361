//! Core types for rollcall
//!
//! This crate provides the error taxonomy shared by the roster service and the
//! server binary.

pub mod error;

pub use error::{ApiError, ErrorKind};
