//! Shared foundational types for the veld elaboration core.
//!
//! This crate provides interned identifiers with case-insensitive comparison
//! (VHDL names are case-insensitive, Verilog names are not) and the internal
//! error type used for core invariant violations.

#![warn(missing_docs)]

pub mod ident;
pub mod result;

pub use ident::{Ident, Interner};
pub use result::{InternalError, VeldResult};
