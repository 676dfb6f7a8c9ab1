//! Shared certsmith wire codec, protocol and status types.
//!
//! This crate is dependency-boundary-safe for both the host bridge and any
//! execution module that speaks the virtual-file protocol.

#![warn(clippy::pedantic)]

pub mod codec;
pub mod protocol;
pub mod status;
