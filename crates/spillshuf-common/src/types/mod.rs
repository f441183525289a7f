//! Core type definitions for Spillshuf.
//!
//! The shuffle engine moves exactly one kind of value around: a fixed-size
//! [`Record`]. Its byte width ([`RECORD_SIZE`]) is a compile-time constant so
//! every file offset can be derived without reading a header.

mod record;

pub use record::{RECORD_SIZE, Record};
