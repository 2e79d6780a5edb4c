#![forbid(unsafe_code)]

//! Core: canonical input events and geometry shared by the msgview crates.

pub mod event;
pub mod geometry;
