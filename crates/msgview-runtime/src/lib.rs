#![forbid(unsafe_code)]

//! msgview runtime
//!
//! Host-facing plumbing shared by the message list widgets.
//!
//! # Key Components
//!
//! - [`FrameScheduler`] - Single-slot, latest-wins deferral of render work
//! - [`CommandRegistry`] - Explicit keyboard-command registry with scoped guards
//! - [`RenderProbe`] - Optional render timing forwarded to a [`RenderSampleSink`]
//! - [`debug_trace!`] - Env-gated stderr diagnostics
//!
//! # How it fits in the system
//! `msgview-core` provides the input types, this crate decides *when* work runs
//! and *who* receives a key, and `msgview-widgets` owns the list state that
//! the work mutates.

pub mod commands;
pub mod debug_trace;
pub mod frame_scheduler;
pub mod instrumentation;

pub use commands::{CommandError, CommandGuard, CommandRegistry, CommandSpec, KeyBinding};
pub use frame_scheduler::{FrameScheduler, FrameToken, ScheduledWork, SchedulerStats};
pub use instrumentation::{
    RenderProbe, RenderSample, RenderSampleSink, RenderTimer, SampleLog, SinkError, TracingSink,
};
