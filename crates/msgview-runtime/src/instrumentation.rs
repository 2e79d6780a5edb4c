#![forbid(unsafe_code)]

//! Render-time instrumentation.
//!
//! A [`RenderProbe`] brackets one window render: [`RenderProbe::start`] before,
//! [`RenderProbe::finish`] after. The finished [`RenderSample`] carries the
//! component name, the number of materialized items and the elapsed time, and
//! is handed to a [`RenderSampleSink`] (a performance HUD, a metrics exporter,
//! or just the log).
//!
//! # Invariants
//!
//! - A disabled probe never reads the clock and never allocates.
//! - The probe only observes. It has no access to the state being rendered.
//! - Sink failures are logged and counted, never propagated.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One measured render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSample {
    /// Component that rendered.
    pub component: String,
    /// Items materialized by the render.
    pub materialized: usize,
    /// Wall time spent rendering.
    pub elapsed: Duration,
}

impl RenderSample {
    /// Elapsed time in fractional milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1_000.0
    }
}

/// Collector failure reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkError {
    message: String,
}

impl SinkError {
    /// Create an error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "render sample sink failed: {}", self.message)
    }
}

impl std::error::Error for SinkError {}

/// Receiver for render samples.
pub trait RenderSampleSink: Send + Sync {
    /// Record one sample.
    fn record(&self, sample: &RenderSample) -> Result<(), SinkError>;
}

/// Sink that emits each sample as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl RenderSampleSink for TracingSink {
    fn record(&self, sample: &RenderSample) -> Result<(), SinkError> {
        tracing::debug!(
            component = %sample.component,
            materialized = sample.materialized,
            elapsed_us = u64::try_from(sample.elapsed.as_micros()).unwrap_or(u64::MAX),
            "render sample"
        );
        Ok(())
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SampleLog {
    samples: Arc<Mutex<Vec<RenderSample>>>,
}

impl SampleLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded sample, oldest first.
    #[must_use]
    pub fn samples(&self) -> Vec<RenderSample> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget recorded samples.
    pub fn clear(&self) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl RenderSampleSink for SampleLog {
    fn record(&self, sample: &RenderSample) -> Result<(), SinkError> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample.clone());
        Ok(())
    }
}

/// Start time of an in-flight measurement.
#[derive(Debug, Clone, Copy)]
pub struct RenderTimer {
    started: Instant,
}

/// Measures renders for one component.
#[derive(Clone)]
pub struct RenderProbe {
    component: String,
    sink: Option<Arc<dyn RenderSampleSink>>,
    recorded: u64,
    failures: u64,
}

impl fmt::Debug for RenderProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderProbe")
            .field("component", &self.component)
            .field("enabled", &self.is_enabled())
            .field("recorded", &self.recorded)
            .field("failures", &self.failures)
            .finish()
    }
}

impl RenderProbe {
    /// Probe that measures nothing.
    #[must_use]
    pub fn disabled(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            sink: None,
            recorded: 0,
            failures: 0,
        }
    }

    /// Probe forwarding samples to `sink`.
    #[must_use]
    pub fn new(component: impl Into<String>, sink: Arc<dyn RenderSampleSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::disabled(component)
        }
    }

    /// Build from a configuration flag.
    ///
    /// An enabled probe without an explicit sink logs through [`TracingSink`].
    #[must_use]
    pub fn from_flag(
        component: impl Into<String>,
        enabled: bool,
        sink: Option<Arc<dyn RenderSampleSink>>,
    ) -> Self {
        if !enabled {
            return Self::disabled(component);
        }
        let sink: Arc<dyn RenderSampleSink> = match sink {
            Some(sink) => sink,
            None => Arc::new(TracingSink),
        };
        Self::new(component, sink)
    }

    /// Whether renders are measured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Component name reported with each sample.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Samples successfully delivered.
    #[must_use]
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Samples the sink rejected.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Begin a measurement. Returns `None` (without reading the clock) when disabled.
    #[inline]
    #[must_use]
    pub fn start(&self) -> Option<RenderTimer> {
        self.sink.as_ref().map(|_| RenderTimer {
            started: Instant::now(),
        })
    }

    /// Finish a measurement and forward the sample.
    ///
    /// Returns the sample that was offered to the sink, delivered or not.
    pub fn finish(&mut self, timer: Option<RenderTimer>, materialized: usize) -> Option<RenderSample> {
        let timer = timer?;
        let sink = self.sink.as_ref()?;
        let sample = RenderSample {
            component: self.component.clone(),
            materialized,
            elapsed: timer.started.elapsed(),
        };
        match sink.record(&sample) {
            Ok(()) => self.recorded += 1,
            Err(err) => {
                self.failures += 1;
                tracing::warn!(
                    component = %self.component,
                    error = %err,
                    "render sample dropped"
                );
            }
        }
        Some(sample)
    }
}
