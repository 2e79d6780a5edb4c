#![forbid(unsafe_code)]

//! Progressive list configuration.
//!
//! Build a [`ListConfig`] in code with [`ListConfig::new`] and the `with_*`
//! methods, or read one from the environment:
//!
//! | Variable                  | Default | Meaning                              |
//! |---------------------------|---------|--------------------------------------|
//! | `MSGVIEW_INITIAL_LOAD`    | 50      | Items materialized up front          |
//! | `MSGVIEW_LOAD_INCREMENT`  | 50      | Items added per growth step          |
//! | `MSGVIEW_RESET_THRESHOLD` | 10      | Length change that resets the window |
//! | `MSGVIEW_RENDER_METRICS`  | off     | Render instrumentation (`1`/`true`)  |
//! | `MSGVIEW_SENTINEL_MARGIN` | 3       | Rows before the end that count as near |

use std::fmt;

use msgview_runtime::debug_trace::parse_flag;

use super::sentinel::ObserveOptions;

pub const DEFAULT_INITIAL_LOAD: usize = 50;
pub const DEFAULT_LOAD_INCREMENT: usize = 50;
pub const DEFAULT_RESET_THRESHOLD: usize = 10;
pub const DEFAULT_SENTINEL_MARGIN: u16 = 3;
pub const DEFAULT_COMPONENT_NAME: &str = "MessageList";

pub const INITIAL_LOAD_ENV: &str = "MSGVIEW_INITIAL_LOAD";
pub const LOAD_INCREMENT_ENV: &str = "MSGVIEW_LOAD_INCREMENT";
pub const RESET_THRESHOLD_ENV: &str = "MSGVIEW_RESET_THRESHOLD";
pub const RENDER_METRICS_ENV: &str = "MSGVIEW_RENDER_METRICS";
pub const SENTINEL_MARGIN_ENV: &str = "MSGVIEW_SENTINEL_MARGIN";

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `initial_load` must be at least 1.
    ZeroInitialLoad,
    /// `load_increment` must be at least 1.
    ZeroLoadIncrement,
    /// An environment variable could not be parsed.
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroInitialLoad => write!(f, "initial load must be greater than zero"),
            Self::ZeroLoadIncrement => write!(f, "load increment must be greater than zero"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value for {key}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Sizes, thresholds and switches for a [`ProgressiveList`](super::ProgressiveList).
#[derive(Debug, Clone, PartialEq)]
pub struct ListConfig {
    initial_load: usize,
    load_increment: usize,
    reset_threshold: usize,
    instrumentation: bool,
    component_name: String,
    sentinel: ObserveOptions,
    item_height: u16,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            initial_load: DEFAULT_INITIAL_LOAD,
            load_increment: DEFAULT_LOAD_INCREMENT,
            reset_threshold: DEFAULT_RESET_THRESHOLD,
            instrumentation: false,
            component_name: DEFAULT_COMPONENT_NAME.to_string(),
            sentinel: ObserveOptions::default(),
            item_height: 1,
        }
    }
}

impl ListConfig {
    /// Create a configuration with the given load sizes.
    ///
    /// # Errors
    ///
    /// Either size is zero.
    pub fn new(initial_load: usize, load_increment: usize) -> Result<Self, ConfigError> {
        if initial_load == 0 {
            return Err(ConfigError::ZeroInitialLoad);
        }
        if load_increment == 0 {
            return Err(ConfigError::ZeroLoadIncrement);
        }
        Ok(Self {
            initial_load,
            load_increment,
            ..Self::default()
        })
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// A variable is set but unparsable, or a size is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (a stand-in for `std::env::var`).
    ///
    /// # Errors
    ///
    /// A value is set but unparsable, or a size is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let initial_load = parse_number(&lookup, INITIAL_LOAD_ENV)?.unwrap_or(DEFAULT_INITIAL_LOAD);
        let load_increment =
            parse_number(&lookup, LOAD_INCREMENT_ENV)?.unwrap_or(DEFAULT_LOAD_INCREMENT);
        let reset_threshold =
            parse_number(&lookup, RESET_THRESHOLD_ENV)?.unwrap_or(DEFAULT_RESET_THRESHOLD);
        let margin = parse_number(&lookup, SENTINEL_MARGIN_ENV)?.unwrap_or(DEFAULT_SENTINEL_MARGIN);
        let instrumentation = match lookup(RENDER_METRICS_ENV) {
            None => false,
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                key: RENDER_METRICS_ENV,
                value: raw,
            })?,
        };

        let defaults = ObserveOptions::default();
        Ok(Self::new(initial_load, load_increment)?
            .with_reset_threshold(reset_threshold)
            .with_instrumentation(instrumentation)
            .with_sentinel(ObserveOptions { margin, ..defaults }))
    }

    #[must_use]
    pub fn with_reset_threshold(mut self, threshold: usize) -> Self {
        self.reset_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_instrumentation(mut self, enabled: bool) -> Self {
        self.instrumentation = enabled;
        self
    }

    /// Name used for render samples and command namespacing.
    #[must_use]
    pub fn with_component_name(mut self, name: impl Into<String>) -> Self {
        self.component_name = name.into();
        self
    }

    #[must_use]
    pub fn with_sentinel(mut self, options: ObserveOptions) -> Self {
        self.sentinel = options;
        self
    }

    /// Rows per item. Zero is treated as 1.
    #[must_use]
    pub fn with_item_height(mut self, rows: u16) -> Self {
        self.item_height = rows.max(1);
        self
    }

    #[must_use]
    pub fn initial_load(&self) -> usize {
        self.initial_load
    }

    #[must_use]
    pub fn load_increment(&self) -> usize {
        self.load_increment
    }

    #[must_use]
    pub fn reset_threshold(&self) -> usize {
        self.reset_threshold
    }

    #[must_use]
    pub fn instrumentation(&self) -> bool {
        self.instrumentation
    }

    #[must_use]
    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    #[must_use]
    pub fn sentinel(&self) -> ObserveOptions {
        self.sentinel
    }

    #[must_use]
    pub fn item_height(&self) -> u16 {
        self.item_height
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
