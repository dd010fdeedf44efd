// Logging utilities for credkit
//
// This module provides:
// - Component-based structured logging on top of the `log` facade
// - Store context tracking through logger inheritance
// - Optional credential label context for per-record tracing
// - One-shot `env_logger` initialisation from a serde config

use log::Level;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Arguments, Display, Formatter};

/// Predefined components for logging categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Keys,
    Store,
    Generator,
    Identity,
    Custom(&'static str),
}

impl Component {
    /// Get the string representation of the component
    pub fn as_str(&self) -> &str {
        match self {
            Component::Keys => "Keys",
            Component::Store => "Store",
            Component::Generator => "Generator",
            Component::Identity => "Identity",
            Component::Custom(name) => name,
        }
    }
}

// Lightweight Display helpers to avoid prefix String allocations
struct ComponentPrefixDisplay {
    parent: Option<Component>,
    component: Component,
}

impl Display for ComponentPrefixDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) if parent != self.component => {
                write!(f, "{}.{}", parent.as_str(), self.component.as_str())
            }
            _ => write!(f, "{}", self.component.as_str()),
        }
    }
}

struct MaybeLabelDisplay<'a>(Option<&'a str>);

impl Display for MaybeLabelDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(label) = self.0 {
            write!(f, "|label={label}")
        } else {
            Ok(())
        }
    }
}

/// A helper for creating component-specific loggers with store context
#[derive(Debug, Clone)]
pub struct Logger {
    /// Component this logger is for
    component: Component,
    /// Identifies the credential store (or application) the logger belongs to
    context: String,
    /// Parent component for hierarchical logging (if any)
    parent_component: Option<Component>,
    /// Credential label the current operation targets
    label: Option<String>,
}

impl Logger {
    /// Create a new root logger for a component and store context
    pub fn new_root(component: Component, context: &str) -> Self {
        Self {
            component,
            context: context.to_string(),
            parent_component: None,
            label: None,
        }
    }

    /// Create a child logger with the same context but a different component
    pub fn with_component(&self, component: Component) -> Self {
        Self {
            component,
            context: self.context.clone(),
            parent_component: Some(self.component),
            label: self.label.clone(),
        }
    }

    /// Create a logger that tags every line with a credential label
    pub fn with_label(&self, label: impl Into<String>) -> Self {
        Self {
            component: self.component,
            context: self.context.clone(),
            parent_component: self.parent_component,
            label: Some(label.into()),
        }
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn emit(&self, level: Level, args: Arguments) {
        if log::log_enabled!(level) {
            log::log!(
                level,
                "[{}][{}{}] {}",
                self.context,
                ComponentPrefixDisplay {
                    parent: self.parent_component,
                    component: self.component,
                },
                MaybeLabelDisplay(self.label()),
                args
            );
        }
    }

    /// Log a debug message
    pub fn debug(&self, message: impl Into<String>) {
        if log::log_enabled!(Level::Debug) {
            self.emit(Level::Debug, format_args!("{}", message.into()));
        }
    }

    /// Log a debug message using fmt::Arguments (avoids allocating message String)
    pub fn debug_args(&self, args: Arguments) {
        self.emit(Level::Debug, args);
    }

    /// Log an info message
    pub fn info(&self, message: impl Into<String>) {
        if log::log_enabled!(Level::Info) {
            self.emit(Level::Info, format_args!("{}", message.into()));
        }
    }

    pub fn info_args(&self, args: Arguments) {
        self.emit(Level::Info, args);
    }

    /// Log a warning message
    pub fn warn(&self, message: impl Into<String>) {
        if log::log_enabled!(Level::Warn) {
            self.emit(Level::Warn, format_args!("{}", message.into()));
        }
    }

    pub fn warn_args(&self, args: Arguments) {
        self.emit(Level::Warn, args);
    }

    /// Log an error message
    pub fn error(&self, message: impl Into<String>) {
        if log::log_enabled!(Level::Error) {
            self.emit(Level::Error, format_args!("{}", message.into()));
        }
    }

    pub fn error_args(&self, args: Arguments) {
        self.emit(Level::Error, args);
    }
}

/// Log level accepted in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Logging configuration for applications embedding credkit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Install `env_logger` with this level. `RUST_LOG` still overrides
    /// per-module filters. Calling this more than once is a no-op.
    pub fn init(&self) -> anyhow::Result<()> {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(self.level.into());
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        // A logger installed earlier (e.g. by the host application) wins.
        let _ = builder.try_init();
        Ok(())
    }
}
