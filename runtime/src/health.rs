//! Component health reporting.
//!
//! Each component produces a [`HealthCheck`]; a [`HealthReport`] folds them
//! into one status, the worst of its parts.

use std::collections::BTreeMap;
use std::fmt;

/// Health levels, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthStatus {
    /// Working normally
    Healthy,
    /// Working, but the last attempt at something failed
    Degraded,
    /// Not accepting work
    Unhealthy,
}

impl HealthStatus {
    /// `true` for [`HealthStatus::Healthy`]
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// `true` for [`HealthStatus::Degraded`]
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Health of one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// Component name, e.g. `store` or `sync`
    pub component: String,
    /// Current level
    pub status: HealthStatus,
    /// Why the component is not healthy
    pub message: Option<String>,
    /// Counters and other details, sorted by key
    pub details: BTreeMap<String, String>,
}

impl HealthCheck {
    fn with_status(component: impl Into<String>, status: HealthStatus, message: Option<String>) -> Self {
        Self {
            component: component.into(),
            status,
            message,
            details: BTreeMap::new(),
        }
    }

    /// A healthy component
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self::with_status(component, HealthStatus::Healthy, None)
    }

    /// A degraded component, with the reason
    #[must_use]
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(component, HealthStatus::Degraded, Some(message.into()))
    }

    /// An unhealthy component, with the reason
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(component, HealthStatus::Unhealthy, Some(message.into()))
    }

    /// Attach a detail; a repeated key overwrites the earlier value
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// Value of a detail
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

/// Health of the whole application
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Worst status among the checks
    pub status: HealthStatus,
    /// Per-component checks, in the order given
    pub checks: Vec<HealthCheck>,
    /// When the report was assembled
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Combine component checks
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            checks,
            checked_at: chrono::Utc::now(),
        }
    }

    /// `true` when every check is healthy
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// The check for `component`, if present
    #[must_use]
    pub fn check(&self, component: &str) -> Option<&HealthCheck> {
        self.checks.iter().find(|check| check.component == component)
    }
}
