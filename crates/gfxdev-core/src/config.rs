//! Render context configuration
//!
//! The redirection stack holds 16 surfaces unless told otherwise, and an
//! overflowing push is reported as a warning. Both are plain settings here,
//! as is the display scale new HiDPI surfaces start from.
//!
//! # Environment Variables
//!
//! ```bash
//! GFXDEV_STACK_CAPACITY=32 GFXDEV_OVERFLOW=strict GFXDEV_SCALE=2 ./my_app
//! ```
//!
//! - `GFXDEV_STACK_CAPACITY`: positive integer
//! - `GFXDEV_OVERFLOW`: `warn` or `strict`
//! - `GFXDEV_SCALE`: positive number

use crate::error::{GfxError, Result};

/// Default number of saved surfaces on the redirection stack
pub const DEFAULT_STACK_CAPACITY: usize = 16;

/// How an overflowing `push_current` is reported
///
/// The push is refused and an error returned either way; the policy only
/// picks how loudly it is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Log a warning
    #[default]
    Warn,
    /// Log an error
    Strict,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = GfxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "warn" | "warning" => Ok(OverflowPolicy::Warn),
            "strict" | "error" => Ok(OverflowPolicy::Strict),
            other => Err(GfxError::Config(format!(
                "unknown overflow policy '{other}' (expected 'warn' or 'strict')"
            ))),
        }
    }
}

/// Settings for a [`RenderContext`](crate::context::RenderContext)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextConfig {
    pub stack_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Device pixels per logical unit for HiDPI surfaces
    pub display_scale: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            overflow_policy: OverflowPolicy::Warn,
            display_scale: 1.0,
        }
    }
}

impl ContextConfig {
    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_display_scale(mut self, scale: f64) -> Self {
        self.display_scale = scale;
        self
    }

    /// Defaults overridden by `GFXDEV_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("GFXDEV_STACK_CAPACITY") {
            config.stack_capacity = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(GfxError::Config(format!(
                        "GFXDEV_STACK_CAPACITY must be a positive integer, got '{value}'"
                    )))
                },
            };
        }

        if let Some(value) = lookup("GFXDEV_OVERFLOW") {
            config.overflow_policy = value.parse()?;
        }

        if let Some(value) = lookup("GFXDEV_SCALE") {
            config.display_scale = match value.trim().parse::<f64>() {
                Ok(s) if s.is_finite() && s > 0.0 => s,
                _ => {
                    return Err(GfxError::Config(format!(
                        "GFXDEV_SCALE must be a positive number, got '{value}'"
                    )))
                },
            };
        }

        log::debug!("Context config: {config:?}");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults() {
        let config = ContextConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ContextConfig::default());
        assert_eq!(config.stack_capacity, 16);
        assert_eq!(config.overflow_policy, OverflowPolicy::Warn);
    }

    #[test]
    fn test_overrides() {
        let config = ContextConfig::from_lookup(lookup(&[
            ("GFXDEV_STACK_CAPACITY", "4"),
            ("GFXDEV_OVERFLOW", "Strict"),
            ("GFXDEV_SCALE", "2.5"),
        ]))
        .unwrap();
        assert_eq!(config.stack_capacity, 4);
        assert_eq!(config.overflow_policy, OverflowPolicy::Strict);
        assert_eq!(config.display_scale, 2.5);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = ContextConfig::from_lookup(lookup(&[("GFXDEV_STACK_CAPACITY", "0")]));
        assert!(matches!(err, Err(GfxError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_scale() {
        let err = ContextConfig::from_lookup(lookup(&[("GFXDEV_SCALE", "-1")]));
        assert!(matches!(err, Err(GfxError::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!("panic".parse::<OverflowPolicy>().is_err());
    }
}
