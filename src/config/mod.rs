//! Guardian Configuration Module
//!
//! Provides the service configuration loaded from a TOML file, replacing the
//! hardcoded voting, cooldown and admission constants with operator-tunable
//! values.
//!
//! ## Loading Order
//!
//! 1. `GUARDIAN_CONFIG` environment variable (path to TOML file)
//! 2. `guardian_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! The configuration is loaded once in `main()` and handed to the components
//! that need it through an `Arc`; nothing reads it from a global.
//!
//! ```ignore
//! let config = Arc::new(GuardianConfig::load());
//! let registry = AggregationRegistry::new(&config);
//! ```

mod guardian_config;
pub mod defaults;

pub use guardian_config::*;
