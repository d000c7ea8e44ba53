//! failcast CI - build context detection
//!
//! Identifies which continuous-integration system a process runs under and
//! extracts its identity fields from an environment-variable snapshot:
//! - `EnvVars`: read-only environment map (empty values read as unset)
//! - `CiProvider`: the fixed set of supported providers, in priority order
//! - `CiContext`: everything resolved for one detection pass
//!
//! Detection is pure: nothing here reads the process environment except
//! [`EnvVars::from_process`].

pub mod context;
pub mod env;
pub mod provider;

pub use context::CiContext;
pub use env::EnvVars;
pub use provider::{detect, CiProvider, PROVIDERS};

/// failcast-ci version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
