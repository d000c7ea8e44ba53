//! Resolved CI context for one process.

use crate::env::EnvVars;
use crate::provider::{detect, CiProvider};
use serde::Serialize;
use std::collections::BTreeMap;

/// Runtime environment name set by the host test process.
pub const RUNTIME_ENV: &str = "NODE_ENV";

/// Build identity resolved from a single detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CiContext {
    /// Active provider, `None` for local runs.
    pub provider: Option<CiProvider>,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub run_url: Option<String>,
    pub workflow_id: Option<String>,
    /// Allow-listed variables of the active provider (empty for local runs).
    pub env: BTreeMap<String, Option<String>>,
}

impl CiContext {
    /// Detect the provider in `env` and extract everything it exposes.
    pub fn from_env(env: &EnvVars) -> Self {
        match detect(env) {
            Some(provider) => Self {
                provider: Some(provider),
                repository: provider.repository(env),
                branch: provider.branch(env),
                commit_sha: provider.commit_sha(env),
                run_url: provider.run_url(env),
                workflow_id: provider.workflow_id(env),
                env: provider.env_snapshot(env),
            },
            None => Self::local(),
        }
    }

    /// Context for a run outside CI.
    pub fn local() -> Self {
        Self::default()
    }

    pub fn provider_name(&self) -> Option<&'static str> {
        self.provider.map(|p| p.name())
    }

    pub fn is_ci(&self) -> bool {
        self.provider.is_some()
    }

    /// Default deployment environment name: `ci` under CI, else the
    /// runtime's [`RUNTIME_ENV`] when set, else `local`.
    pub fn infer_environment(&self, env: &EnvVars) -> String {
        if self.is_ci() {
            return "ci".to_string();
        }
        env.get_owned(RUNTIME_ENV)
            .unwrap_or_else(|| "local".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_context() {
        let env = EnvVars::new().with("HOME", "/root");
        let ctx = CiContext::from_env(&env);
        assert_eq!(ctx, CiContext::local());
        assert_eq!(ctx.infer_environment(&env), "local");
        assert!(ctx.env.is_empty());
    }

    #[test]
    fn test_circleci_context() {
        let env = EnvVars::new()
            .with("CI", "true")
            .with("CIRCLECI", "true")
            .with("CIRCLE_PROJECT_REPONAME", "widgets")
            .with("CIRCLE_BRANCH", "main")
            .with("CIRCLE_SHA1", "deadbeef")
            .with("CIRCLE_BUILD_URL", "https://circleci.com/gh/acme/widgets/7")
            .with("CIRCLE_WORKFLOW_ID", "wf-1");
        let ctx = CiContext::from_env(&env);

        assert_eq!(ctx.provider_name(), Some("circleci"));
        assert_eq!(ctx.repository.as_deref(), Some("widgets"));
        assert_eq!(ctx.branch.as_deref(), Some("main"));
        assert_eq!(ctx.commit_sha.as_deref(), Some("deadbeef"));
        assert_eq!(ctx.workflow_id.as_deref(), Some("wf-1"));
        assert_eq!(ctx.infer_environment(&env), "ci");
        assert_eq!(ctx.env.len(), 7);
    }

    #[test]
    fn test_runtime_env_names_local_environment() {
        let env = EnvVars::new().with(RUNTIME_ENV, "test");
        let ctx = CiContext::from_env(&env);
        assert_eq!(ctx.infer_environment(&env), "test");
        assert_eq!(
            ctx.infer_environment(&EnvVars::new().with(RUNTIME_ENV, "")),
            "local"
        );

        let ci = EnvVars::new().with("CI", "true").with(RUNTIME_ENV, "test");
        assert_eq!(CiContext::from_env(&ci).infer_environment(&ci), "ci");
    }
}
