//! CI provider definitions and detection.

use crate::env::EnvVars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Supported CI providers.
///
/// Every extractor is total over any environment snapshot and returns `None`
/// for unset variables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CiProvider {
    /// GitHub Actions
    #[serde(rename = "github")]
    GitHubActions,

    /// CircleCI
    #[serde(rename = "circleci")]
    CircleCi,

    /// Buildkite
    #[serde(rename = "buildkite")]
    Buildkite,

    /// GitLab CI
    #[serde(rename = "gitlab")]
    GitLab,

    /// Jenkins
    #[serde(rename = "jenkins")]
    Jenkins,

    /// Any system that only sets the generic `CI` flag.
    #[serde(rename = "ci")]
    Generic,
}

/// Detection order. Named providers come first; `Generic` matches any
/// environment with `CI` set and therefore has to stay last.
pub const PROVIDERS: [CiProvider; 6] = [
    CiProvider::GitHubActions,
    CiProvider::CircleCi,
    CiProvider::Buildkite,
    CiProvider::GitLab,
    CiProvider::Jenkins,
    CiProvider::Generic,
];

/// Return the first provider in [`PROVIDERS`] whose activation signal is set.
pub fn detect(env: &EnvVars) -> Option<CiProvider> {
    let provider = PROVIDERS.into_iter().find(|p| p.is_active(env));
    tracing::debug!(provider = ?provider.map(|p| p.name()), "CI provider detection");
    provider
}

impl CiProvider {
    /// Stable identifier used in tags.
    pub fn name(&self) -> &'static str {
        match self {
            CiProvider::GitHubActions => "github",
            CiProvider::CircleCi => "circleci",
            CiProvider::Buildkite => "buildkite",
            CiProvider::GitLab => "gitlab",
            CiProvider::Jenkins => "jenkins",
            CiProvider::Generic => "ci",
        }
    }

    /// Look a provider up by its stable identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        PROVIDERS.into_iter().find(|p| p.name() == name)
    }

    /// The variable whose presence marks this provider as active.
    pub fn activation_var(&self) -> &'static str {
        match self {
            CiProvider::GitHubActions => "GITHUB_ACTIONS",
            CiProvider::CircleCi => "CIRCLECI",
            CiProvider::Buildkite => "BUILDKITE",
            CiProvider::GitLab => "GITLAB_CI",
            CiProvider::Jenkins => "JENKINS_URL",
            CiProvider::Generic => "CI",
        }
    }

    pub fn is_active(&self, env: &EnvVars) -> bool {
        env.is_set(self.activation_var())
    }

    /// Repository slug (`owner/name` or project path where the provider has one).
    pub fn repository(&self, env: &EnvVars) -> Option<String> {
        match self {
            CiProvider::GitHubActions => env.get_owned("GITHUB_REPOSITORY"),
            CiProvider::CircleCi => env.get_owned("CIRCLE_PROJECT_REPONAME"),
            CiProvider::GitLab => env.get_owned("CI_PROJECT_PATH"),
            CiProvider::Buildkite | CiProvider::Jenkins | CiProvider::Generic => None,
        }
    }

    pub fn branch(&self, env: &EnvVars) -> Option<String> {
        match self {
            CiProvider::GitHubActions => env.get_owned("GITHUB_REF_NAME"),
            CiProvider::CircleCi => env.get_owned("CIRCLE_BRANCH"),
            CiProvider::Buildkite => env.get_owned("BUILDKITE_BRANCH"),
            CiProvider::GitLab => env.get_owned("CI_COMMIT_BRANCH"),
            CiProvider::Jenkins | CiProvider::Generic => None,
        }
    }

    pub fn commit_sha(&self, env: &EnvVars) -> Option<String> {
        match self {
            CiProvider::GitHubActions => env.get_owned("GITHUB_SHA"),
            CiProvider::CircleCi => env.get_owned("CIRCLE_SHA1"),
            CiProvider::Buildkite => env.get_owned("BUILDKITE_COMMIT"),
            CiProvider::GitLab => env.get_owned("CI_COMMIT_SHA"),
            CiProvider::Jenkins | CiProvider::Generic => None,
        }
    }

    /// Link to the build/run page.
    ///
    /// GitHub has no single variable for it; the URL is composed from the
    /// server, repository and run id, and only when all three are present.
    pub fn run_url(&self, env: &EnvVars) -> Option<String> {
        match self {
            CiProvider::GitHubActions => {
                let server = env.get("GITHUB_SERVER_URL")?;
                let repo = env.get("GITHUB_REPOSITORY")?;
                let run_id = env.get("GITHUB_RUN_ID")?;
                Some(format!("{}/{}/actions/runs/{}", server, repo, run_id))
            }
            CiProvider::CircleCi => env.get_owned("CIRCLE_BUILD_URL"),
            CiProvider::Buildkite => env.get_owned("BUILDKITE_BUILD_URL"),
            CiProvider::Jenkins => env.get_owned("BUILD_URL"),
            CiProvider::GitLab | CiProvider::Generic => None,
        }
    }

    pub fn workflow_id(&self, env: &EnvVars) -> Option<String> {
        match self {
            CiProvider::GitHubActions => env.get_owned("GITHUB_RUN_ID"),
            CiProvider::CircleCi => env.get_owned("CIRCLE_WORKFLOW_ID"),
            CiProvider::Buildkite => env.get_owned("BUILDKITE_PIPELINE_ID"),
            CiProvider::GitLab | CiProvider::Jenkins | CiProvider::Generic => None,
        }
    }

    /// Variables captured by [`CiProvider::env_snapshot`].
    pub fn snapshot_keys(&self) -> &'static [&'static str] {
        match self {
            CiProvider::GitHubActions => &[
                "CI",
                "GITHUB_ACTIONS",
                "GITHUB_SERVER_URL",
                "GITHUB_REPOSITORY",
                "GITHUB_RUN_ID",
                "GITHUB_REF_NAME",
                "GITHUB_SHA",
            ],
            CiProvider::CircleCi => &[
                "CI",
                "CIRCLECI",
                "CIRCLE_WORKFLOW_ID",
                "CIRCLE_BUILD_URL",
                "CIRCLE_BRANCH",
                "CIRCLE_SHA1",
                "CIRCLE_PROJECT_REPONAME",
            ],
            CiProvider::Buildkite => &[
                "CI",
                "BUILDKITE",
                "BUILDKITE_BUILD_URL",
                "BUILDKITE_BRANCH",
                "BUILDKITE_COMMIT",
                "BUILDKITE_PIPELINE_ID",
            ],
            CiProvider::GitLab => &[
                "CI",
                "GITLAB_CI",
                "CI_PROJECT_PATH",
                "CI_COMMIT_BRANCH",
                "CI_COMMIT_SHA",
            ],
            CiProvider::Jenkins => &["CI", "JENKINS_URL", "BUILD_URL"],
            CiProvider::Generic => &["CI"],
        }
    }

    /// Allow-listed debugging context. Always contains exactly the
    /// [`snapshot_keys`](CiProvider::snapshot_keys), unset ones as `None`.
    pub fn env_snapshot(&self, env: &EnvVars) -> BTreeMap<String, Option<String>> {
        self.snapshot_keys()
            .iter()
            .map(|key| (key.to_string(), env.get_owned(key)))
            .collect()
    }
}

impl fmt::Display for CiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
