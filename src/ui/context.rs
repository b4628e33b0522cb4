//! UI context for detecting interactive vs CI environments

use std::io::IsTerminal;

/// CI providers, by the environment variable that identifies them
const CI_PROVIDERS: &[(&str, &str)] = &[
    ("GITHUB_ACTIONS", "GitHub Actions"),
    ("GITLAB_CI", "GitLab CI"),
    ("CIRCLECI", "CircleCI"),
    ("TRAVIS", "Travis CI"),
    ("JENKINS_URL", "Jenkins"),
    ("BUILDKITE", "Buildkite"),
    ("TEAMCITY_VERSION", "TeamCity"),
    ("TF_BUILD", "Azure Pipelines"),
];

/// UI context that determines output behavior
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Whether running in an interactive terminal
    interactive: bool,
    /// Whether --yes flag was passed (auto-approve prompts)
    auto_yes: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: Self::detect_interactive(),
            auto_yes: false,
        }
    }

    /// Create a non-interactive context (for testing or explicit CI mode)
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    /// Set auto-yes mode (bypass prompts with defaults)
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Check if we should use fancy output (spinners, colors)
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }

    /// Name of the CI provider we are running under, if any
    pub fn ci_provider() -> Option<&'static str> {
        CI_PROVIDERS
            .iter()
            .find(|(var, _)| std::env::var_os(var).is_some())
            .map(|(_, name)| *name)
            .or_else(|| std::env::var_os("CI").map(|_| "CI"))
    }

    fn detect_interactive() -> bool {
        std::io::stdout().is_terminal()
            && std::io::stdin().is_terminal()
            && Self::ci_provider().is_none()
    }
}
