//! UI context for detecting GitHub Actions vs local runs

use std::io::IsTerminal;

/// UI context that determines output behavior
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Whether workflow commands (`::group::`, `::add-mask::`) are understood
    actions: bool,
    /// Whether stdout is a terminal that renders colors
    styled: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        let actions = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
        Self {
            actions,
            styled: !actions && std::io::stdout().is_terminal(),
        }
    }

    /// Plain output without workflow commands (for testing and local runs)
    pub fn plain() -> Self {
        Self {
            actions: false,
            styled: false,
        }
    }

    /// Force GitHub Actions output
    pub fn actions() -> Self {
        Self {
            actions: true,
            styled: false,
        }
    }

    /// Check if we're running inside a GitHub Actions job
    pub fn is_actions(&self) -> bool {
        self.actions
    }

    /// Check if we should use colors
    pub fn use_styled_output(&self) -> bool {
        self.styled
    }
}
