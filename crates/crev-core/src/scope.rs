use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Artifact selection used by export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Narrative summaries: filename contains `.ai.`
    #[default]
    Ai,
    /// Raw assembled context: filename contains `.context.`
    Context,
    /// Every file.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope '{0}' (expected ai, context, or all)")]
pub struct ScopeParseError(String);

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Ai => "ai",
            Scope::Context => "context",
            Scope::All => "all",
        }
    }

    /// Match on the file name only, never on content.
    pub fn matches(self, file_name: &str) -> bool {
        match self {
            Scope::Ai => file_name.contains(".ai."),
            Scope::Context => file_name.contains(".context."),
            Scope::All => true,
        }
    }

    /// Match on the last segment of a `/`-separated path.
    pub fn matches_path(self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.matches(name)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ScopeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(Scope::Ai),
            "context" => Ok(Scope::Context),
            "all" => Ok(Scope::All),
            other => Err(ScopeParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_scope_selects_ai_infix_only() {
        assert!(Scope::Ai.matches("summary.pr.7.ai.md"));
        assert!(Scope::Ai.matches("sum.repo.ai.md"));
        assert!(!Scope::Ai.matches("sum.context.md"));
        assert!(!Scope::Ai.matches("diff.txt"));
        assert!(!Scope::Ai.matches("main.ai"));
    }

    #[test]
    fn context_scope_selects_context_infix_only() {
        assert!(Scope::Context.matches("sum.context.md"));
        assert!(!Scope::Context.matches("summary.pr.7.ai.md"));
    }

    #[test]
    fn all_scope_matches_everything() {
        assert!(Scope::All.matches("diff.txt"));
        assert!(Scope::All.matches("anything"));
    }

    #[test]
    fn matches_path_uses_file_name() {
        assert!(!Scope::Ai.matches_path("repos/x.ai.dir/readme.md"));
        assert!(Scope::Ai.matches_path("repos/a/b/.crev/sum.repo.ai.md"));
    }

    #[test]
    fn parse_round_trips_names() {
        for s in [Scope::Ai, Scope::Context, Scope::All] {
            assert_eq!(s.as_str().parse::<Scope>().unwrap(), s);
        }
        assert!("AI".parse::<Scope>().is_err());
    }
}
