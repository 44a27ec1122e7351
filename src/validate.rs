// ✅ Validation Engine - admission rules for proposed code/title pairs
// Pure decision functions over the lookup index; no side effects.

use crate::index::LookupIndex;
use std::fmt;

/// Shortest admissible job code, after trimming
pub const MIN_CODE_LEN: usize = 3;

// ============================================================================
// DECISIONS
// ============================================================================

/// Outcome of checking a proposed job code against the committed catalog.
///
/// `Accepted` carries the trimmed code the rest of the workflow should use;
/// the other variants carry whatever the operator needs to see to recover.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeDecision {
    Accepted {
        code: String,
    },
    Duplicate {
        code: String,
        existing_title: String,
    },
    TooShort {
        code: String,
    },
}

impl CodeDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CodeDecision::Accepted { .. })
    }

    /// Stable tag for API payloads
    pub fn kind(&self) -> &'static str {
        match self {
            CodeDecision::Accepted { .. } => "accepted",
            CodeDecision::Duplicate { .. } => "duplicate_code",
            CodeDecision::TooShort { .. } => "too_short",
        }
    }
}

impl fmt::Display for CodeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeDecision::Accepted { code } => {
                write!(f, "Job code '{}' is unique", code)
            }
            CodeDecision::Duplicate {
                code,
                existing_title,
            } => {
                write!(
                    f,
                    "Job code '{}' already exists with title '{}'",
                    code, existing_title
                )
            }
            CodeDecision::TooShort { .. } => {
                write!(f, "Minimum job code length is {} characters", MIN_CODE_LEN)
            }
        }
    }
}

/// Outcome of checking a proposed job title.
///
/// A duplicate title is a warning, not a hard stop: the workflow still
/// advances, the operator decides whether to proceed.
#[derive(Debug, Clone, PartialEq)]
pub enum TitleDecision {
    Accepted {
        title: String,
    },
    Duplicate {
        title: String,
        existing_codes: Vec<String>,
    },
    Empty,
}

impl TitleDecision {
    /// Only an empty title blocks the workflow
    pub fn is_blocking(&self) -> bool {
        matches!(self, TitleDecision::Empty)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TitleDecision::Accepted { .. } => "accepted",
            TitleDecision::Duplicate { .. } => "duplicate_title",
            TitleDecision::Empty => "empty",
        }
    }
}

impl fmt::Display for TitleDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleDecision::Accepted { title } => {
                write!(f, "Job title '{}' is unique", title)
            }
            TitleDecision::Duplicate {
                title,
                existing_codes,
            } => {
                write!(
                    f,
                    "Job title '{}' already exists with code(s): {}",
                    title,
                    existing_codes.join(", ")
                )
            }
            TitleDecision::Empty => write!(f, "Job title cannot be empty"),
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Decide whether a proposed job code may be admitted.
///
/// Trims, then rejects codes shorter than [`MIN_CODE_LEN`], then reports a
/// duplicate (with the existing title) on an exact case-sensitive hit.
/// Checks run against the committed catalog only, never against another
/// session's pending entry.
pub fn validate_code(index: &LookupIndex, raw: &str) -> CodeDecision {
    let code = raw.trim();

    if code.chars().count() < MIN_CODE_LEN {
        return CodeDecision::TooShort {
            code: code.to_string(),
        };
    }

    if let Some(existing) = index.exact_code(code) {
        return CodeDecision::Duplicate {
            code: code.to_string(),
            existing_title: existing.title.clone(),
        };
    }

    CodeDecision::Accepted {
        code: code.to_string(),
    }
}

/// Decide whether a proposed job title may be admitted.
///
/// Trims, rejects empty input, and reports every code already sharing the
/// normalized (trim + lowercase) title.
pub fn validate_title(index: &LookupIndex, raw: &str) -> TitleDecision {
    let title = raw.trim();

    if title.is_empty() {
        return TitleDecision::Empty;
    }

    let existing = index.exact_title(title);
    if !existing.is_empty() {
        return TitleDecision::Duplicate {
            title: title.to_string(),
            existing_codes: existing.iter().map(|e| e.code.clone()).collect(),
        };
    }

    TitleDecision::Accepted {
        title: title.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
