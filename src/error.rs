//! Error taxonomy.
//!
//! Every fatal condition maps to one of four concrete error types, mirroring
//! the stage of the pipeline that detected it:
//!
//! ```text
//! template text ── parse ──── TemplateSyntaxError
//!                  validate ─ TemplateValidationError
//!                  compile ── PatternCompileError
//! input text ───── run ────── MatchRuntimeError
//! ```
//!
//! All four convert into the umbrella [`Error`] for callers that treat the
//! pipeline as one fallible operation. None of these are retried internally:
//! given the same template and input they are deterministic.
//!
//! Unmatched input lines are *not* errors; the runtime skips them silently
//! and only counts them in run metrics.

use thiserror::Error;

/// Umbrella error for the parse → validate → compile → run pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] TemplateSyntaxError),

    #[error(transparent)]
    Validation(#[from] TemplateValidationError),

    #[error(transparent)]
    PatternCompile(#[from] PatternCompileError),

    #[error(transparent)]
    MatchRuntime(#[from] MatchRuntimeError),
}

/// Malformed template text. Fatal to parsing; cites the offending line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template syntax error at line {line}: {message}")]
pub struct TemplateSyntaxError {
    /// 1-based line number in the template text.
    pub line: usize,
    pub message: String,
}

/// Structurally invalid template, detected after parsing and before any
/// matching attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateValidationError {
    #[error("template has no Start state")]
    MissingStart,

    #[error("template declares no values")]
    NoValues,

    #[error("duplicate state '{0}'")]
    DuplicateState(String),

    #[error("duplicate value '{0}'")]
    DuplicateValue(String),

    #[error("state '{state}' transitions to undeclared state '{target}'")]
    UnknownState { state: String, target: String },

    #[error("state '{state}' references undeclared variable '{variable}'")]
    UndeclaredVariable { state: String, variable: String },

    #[error("reserved state 'EOF' must not contain rules")]
    RulesInEof,
}

/// A rule's assembled regex was rejected by the regex engine.
#[derive(Debug, Error)]
#[error("cannot compile pattern at line {line} in state '{state}': {source}")]
pub struct PatternCompileError {
    pub state: String,
    /// 1-based template line number of the offending rule.
    pub line: usize,
    #[source]
    pub source: regex::Error,
}

/// The engine aborted mid-run. No partial table is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchRuntimeError {
    /// An `Error` action fired.
    #[error("template aborted in state '{state}' on input line {line}: {message}")]
    ErrorAction { state: String, line: usize, message: String },

    /// Same-line `Continue` re-evaluation exceeded the configured bound.
    /// Indicates a template-author loop, e.g. a state transitioning to
    /// itself with `Continue`.
    #[error("same-line continue limit ({limit}) exceeded in state '{state}' on input line {line}")]
    ContinueLimitExceeded { state: String, line: usize, limit: usize },

    /// Internal invariant breach: a transition targeted a state id that does
    /// not exist in the compiled template. Should be unreachable when
    /// validation has run.
    #[error("transition to unknown state id {0}")]
    InvalidState(usize),
}
