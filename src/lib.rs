use bitflags::bitflags;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;

pub use api::{Options, Template, extract};
pub use engine::{CellValue, Record, RunMetrics, RunResult, Table};
pub use error::{
    Error, MatchRuntimeError, PatternCompileError, TemplateSyntaxError, TemplateValidationError,
};

// --- Template definition types ----------------------------------------------

bitflags! {
    /// Modifiers attached to a `Value` declaration.
    ///
    /// A value may carry any combination; the set is closed and unknown
    /// option keywords are rejected while parsing the template.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValueOptions: u8 {
        /// Records missing this value at emission time are dropped.
        const REQUIRED = 1 << 0;
        /// The value survives record emission until rematched or cleared.
        const FILLDOWN = 1 << 1;
        /// Part of the record's uniqueness identity (informational).
        const KEY      = 1 << 2;
        /// Accumulates every match into an ordered sequence.
        const LIST     = 1 << 3;
    }
}

impl ValueOptions {
    /// Map a single option keyword from the template DSL to its flag.
    pub(crate) fn from_keyword(keyword: &str) -> Option<ValueOptions> {
        match keyword {
            "Required" => Some(ValueOptions::REQUIRED),
            "Filldown" => Some(ValueOptions::FILLDOWN),
            "Key" => Some(ValueOptions::KEY),
            "List" => Some(ValueOptions::LIST),
            _ => None,
        }
    }
}

/// A named capture slot declared by a `Value` line.
///
/// `pattern` is the raw regex fragment from the declaration; wherever a rule
/// references `${name}`, the compiler wraps the fragment in a named capturing
/// group. The declaration order of values defines the record schema.
#[derive(Debug, Clone)]
pub struct Value {
    pub name: String,
    pub pattern: String,
    pub options: ValueOptions,
}

/// Parsed (but not yet validated or compiled) template definition.
#[derive(Debug, Clone)]
pub(crate) struct TemplateDef {
    pub values: Vec<Value>,
    pub states: Vec<StateDef>,
}

/// A named node of the matching automaton with its ordered rules.
#[derive(Debug, Clone)]
pub(crate) struct StateDef {
    pub name: String,
    /// Template line number of the state header (for error context).
    pub line: usize,
    pub rules: Vec<RuleDef>,
}

/// One line-matching clause: a pattern with `${Var}` placeholders plus the
/// ordered action list following `->` (empty list = stay, advance one line).
#[derive(Debug, Clone)]
pub(crate) struct RuleDef {
    pub pattern: String,
    /// Variable names referenced by the pattern, in first-appearance order.
    pub var_refs: Vec<String>,
    pub actions: Vec<ActionDef>,
    /// Template line number of the rule (for error context).
    pub line: usize,
}

/// Actions as written in the template, before state-name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActionDef {
    /// Commit the current bindings as a record.
    Record,
    /// Reset the named variables, or every non-Filldown variable when empty.
    Clear(Vec<String>),
    /// Reset every variable, Filldown included.
    ClearAll,
    /// Re-test the same input line against subsequent rules.
    Continue,
    /// Advance to the next input line (the implicit default).
    Next,
    /// Abort the run, discarding all accumulated records.
    Fail(Option<String>),
    /// Move to the named state (`End` and `EOF` are reserved sentinels).
    Transition(String),
}
