//! Rule compilation.
//!
//! This module holds the *static* side of the engine: the executable
//! representation derived from a validated [`TemplateDef`]. Compilation is
//! deterministic and side-effect-free — compiling the same definition twice
//! yields behaviorally identical matchers — and the result is immutable, so
//! one [`CompiledTemplate`] can be shared read-only across concurrent runs.
//!
//! Three things happen per rule:
//!
//! 1. **Interpolation**: every `${Name}` token becomes `(?P<Name>fragment)`,
//!    where `fragment` is the value's declared regex.
//! 2. **Anchoring**: a `^` is prepended and a `$` appended unless the pattern
//!    already supplies its own — every rule matches a full input line.
//! 3. **Action resolution**: textual actions become [`Op`]s with state names
//!    resolved to indices into [`CompiledTemplate::states`] (`StateId` is an
//!    index; the vectors must stay aligned).
//!
//! A fragment the regex engine rejects surfaces as a [`PatternCompileError`]
//! attributed to the offending rule's template line.

use crate::error::PatternCompileError;
use crate::{ActionDef, TemplateDef, Value, ValueOptions};
use regex::Regex;
use std::collections::HashMap;

/// State identifier (index into the compiled state vector).
pub(crate) type StateId = usize;

/// Value identifier (index into the declared value vector).
pub(crate) type ValueId = usize;

/// Resolved transition target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    State(StateId),
    /// Stop immediately; no end-of-input flush.
    End,
    /// Jump straight to end-of-input handling.
    Eof,
}

/// Which variables a clear directive resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClearOp {
    /// Bare `Clear`: every non-Filldown variable.
    NonFilldown,
    /// `Clear A B`: exactly the named variables, Filldown included.
    Named(Vec<ValueId>),
}

/// Executable form of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Record,
    Clear(ClearOp),
    ClearAll,
    Continue,
    Next,
    Fail(Option<String>),
    Transition(Target),
}

/// One compiled rule: the anchored, interpolated regex plus its ops.
#[derive(Debug)]
pub(crate) struct CompiledRule {
    pub regex: Regex,
    /// Ids of the values captured by this rule's named groups.
    pub captures: Vec<ValueId>,
    pub ops: Vec<Op>,
    /// Template line number, kept for diagnostics.
    pub line: usize,
}

#[derive(Debug)]
pub(crate) struct CompiledState {
    pub name: String,
    pub rules: Vec<CompiledRule>,
}

/// Immutable executable template.
#[derive(Debug)]
pub(crate) struct CompiledTemplate {
    pub values: Vec<Value>,
    pub states: Vec<CompiledState>,
    pub start: StateId,
    /// An explicitly declared `EOF` state suppresses the implicit final flush.
    pub has_explicit_eof: bool,
}

impl CompiledTemplate {
    /// Compile a validated definition.
    ///
    /// Assumes `validate` has run: every `${Var}` and transition target
    /// resolves. The only failure left is the regex engine rejecting an
    /// assembled pattern.
    pub(crate) fn compile(def: TemplateDef) -> Result<Self, PatternCompileError> {
        let value_ids: HashMap<&str, ValueId> =
            def.values.iter().enumerate().map(|(id, v)| (v.name.as_str(), id)).collect();
        let state_ids: HashMap<&str, StateId> =
            def.states.iter().enumerate().map(|(id, s)| (s.name.as_str(), id)).collect();

        let has_explicit_eof = state_ids.contains_key("EOF");
        let start = state_ids["Start"];

        let mut states = Vec::with_capacity(def.states.len());
        for state in &def.states {
            let mut rules = Vec::with_capacity(state.rules.len());
            for rule in &state.rules {
                let pattern = anchor(&interpolate(&rule.pattern, &def.values, &value_ids));
                let regex = Regex::new(&pattern).map_err(|source| PatternCompileError {
                    state: state.name.clone(),
                    line: rule.line,
                    source,
                })?;

                let captures = rule.var_refs.iter().map(|name| value_ids[name.as_str()]).collect();
                let ops = rule
                    .actions
                    .iter()
                    .map(|action| resolve_action(action, &value_ids, &state_ids))
                    .collect();

                rules.push(CompiledRule { regex, captures, ops, line: rule.line });
            }
            states.push(CompiledState { name: state.name.clone(), rules });
        }

        Ok(CompiledTemplate { values: def.values, states, start, has_explicit_eof })
    }

    /// Value names in declaration order (the record schema).
    pub(crate) fn header(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.clone()).collect()
    }

    /// Names of values carrying the `Key` option.
    pub(crate) fn key_columns(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|v| v.options.contains(ValueOptions::KEY))
            .map(|v| v.name.clone())
            .collect()
    }
}

/// Substitute every `${Name}` with `(?P<Name>fragment)`.
///
/// Balance and declaredness were checked upstream, so an unresolvable token
/// here passes through verbatim and fails regex compilation instead.
fn interpolate(pattern: &str, values: &[Value], value_ids: &HashMap<&str, ValueId>) -> String {
    regex!(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .replace_all(pattern, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match value_ids.get(name) {
                Some(&id) => format!("(?P<{name}>{})", values[id].pattern),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Anchor a pattern to the full line unless the author already did.
///
/// A trailing `\$` is a literal dollar, not an author-supplied anchor.
fn anchor(pattern: &str) -> String {
    let start = if pattern.starts_with('^') { "" } else { "^" };
    let own_end = pattern.ends_with('$') && !pattern.ends_with(r"\$");
    let end = if own_end { "" } else { "$" };
    format!("{start}{pattern}{end}")
}

fn resolve_action(
    action: &ActionDef,
    value_ids: &HashMap<&str, ValueId>,
    state_ids: &HashMap<&str, StateId>,
) -> Op {
    match action {
        ActionDef::Record => Op::Record,
        ActionDef::ClearAll => Op::ClearAll,
        ActionDef::Continue => Op::Continue,
        ActionDef::Next => Op::Next,
        ActionDef::Fail(message) => Op::Fail(message.clone()),
        ActionDef::Clear(names) if names.is_empty() => Op::Clear(ClearOp::NonFilldown),
        ActionDef::Clear(names) => {
            Op::Clear(ClearOp::Named(names.iter().map(|n| value_ids[n.as_str()]).collect()))
        }
        ActionDef::Transition(target) => Op::Transition(match target.as_str() {
            "End" => Target::End,
            "EOF" => Target::Eof,
            name => Target::State(state_ids[name]),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{parser, validate};

    fn compile(template: &str) -> Result<CompiledTemplate, PatternCompileError> {
        let def = parser::parse(template).unwrap();
        validate::validate(&def).unwrap();
        CompiledTemplate::compile(def)
    }

    #[test]
    fn interpolates_values_as_named_groups() {
        let compiled = compile("Value X (\\d+)\nValue Y (\\w+)\nStart\n  ^${X}:${Y} -> Record\n")
            .unwrap();

        let rule = &compiled.states[0].rules[0];
        assert_eq!(rule.regex.as_str(), r"^(?P<X>(\d+)):(?P<Y>(\w+))$");
        assert_eq!(rule.captures, vec![0, 1]);

        let caps = rule.regex.captures("12:ab").unwrap();
        assert_eq!(&caps["X"], "12");
        assert_eq!(&caps["Y"], "ab");
    }

    #[test]
    fn anchors_only_when_missing() {
        assert_eq!(anchor("abc"), "^abc$");
        assert_eq!(anchor("^abc"), "^abc$");
        assert_eq!(anchor("abc$"), "^abc$");
        assert_eq!(anchor("^abc$"), "^abc$");
        assert_eq!(anchor(r"cost \$"), r"^cost \$$");
    }

    #[test]
    fn resolves_actions_and_sentinels() {
        let compiled = compile(
            "Value Filldown X (\\d+)\n\
             Start\n\
             \x20 ^a -> Clear, Record, Detail\n\
             \x20 ^b -> Clear X, End\n\
             \x20 ^c -> EOF\n\
             Detail\n\
             \x20 ^d -> Clearall, Continue, Start\n",
        )
        .unwrap();

        let start = &compiled.states[0];
        assert_eq!(
            start.rules[0].ops,
            vec![Op::Clear(ClearOp::NonFilldown), Op::Record, Op::Transition(Target::State(1))]
        );
        assert_eq!(
            start.rules[1].ops,
            vec![Op::Clear(ClearOp::Named(vec![0])), Op::Transition(Target::End)]
        );
        assert_eq!(start.rules[2].ops, vec![Op::Transition(Target::Eof)]);
        assert_eq!(
            compiled.states[1].rules[0].ops,
            vec![Op::ClearAll, Op::Continue, Op::Transition(Target::State(0))]
        );
    }

    #[test]
    fn bad_fragment_is_a_compile_error_on_the_rule_line() {
        let error = compile("Value X ([unclosed\nStart\n  ^${X} -> Record\n").unwrap_err();
        assert_eq!(error.state, "Start");
        assert_eq!(error.line, 3);
    }

    #[test]
    fn explicit_eof_state_is_flagged() {
        assert!(compile("Value X (.)\nStart\n  ^a\nEOF\n").unwrap().has_explicit_eof);
        assert!(!compile("Value X (.)\nStart\n  ^a\n").unwrap().has_explicit_eof);
    }
}
