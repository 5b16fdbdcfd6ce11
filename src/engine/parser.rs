//! Template DSL parser.
//!
//! This module turns raw template text into a [`TemplateDef`]: an ordered set
//! of value declarations followed by an ordered set of named states, each
//! holding ordered rules. No validation beyond line shape happens here —
//! forward references to states declared later in the file are normal, so
//! cross-reference checks live in `validate.rs`.
//!
//! ## Template shape
//!
//! ```text
//! Value [Option[,Option]] NAME regex-fragment
//! ...
//!
//! Start
//!   ^pattern with ${Var} tokens -> Action[, Action...]
//!   ^other pattern
//! OtherState
//!   ...
//! ```
//!
//! Line classification is positional:
//!
//! - blank lines and `#` comments are ignored everywhere
//! - `Value ...` lines must precede the first state block
//! - an unindented identifier opens a state block
//! - indented lines are rules of the current state
//!
//! Every failure is a [`TemplateSyntaxError`] citing the 1-based template
//! line number.

use crate::error::TemplateSyntaxError;
use crate::{ActionDef, RuleDef, StateDef, TemplateDef, Value, ValueOptions};

/// Parse template text into a definition.
pub(crate) fn parse(text: &str) -> Result<TemplateDef, TemplateSyntaxError> {
    let mut values: Vec<Value> = Vec::new();
    let mut states: Vec<StateDef> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if raw.starts_with([' ', '\t']) {
            let Some(state) = states.last_mut() else {
                return Err(err(line, "rule outside of any state block"));
            };
            state.rules.push(parse_rule(trimmed, line)?);
            continue;
        }

        if let Some(rest) = raw.strip_prefix("Value") {
            if rest.starts_with([' ', '\t']) {
                if !states.is_empty() {
                    return Err(err(line, "Value declaration must precede state definitions"));
                }
                values.push(parse_value(rest.trim(), line)?);
                continue;
            }
            if rest.is_empty() {
                return Err(err(line, "malformed Value line: missing name and pattern"));
            }
            // An identifier that merely starts with "Value" is a state header.
        }

        if is_identifier(trimmed) {
            states.push(StateDef { name: trimmed.to_string(), line, rules: Vec::new() });
        } else {
            return Err(err(line, format!("malformed state header '{trimmed}'")));
        }
    }

    Ok(TemplateDef { values, states })
}

fn err(line: usize, message: impl Into<String>) -> TemplateSyntaxError {
    TemplateSyntaxError { line, message: message.into() }
}

fn is_identifier(s: &str) -> bool {
    regex!(r"^[A-Za-z_][A-Za-z0-9_]*$").is_match(s)
}

/// Split off the first whitespace-delimited token; the remainder keeps its
/// internal spacing (regex fragments may contain spaces).
fn split_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(at) => (&s[..at], s[at..].trim_start()),
        None => (s, ""),
    }
}

enum OptionsToken {
    Options(ValueOptions),
    Unknown(String),
    NotOptions,
}

/// Decide whether the first token of a `Value` line is an option list.
///
/// A token containing a comma must be an option list; a bare token is one
/// only when it exactly matches a known option keyword. A value cannot
/// itself be named after an option keyword.
fn classify_options(token: &str) -> OptionsToken {
    if token.contains(',') {
        let mut options = ValueOptions::empty();
        for part in token.split(',') {
            match ValueOptions::from_keyword(part) {
                Some(flag) => options |= flag,
                None => return OptionsToken::Unknown(part.to_string()),
            }
        }
        OptionsToken::Options(options)
    } else {
        match ValueOptions::from_keyword(token) {
            Some(flag) => OptionsToken::Options(flag),
            None => OptionsToken::NotOptions,
        }
    }
}

fn parse_value(rest: &str, line: usize) -> Result<Value, TemplateSyntaxError> {
    let (first, remainder) = split_token(rest);

    let (name, pattern, options) = match classify_options(first) {
        OptionsToken::Options(options) => {
            let (name, pattern) = split_token(remainder);
            (name, pattern, options)
        }
        OptionsToken::Unknown(keyword) => {
            return Err(err(line, format!("unknown value option '{keyword}'")));
        }
        OptionsToken::NotOptions => (first, remainder, ValueOptions::empty()),
    };

    if !is_identifier(name) {
        return Err(err(line, format!("invalid value name '{name}'")));
    }
    if pattern.is_empty() {
        return Err(err(line, format!("missing regex for value '{name}'")));
    }

    Ok(Value { name: name.to_string(), pattern: pattern.to_string(), options })
}

/// Split a rule body into its pattern and optional action list.
///
/// The separator is the *last* ` -> ` so patterns may contain a literal
/// arrow. A trailing bare `->` is a rule that promises actions and delivers
/// none.
fn split_actions(body: &str) -> (&str, Option<&str>) {
    if let Some(at) = body.rfind(" -> ") {
        return (body[..at].trim_end(), Some(body[at + 4..].trim()));
    }
    if let Some(stripped) = body.strip_suffix(" ->") {
        return (stripped.trim_end(), Some(""));
    }
    (body, None)
}

fn parse_rule(body: &str, line: usize) -> Result<RuleDef, TemplateSyntaxError> {
    let (pattern, actions_text) = split_actions(body);

    let actions = match actions_text {
        Some("") => return Err(err(line, "empty action list after '->'")),
        Some(text) => parse_actions(text, line)?,
        None => Vec::new(),
    };

    let var_refs = scan_var_refs(pattern, line)?;

    Ok(RuleDef { pattern: pattern.to_string(), var_refs, actions, line })
}

/// Collect `${Name}` references in first-appearance order.
///
/// A `$` not followed by `{` passes through as regex text untouched.
fn scan_var_refs(pattern: &str, line: usize) -> Result<Vec<String>, TemplateSyntaxError> {
    let bytes = pattern.as_bytes();
    let mut refs: Vec<String> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            let Some(close) = pattern[i + 2..].find('}') else {
                return Err(err(line, "unterminated '${' in rule pattern"));
            };
            let name = &pattern[i + 2..i + 2 + close];
            if !is_identifier(name) {
                return Err(err(line, format!("invalid variable reference '${{{name}}}'")));
            }
            if !refs.iter().any(|r| r == name) {
                refs.push(name.to_string());
            }
            i += close + 3;
        } else {
            i += 1;
        }
    }
    Ok(refs)
}

fn parse_actions(text: &str, line: usize) -> Result<Vec<ActionDef>, TemplateSyntaxError> {
    let mut actions = Vec::new();
    let mut has_transition = false;

    for segment in text.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(err(line, "empty action in action list"));
        }
        let mut tokens = segment.split_whitespace();
        let head = tokens.next().unwrap_or_default();
        let rest: Vec<&str> = tokens.collect();

        let action = match head {
            "Record" if rest.is_empty() => ActionDef::Record,
            "Clearall" if rest.is_empty() => ActionDef::ClearAll,
            "Continue" if rest.is_empty() => ActionDef::Continue,
            "Next" if rest.is_empty() => ActionDef::Next,
            "Clear" => {
                for name in &rest {
                    if !is_identifier(name) {
                        return Err(err(line, format!("invalid variable name '{name}' in Clear")));
                    }
                }
                ActionDef::Clear(rest.iter().map(|s| (*s).to_string()).collect())
            }
            "Error" => {
                let message = if rest.is_empty() {
                    None
                } else {
                    Some(rest.join(" ").trim_matches('"').to_string())
                };
                ActionDef::Fail(message)
            }
            name if rest.is_empty() && is_identifier(name) => {
                if has_transition {
                    return Err(err(line, "multiple transition targets in one action list"));
                }
                has_transition = true;
                ActionDef::Transition(name.to_string())
            }
            _ => return Err(err(line, format!("unrecognized action '{segment}'"))),
        };
        actions.push(action);
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_values_with_and_without_options() {
        let def = parse(
            "Value INTERFACE (\\S+)\n\
             Value Required,Key IP_ADDRESS (\\S+)\n\
             Value List ADDRESSES ([a-f0-9:.]+)\n\
             \n\
             Start\n\
             \x20 ^ignored\n",
        )
        .unwrap();

        assert_eq!(def.values.len(), 3);
        assert_eq!(def.values[0].name, "INTERFACE");
        assert_eq!(def.values[0].options, ValueOptions::empty());
        assert_eq!(def.values[1].options, ValueOptions::REQUIRED | ValueOptions::KEY);
        assert_eq!(def.values[2].options, ValueOptions::LIST);
        assert_eq!(def.values[2].pattern, "([a-f0-9:.]+)");
    }

    #[test]
    fn parses_states_rules_and_actions() {
        let def = parse(
            "Value X (\\d+)\n\
             \n\
             # leading comment\n\
             Start\n\
             \x20 ^head -> Continue, Body\n\
             Body\n\
             \x20 ^${X} -> Record\n\
             \x20 ^end -> Clear X, Record, Start\n\
             \x20 ^bare\n",
        )
        .unwrap();

        assert_eq!(def.states.len(), 2);
        assert_eq!(def.states[0].name, "Start");
        assert_eq!(
            def.states[0].rules[0].actions,
            vec![ActionDef::Continue, ActionDef::Transition("Body".to_string())]
        );

        let body = &def.states[1];
        assert_eq!(body.rules[0].var_refs, vec!["X".to_string()]);
        assert_eq!(
            body.rules[1].actions,
            vec![
                ActionDef::Clear(vec!["X".to_string()]),
                ActionDef::Record,
                ActionDef::Transition("Start".to_string()),
            ]
        );
        assert!(body.rules[2].actions.is_empty());
    }

    #[test]
    fn pattern_may_contain_a_literal_arrow() {
        let def = parse("Value X (\\d+)\nStart\n  ^a -> b ${X} -> Record\n").unwrap();
        assert_eq!(def.states[0].rules[0].pattern, "^a -> b ${X}");
        assert_eq!(def.states[0].rules[0].actions, vec![ActionDef::Record]);
    }

    #[test]
    fn error_action_keeps_its_message() {
        let def = parse("Value X (.)\nStart\n  ^boom -> Error \"unexpected output\"\n").unwrap();
        assert_eq!(
            def.states[0].rules[0].actions,
            vec![ActionDef::Fail(Some("unexpected output".to_string()))]
        );
    }

    #[test]
    fn rejects_malformed_lines_with_line_numbers() {
        let cases: Vec<(&str, usize, &str)> = vec![
            ("Value Bogus,Required X (.)\n", 1, "unknown value option"),
            ("Value X\n", 1, "missing regex"),
            ("Value\n", 1, "missing name and pattern"),
            ("  ^rule before any state\n", 1, "outside of any state"),
            ("Start\nValue X (.)\n", 2, "must precede state definitions"),
            ("Start!\n", 1, "malformed state header"),
            ("Start\n  ^x ->\n", 2, "empty action list"),
            ("Start\n  ^x -> Record, \n", 2, "empty action"),
            ("Start\n  ^x -> record\n", 2, "unrecognized action"),
            ("Start\n  ^x -> Foo Bar\n", 2, "unrecognized action"),
            ("Start\n  ^x -> Alpha, Beta\n", 2, "multiple transition targets"),
            ("Start\n  ^${OPEN -> Record\n", 2, "unterminated"),
            ("Start\n  ^${BAD-NAME} -> Record\n", 2, "invalid variable reference"),
        ];

        for (template, line, needle) in cases {
            let error = parse(template).unwrap_err();
            assert_eq!(error.line, line, "template: {template:?}");
            assert!(
                error.message.contains(needle),
                "expected {needle:?} in {:?} for {template:?}",
                error.message
            );
        }
    }

    #[test]
    fn dollar_without_brace_is_literal() {
        let def = parse("Value X (.)\nStart\n  ^cost: \\$\\d+ $\n").unwrap();
        assert!(def.states[0].rules[0].var_refs.is_empty());
    }
}
