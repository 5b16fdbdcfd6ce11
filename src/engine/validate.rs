//! Structural template validation.
//!
//! Runs once after parsing and before compilation. Every violation is a hard
//! [`TemplateValidationError`] — the engine refuses to execute a template
//! that references undeclared variables or dangles a transition, even if the
//! broken state would never be reached for a given input.

use crate::error::TemplateValidationError;
use crate::{ActionDef, TemplateDef};
use std::collections::HashSet;

/// Reserved transition targets that need no state declaration.
const SENTINEL_STATES: &[&str] = &["End", "EOF"];

pub(crate) fn validate(def: &TemplateDef) -> Result<(), TemplateValidationError> {
    if def.values.is_empty() {
        return Err(TemplateValidationError::NoValues);
    }

    let mut value_names: HashSet<&str> = HashSet::new();
    for value in &def.values {
        if !value_names.insert(&value.name) {
            return Err(TemplateValidationError::DuplicateValue(value.name.clone()));
        }
    }

    let mut state_names: HashSet<&str> = HashSet::new();
    for state in &def.states {
        if !state_names.insert(&state.name) {
            return Err(TemplateValidationError::DuplicateState(state.name.clone()));
        }
    }
    if !state_names.contains("Start") {
        return Err(TemplateValidationError::MissingStart);
    }

    for state in &def.states {
        if state.name == "EOF" && !state.rules.is_empty() {
            return Err(TemplateValidationError::RulesInEof);
        }

        for rule in &state.rules {
            for var in &rule.var_refs {
                if !value_names.contains(var.as_str()) {
                    return Err(TemplateValidationError::UndeclaredVariable {
                        state: state.name.clone(),
                        variable: var.clone(),
                    });
                }
            }

            for action in &rule.actions {
                match action {
                    ActionDef::Transition(target) => {
                        if !state_names.contains(target.as_str())
                            && !SENTINEL_STATES.contains(&target.as_str())
                        {
                            return Err(TemplateValidationError::UnknownState {
                                state: state.name.clone(),
                                target: target.clone(),
                            });
                        }
                    }
                    ActionDef::Clear(names) => {
                        for name in names {
                            if !value_names.contains(name.as_str()) {
                                return Err(TemplateValidationError::UndeclaredVariable {
                                    state: state.name.clone(),
                                    variable: name.clone(),
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser;

    fn check(template: &str) -> Result<(), TemplateValidationError> {
        validate(&parser::parse(template).unwrap())
    }

    #[test]
    fn accepts_a_well_formed_template() {
        check(
            "Value X (\\d+)\n\
             Start\n\
             \x20 ^${X} -> Record, Detail\n\
             Detail\n\
             \x20 ^done -> Clear X, Start\n\
             \x20 ^stop -> End\n\
             EOF\n",
        )
        .unwrap();
    }

    #[test]
    fn rejects_dangling_transition() {
        let error = check("Value X (.)\nStart\n  ^a -> Missing\n").unwrap_err();
        assert_eq!(
            error,
            TemplateValidationError::UnknownState {
                state: "Start".to_string(),
                target: "Missing".to_string()
            }
        );
    }

    #[test]
    fn rejects_missing_start_state() {
        let error = check("Value X (.)\nBody\n  ^a\n").unwrap_err();
        assert_eq!(error, TemplateValidationError::MissingStart);
    }

    #[test]
    fn rejects_undeclared_variable_reference() {
        let error = check("Value X (.)\nStart\n  ^${Y} -> Record\n").unwrap_err();
        assert_eq!(
            error,
            TemplateValidationError::UndeclaredVariable {
                state: "Start".to_string(),
                variable: "Y".to_string()
            }
        );
    }

    #[test]
    fn rejects_undeclared_clear_target() {
        let error = check("Value X (.)\nStart\n  ^a -> Clear Y\n").unwrap_err();
        assert!(matches!(error, TemplateValidationError::UndeclaredVariable { .. }));
    }

    #[test]
    fn rejects_duplicates_and_empty_schema() {
        assert_eq!(
            check("Value X (.)\nValue X (.)\nStart\n  ^a\n").unwrap_err(),
            TemplateValidationError::DuplicateValue("X".to_string())
        );
        assert_eq!(
            check("Value X (.)\nStart\n  ^a\nStart\n  ^b\n").unwrap_err(),
            TemplateValidationError::DuplicateState("Start".to_string())
        );
        assert_eq!(check("Start\n  ^a\n").unwrap_err(), TemplateValidationError::NoValues);
    }

    #[test]
    fn rejects_rules_in_explicit_eof_state() {
        let error = check("Value X (.)\nStart\n  ^a\nEOF\n  ^flush -> Record\n").unwrap_err();
        assert_eq!(error, TemplateValidationError::RulesInEof);
    }
}
