//! Matching engine.
//!
//! This module is the operational core of the engine: it walks input text
//! line by line against a [`CompiledTemplate`] and accumulates records.
//!
//! ## Run structure
//!
//! ```text
//! CompiledTemplate (immutable, shared)
//!        │
//! Executor::new ── RunContext (one mutable slot per value)
//!        │
//!        v
//! per line: scan current state's rules top-to-bottom
//!        │    first match wins ──▶ capture named groups into slots
//!        │                         execute ops in declared order
//!        │                         Continue? re-test the SAME line
//!        │    no match ──▶ line silently skipped
//!        v
//! end of input ──▶ implicit flush (unless an explicit EOF state exists)
//! ```
//!
//! ## Key behaviors
//!
//! - **First-match-wins**: within a state, the first matching rule fires and
//!   no later rule is tried for that line. Once a transition executes, the
//!   prior state's unmatched rules are never revisited for that line.
//! - **Continue**: re-tests the same line from the next rule of the current
//!   state, or from the top of the new state when combined with a
//!   transition. The same-line loop is bounded; exceeding the bound is a
//!   [`MatchRuntimeError`], attributed to the template author.
//! - **Record**: commits a schema-complete snapshot, dropping the row when a
//!   `Required` value is unset or nothing is set at all, then resets every
//!   non-Filldown slot.
//!
//! Each run owns its context exclusively; nothing is shared between runs and
//! output is byte-identical across repeated runs of the same template+input.

use super::compiled_rules::{ClearOp, CompiledState, CompiledTemplate, Op, StateId, Target};
use super::metrics::{RunMetrics, RunResult};
use super::record::{CellValue, Table};
use crate::ValueOptions;
use crate::error::MatchRuntimeError;
use std::time::Instant;
use tracing::{debug, trace};

/// One mutable binding slot per declared value.
#[derive(Debug, Clone)]
enum Slot {
    Scalar(Option<String>),
    List(Vec<String>),
}

impl Slot {
    fn assign(&mut self, text: &str) {
        match self {
            Slot::Scalar(current) => *current = Some(text.to_string()),
            Slot::List(items) => items.push(text.to_string()),
        }
    }

    fn reset(&mut self) {
        match self {
            Slot::Scalar(current) => *current = None,
            Slot::List(items) => items.clear(),
        }
    }

    fn is_set(&self) -> bool {
        match self {
            Slot::Scalar(current) => current.is_some(),
            Slot::List(items) => !items.is_empty(),
        }
    }

    /// Schema-normalized snapshot: unset scalars become `""`, lists are
    /// defensively copied.
    fn cell(&self) -> CellValue {
        match self {
            Slot::Scalar(current) => CellValue::Scalar(current.clone().unwrap_or_default()),
            Slot::List(items) => CellValue::List(items.clone()),
        }
    }
}

/// Transient per-run variable bindings, owned by the executor.
#[derive(Debug)]
struct RunContext {
    slots: Vec<Slot>,
    filldown: Vec<bool>,
    required: Vec<bool>,
}

impl RunContext {
    fn new(template: &CompiledTemplate) -> Self {
        let slots = template
            .values
            .iter()
            .map(|v| {
                if v.options.contains(ValueOptions::LIST) {
                    Slot::List(Vec::new())
                } else {
                    Slot::Scalar(None)
                }
            })
            .collect();
        let filldown = template
            .values
            .iter()
            .map(|v| v.options.contains(ValueOptions::FILLDOWN))
            .collect();
        let required = template
            .values
            .iter()
            .map(|v| v.options.contains(ValueOptions::REQUIRED))
            .collect();
        RunContext { slots, filldown, required }
    }

    fn any_set(&self) -> bool {
        self.slots.iter().any(Slot::is_set)
    }

    fn required_missing(&self) -> bool {
        self.slots.iter().zip(&self.required).any(|(slot, &req)| req && !slot.is_set())
    }

    fn reset_non_filldown(&mut self) {
        for (slot, &filldown) in self.slots.iter_mut().zip(&self.filldown) {
            if !filldown {
                slot.reset();
            }
        }
    }

    fn reset_all(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }
}

/// What a fired rule asks the line loop to do next.
enum LineFlow {
    /// Advance to the next input line.
    Advance,
    /// Re-test the same line starting at `from_rule` of the (possibly new)
    /// current state.
    Retest { from_rule: usize },
    /// Stop the run; `flush` selects end-of-input handling.
    Stop { flush: bool },
}

/// Executes one run of a compiled template over one input text.
///
/// Create with [`Executor::new`], consume with [`Executor::run`]. The
/// executor owns all mutable run state; the compiled template is only read.
pub(crate) struct Executor<'t> {
    template: &'t CompiledTemplate,
    /// Bound on same-line `Continue` hops (template-author loop guard).
    continue_limit: usize,
    state: StateId,
    ctx: RunContext,
    table: Table,
    metrics: RunMetrics,
}

impl<'t> Executor<'t> {
    pub(crate) fn new(template: &'t CompiledTemplate, continue_limit: usize) -> Self {
        Executor {
            template,
            continue_limit,
            state: template.start,
            ctx: RunContext::new(template),
            table: Table::new(template.header(), template.key_columns()),
            metrics: RunMetrics::default(),
        }
    }

    /// Run to completion and return the table plus metrics.
    ///
    /// Fatal errors discard all accumulated records; unmatched lines are
    /// not errors.
    pub(crate) fn run(mut self, input: &str) -> Result<RunResult, MatchRuntimeError> {
        let started = Instant::now();
        let template = self.template;

        for (idx, line) in input.lines().enumerate() {
            let lineno = idx + 1;
            self.metrics.lines += 1;

            let mut from_rule = 0;
            let mut hops = 0;
            let mut line_matched = false;

            loop {
                let state = template
                    .states
                    .get(self.state)
                    .ok_or(MatchRuntimeError::InvalidState(self.state))?;

                let Some(flow) = self.try_rules(state, from_rule, line, lineno)? else {
                    break;
                };
                line_matched = true;

                match flow {
                    LineFlow::Advance => break,
                    LineFlow::Stop { flush } => {
                        self.metrics.matched_lines += 1;
                        return Ok(self.finish(started, flush));
                    }
                    LineFlow::Retest { from_rule: next } => {
                        hops += 1;
                        if hops > self.continue_limit {
                            return Err(MatchRuntimeError::ContinueLimitExceeded {
                                state: template.states[self.state].name.clone(),
                                line: lineno,
                                limit: self.continue_limit,
                            });
                        }
                        from_rule = next;
                    }
                }
            }

            if line_matched {
                self.metrics.matched_lines += 1;
            } else {
                trace!(line = lineno, "no rule matched; line skipped");
                self.metrics.skipped_lines += 1;
            }
        }

        Ok(self.finish(started, true))
    }

    /// Scan `state`'s rules from `from_rule`; fire the first match.
    ///
    /// Returns `None` when nothing matched (the line is done).
    fn try_rules(
        &mut self,
        state: &'t CompiledState,
        from_rule: usize,
        line: &str,
        lineno: usize,
    ) -> Result<Option<LineFlow>, MatchRuntimeError> {
        let template = self.template;

        for (ri, rule) in state.rules.iter().enumerate().skip(from_rule) {
            let Some(caps) = rule.regex.captures(line) else { continue };
            trace!(state = %state.name, rule = ri, line = lineno, "rule matched");

            // Named groups that did not participate (unused alternation
            // branch) leave their variable untouched.
            for &vid in &rule.captures {
                if let Some(m) = caps.name(&template.values[vid].name) {
                    self.ctx.slots[vid].assign(m.as_str());
                }
            }

            let mut continue_line = false;
            let mut pending: Option<Target> = None;
            for op in &rule.ops {
                match op {
                    Op::Record => self.emit_record(),
                    Op::Clear(ClearOp::NonFilldown) => self.ctx.reset_non_filldown(),
                    Op::Clear(ClearOp::Named(ids)) => {
                        for &id in ids {
                            self.ctx.slots[id].reset();
                        }
                    }
                    Op::ClearAll => self.ctx.reset_all(),
                    Op::Continue => continue_line = true,
                    Op::Next => {}
                    Op::Fail(message) => {
                        return Err(MatchRuntimeError::ErrorAction {
                            state: state.name.clone(),
                            line: lineno,
                            message: message
                                .clone()
                                .unwrap_or_else(|| "parsing aborted by template".to_string()),
                        });
                    }
                    Op::Transition(target) => pending = Some(*target),
                }
            }

            let flow = match pending {
                Some(Target::End) => LineFlow::Stop { flush: false },
                Some(Target::Eof) => LineFlow::Stop { flush: true },
                Some(Target::State(next)) => {
                    self.state = next;
                    if continue_line {
                        LineFlow::Retest { from_rule: 0 }
                    } else {
                        LineFlow::Advance
                    }
                }
                None => {
                    if continue_line {
                        LineFlow::Retest { from_rule: ri + 1 }
                    } else {
                        LineFlow::Advance
                    }
                }
            };
            return Ok(Some(flow));
        }

        Ok(None)
    }

    /// Commit the current bindings as a record, applying the `Required` and
    /// empty-row checks, then reset non-Filldown slots either way.
    fn emit_record(&mut self) {
        if self.ctx.required_missing() || !self.ctx.any_set() {
            trace!("record attempt dropped (required value unset or empty row)");
            self.metrics.records_filtered += 1;
        } else {
            let row = self.ctx.slots.iter().map(Slot::cell).collect();
            self.table.push(row);
            self.metrics.records += 1;
        }
        self.ctx.reset_non_filldown();
    }

    fn finish(mut self, started: Instant, flush: bool) -> RunResult {
        if flush && !self.template.has_explicit_eof && self.ctx.any_set() {
            self.emit_record();
        }
        self.metrics.total = started.elapsed();
        debug!(
            lines = self.metrics.lines,
            matched = self.metrics.matched_lines,
            skipped = self.metrics.skipped_lines,
            records = self.metrics.records,
            filtered = self.metrics.records_filtered,
            "run complete"
        );
        RunResult { table: self.table, metrics: self.metrics }
    }
}
