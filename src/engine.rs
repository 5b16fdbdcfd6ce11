//! Template execution engine.
//!
//! This module is the internal entry point for the template pipeline. The
//! public surface lives in `src/api.rs`; everything here is the machinery
//! behind it, split into focused submodules under `src/engine/`.
//!
//! ## How the parts work together
//!
//! Turning template text plus input text into a table is a pipeline:
//!
//! ```text
//! template text ── parser::parse          (parser.rs)
//!                        │ TemplateDef
//!                        v
//!                  validate::validate     (validate.rs)
//!                        │ checked TemplateDef
//!                        v
//!                  CompiledTemplate::compile   (compiled_rules.rs)
//!                        │ immutable CompiledTemplate
//!                        v
//! input text ───── Executor::run          (runtime.rs)
//!                        │ line loop over RunContext
//!                        v
//!                  Table + RunMetrics     (record.rs, metrics.rs)
//! ```
//!
//! Validation runs exactly once, after parsing and before compilation; the
//! runtime can then treat every state id and value id as resolved.
//!
//! ## Responsibilities by module
//!
//! - `parser.rs`: template DSL text → `TemplateDef` (line-shape errors only).
//! - `validate.rs`: cross-reference checks — dangling transitions,
//!   undeclared variables, missing `Start`.
//! - `compiled_rules.rs`: the static side — interpolated, anchored regexes
//!   and resolved action ops; immutable and shareable across runs.
//! - `runtime.rs`: the dynamic side — one `Executor` per run, owning all
//!   mutable state (current automaton state, bindings, output table).
//! - `record.rs`: cells, records, and the accumulated table.
//! - `metrics.rs`: per-run counters and timing.
//!
//! ## Debugging
//!
//! The runtime emits `tracing` events: `trace!` per matched/skipped line,
//! `debug!` per completed run. Point an `EnvFilter` at `tabula=trace` to
//! watch rule selection while authoring templates.

#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/parser.rs"]
mod parser;
#[path = "engine/record.rs"]
mod record;
#[path = "engine/runtime.rs"]
mod runtime;
#[path = "engine/validate.rs"]
mod validate;

pub use metrics::{RunMetrics, RunResult};
pub use record::{CellValue, Record, Table};

pub(crate) use compiled_rules::CompiledTemplate;
pub(crate) use parser::parse;
pub(crate) use runtime::Executor;
pub(crate) use validate::validate;
