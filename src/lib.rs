//! TraceMath crate root: re-exports and module wiring.
//!
//! This crate provides an expression-based per-sample math stage for
//! measurement trace pipelines: a user-supplied scalar/complex formula is
//! evaluated against contextual variables (`t`, `d`, `f`, `w`, `x`, `z`)
//! for every sample of an upstream trace, producing a derived trace of the
//! same length.
//!
//! Modules:
//! - `data`: sample and domain-mode types
//! - `eval`: the external evaluator capability and adapters
//! - `vars`: variable context manager (per-mode slot visibility)
//! - `engine`: the sample transform engine (unwrap + impedance conversion)
//! - `source`: upstream sample plumbing (commands, sink, input buffer)
//! - `pipeline`: single-owner driver wiring source to stage
//! - `events`: stage notifications for downstream consumers
//! - `persistence`: save/restore of the expression text
//! - `config`: numeric configuration (Z0, unwrap continuity)
//! - `error`: the stage error taxonomy

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod eval;
pub mod events;
pub mod persistence;
pub mod pipeline;
pub mod source;
pub mod vars;

// Public re-exports for a compact external API
pub use config::{ContinuityPolicy, StageConfig};
pub use data::samples::{DomainMode, Sample};
pub use engine::{ExpressionStage, StageStatus};
pub use error::{Result, TraceMathError};
pub use eval::{EvalError, Evaluator, FnEvaluator, Value, VarRefEvaluator, VarResolver};
pub use events::{EventController, EventFilter, EventKind, StageEvent};
pub use persistence::ExpressionStateSerde;
pub use pipeline::MathPipeline;
pub use source::{channel_source, InputBuffer, SampleSource, SourceCommand, SourceSink};
pub use vars::{PipelineRoot, VariableContext};
