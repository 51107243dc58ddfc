//! The sample transform engine: evaluates the user expression per sample.
//!
//! [`ExpressionStage`] owns the output buffer, the variable context and the
//! (externally supplied) evaluator. A recompute walks a half-open index
//! range in ascending order (ordering is load-bearing: the phase-unwrap
//! step chains adjacent samples) and for each sample derives the context
//! variables, converts the raw reflection coefficient to an impedance, and
//! writes the evaluated result at the same index of the output.
//!
//! Failures never propagate past the public methods: they are recorded in
//! the stage status and reported through the [`EventController`], and the
//! pipeline keeps running with stale or partial output.

use num_complex::Complex64;
use tracing::{debug, warn};

use crate::config::{ContinuityPolicy, StageConfig};
use crate::data::samples::{DomainMode, Sample};
use crate::error::{Result, TraceMathError};
use crate::eval::Evaluator;
use crate::events::{EventController, EventKind, ExpressionMeta, ModeMeta, StageEvent};
use crate::source::SampleSource;
use crate::vars::{PipelineRoot, VariableContext};

// ─────────────────────────────────────────────────────────────────────────────
// Angle helpers
// ─────────────────────────────────────────────────────────────────────────────

use std::f64::consts::{PI, TAU};

/// Normalize an angle to [-π, π).
#[inline]
fn constrain_angle(x: f64) -> f64 {
    (x + PI).rem_euclid(TAU) - PI
}

/// Shortest signed delta from `a` to `b`, in [-π, π).
#[inline]
fn angle_diff(a: f64, b: f64) -> f64 {
    constrain_angle(b - a)
}

/// Advance `prev` by the shortest signed delta towards the wrapped angle
/// `raw`. The result may exceed ±π, so a continuously rotating phasor
/// accumulates winding instead of wrapping.
#[inline]
fn unwrap_angle(prev: f64, raw: f64) -> f64 {
    prev + angle_diff(constrain_angle(prev), raw)
}

/// Convert a reflection coefficient (magnitude, angle in radians) to an
/// impedance relative to `z0` via the bilinear transform.
///
/// The denominator approaches 0 when the magnitude approaches 1 with angle
/// near 0 (matched short/open). That case is deliberately not guarded: the
/// resulting Inf/NaN are valid outputs and flow downstream unchanged.
#[inline]
fn reflection_to_impedance(mag: f64, ang: f64, z0: f64) -> Complex64 {
    let denom = 1.0 + mag * mag - 2.0 * mag * ang.cos();
    Complex64::new(
        z0 * (1.0 - mag * mag) / denom,
        2.0 * mag * ang.sin() * z0 / denom,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// StageStatus
// ─────────────────────────────────────────────────────────────────────────────

/// Last known outcome of the stage. A freshly constructed stage is in the
/// error state because its expression text is still empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Ok,
    Error(String),
}

impl StageStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageStatus::Ok)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExpressionStage
// ─────────────────────────────────────────────────────────────────────────────

/// Expression-based per-sample math stage.
///
/// Single-threaded and non-reentrant: a recompute runs to completion (or to
/// first failure) before returning, and callers must serialize access.
pub struct ExpressionStage<E: Evaluator> {
    evaluator: E,
    vars: VariableContext,
    exp: String,
    output: Vec<Sample>,
    config: StageConfig,
    events: EventController,
    status: StageStatus,
    /// Set when the expression or the variable set changed; forces the next
    /// input-change recompute to cover the whole input instead of the
    /// notified partial range.
    needs_full: bool,
}

impl<E: Evaluator> ExpressionStage<E> {
    pub fn new(evaluator: E, config: StageConfig) -> Self {
        Self {
            evaluator,
            vars: VariableContext::default(),
            exp: String::new(),
            output: Vec::new(),
            config,
            events: EventController::new(),
            status: StageStatus::Error(TraceMathError::EmptyExpression.to_string()),
            needs_full: true,
        }
    }

    /// The controller downstream consumers subscribe to.
    pub fn events(&self) -> &EventController {
        &self.events
    }

    /// The transformed samples. Index `i` corresponds to index `i` of the
    /// input; after a partial recompute only the notified range is fresh.
    pub fn output(&self) -> &[Sample] {
        &self.output
    }

    pub fn status(&self) -> &StageStatus {
        &self.status
    }

    /// The current expression text (empty until first set).
    pub fn expression(&self) -> &str {
        &self.exp
    }

    /// Human-readable stage description for pipeline listings.
    pub fn description(&self) -> String {
        format!("Custom expression: {}", self.exp)
    }

    /// This stage does not change the domain classification of the trace.
    pub fn output_mode(&self, input_mode: DomainMode) -> DomainMode {
        input_mode
    }

    /// Install a new expression text.
    ///
    /// Rejects blank text with [`TraceMathError::EmptyExpression`] without
    /// touching the evaluator or the output. Does not itself recompute;
    /// use [`apply_expression`](Self::apply_expression) for the full
    /// edit-and-recompute path.
    pub fn set_expression(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(self.fail(TraceMathError::EmptyExpression));
        }
        if let Err(e) = self.evaluator.set_expression(text) {
            return Err(self.fail(TraceMathError::Evaluation(e.0)));
        }
        self.exp = text.to_string();
        self.needs_full = true;
        let mut evt = StageEvent::new(EventKind::EXPRESSION_CHANGED);
        evt.expression = Some(ExpressionMeta {
            text: self.exp.clone(),
        });
        self.events.emit(evt);
        Ok(())
    }

    /// Switch the active domain mode, re-binding the variable subset.
    /// Idempotent and does not disturb the expression text.
    pub fn set_mode(&mut self, mode: DomainMode) {
        self.vars.set_mode(mode);
        self.needs_full = true;
        let mut evt = StageEvent::new(EventKind::MODE_CHANGED);
        evt.mode = Some(ModeMeta { mode });
        self.events.emit(evt);
    }

    pub fn mode(&self) -> DomainMode {
        self.vars.mode()
    }

    /// Recompute output indices `[begin, end)` from `input`.
    ///
    /// The output buffer is resized to the input length first, so the
    /// index-for-index correspondence holds even when the input length
    /// changed. On evaluator failure the call aborts: indices written before
    /// the failing one keep their new values, later ones are untouched, and
    /// no range notification is emitted.
    pub fn recompute(
        &mut self,
        input: &[Sample],
        root: &dyn PipelineRoot,
        begin: usize,
        end: usize,
    ) -> Result<()> {
        if self.exp.is_empty() {
            return Err(self.fail(TraceMathError::EmptyExpression));
        }
        let end = end.min(input.len());
        let begin = begin.min(end);
        self.output.resize(input.len(), Sample::default());

        let mut last_angle = 0.0;
        for i in begin..end {
            let s = input[i];
            self.vars.load_sample(s.x, s.y, root);

            let mag = s.y.norm();
            let raw = s.y.arg();
            let ang = if i == begin {
                self.seed_angle(input, begin, raw)
            } else {
                unwrap_angle(last_angle, raw)
            };
            last_angle = ang;

            self.vars
                .set_impedance(reflection_to_impedance(mag, ang, self.config.reference_impedance));

            match self.evaluator.evaluate(&self.vars) {
                Ok(y) => self.output[i] = Sample::new(s.x, y),
                Err(e) => return Err(self.fail(TraceMathError::Evaluation(e.0))),
            }
        }

        self.status = StageStatus::Ok;
        debug!(begin, end, "recomputed expression output");
        self.events.emit(StageEvent::output_range_changed(begin, end));
        Ok(())
    }

    /// Unwrap reference for the first index of the recompute range.
    ///
    /// Restarting at the range start can introduce a discontinuity at the
    /// boundary of a partial update; the carry policy seeds from the
    /// preceding sample's raw angle instead. See [`ContinuityPolicy`].
    fn seed_angle(&self, input: &[Sample], begin: usize, raw: f64) -> f64 {
        match self.config.continuity {
            ContinuityPolicy::RestartAtRange => raw,
            ContinuityPolicy::CarryFromPrevious if begin > 0 => {
                unwrap_angle(input[begin - 1].y.arg(), raw)
            }
            ContinuityPolicy::CarryFromPrevious => raw,
        }
    }

    // ── Change-notification glue ─────────────────────────────────────────────
    //
    // The apply_* methods are the recovery boundary: they run the matching
    // re-set/re-bind plus recompute, and convert any failure into a status
    // update and an ERROR event instead of propagating it.

    /// Expression text edited: install it, then recompute the whole input.
    pub fn apply_expression(
        &mut self,
        text: &str,
        source: &dyn SampleSource,
        root: &dyn PipelineRoot,
    ) {
        if self.set_expression(text).is_err() {
            return;
        }
        let input = source.read_samples();
        if self.recompute(input, root, 0, input.len()).is_ok() {
            self.needs_full = false;
        }
    }

    /// Domain mode changed: re-bind, then recompute the whole input.
    pub fn apply_mode(
        &mut self,
        mode: DomainMode,
        source: &dyn SampleSource,
        root: &dyn PipelineRoot,
    ) {
        self.set_mode(mode);
        let input = source.read_samples();
        if self.recompute(input, root, 0, input.len()).is_ok() {
            self.needs_full = false;
        }
    }

    /// Upstream data changed in `[begin, end)`: recompute exactly that
    /// range, unless an invalidation is pending in which case the whole
    /// input is recomputed.
    pub fn apply_input_change(
        &mut self,
        source: &dyn SampleSource,
        root: &dyn PipelineRoot,
        begin: usize,
        end: usize,
    ) {
        let input = source.read_samples();
        if self.needs_full {
            if self.recompute(input, root, 0, input.len()).is_ok() {
                self.needs_full = false;
            }
        } else {
            let _ = self.recompute(input, root, begin, end);
        }
    }

    /// Record a failure, report it, and hand it back to the caller.
    fn fail(&mut self, err: TraceMathError) -> TraceMathError {
        let message = err.to_string();
        warn!(%message, "expression stage failure");
        self.status = StageStatus::Error(message.clone());
        self.events.emit(StageEvent::error(message));
        err
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────────────────────────
