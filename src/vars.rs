//! Variable context manager: the fixed slot set and its per-mode visibility.

use num_complex::Complex64;

use crate::data::samples::DomainMode;
use crate::eval::{Value, VarResolver};

/// Pipeline-root capability consumed by the stage: converts a time
/// coordinate to a distance (used to derive the `d` variable). Supplied by
/// the pipeline owner, never implemented here.
pub trait PipelineRoot {
    fn time_to_distance(&self, t: f64) -> f64;
}

/// Owns the fixed variable slots (`t`, `d`, `f`, `w`, `x`, `z`) and decides
/// which subset the evaluator can resolve under the active [`DomainMode`]:
///
/// | mode      | extra variables |
/// |-----------|-----------------|
/// | Time      | `t`, `d`        |
/// | Frequency | `f`, `w`        |
/// | Other     | none            |
///
/// `x` (raw sample) and `z` (derived impedance) are resolvable in every
/// mode. The engine refreshes all slots for each sample before evaluating.
#[derive(Debug, Clone)]
pub struct VariableContext {
    mode: DomainMode,
    t: f64,
    d: f64,
    f: f64,
    w: f64,
    x: Complex64,
    z: Complex64,
}

impl Default for VariableContext {
    fn default() -> Self {
        Self::new(DomainMode::default())
    }
}

impl VariableContext {
    pub fn new(mode: DomainMode) -> Self {
        Self {
            mode,
            t: 0.0,
            d: 0.0,
            f: 0.0,
            w: 0.0,
            x: Complex64::default(),
            z: Complex64::default(),
        }
    }

    /// Switch the active domain mode. Idempotent; does not touch the slot
    /// values or the expression text.
    pub fn set_mode(&mut self, mode: DomainMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> DomainMode {
        self.mode
    }

    /// Refresh the sample-derived slots: `t` and `f` take the domain
    /// coordinate, `w` its angular equivalent, `d` goes through the root's
    /// time-to-distance conversion, `x` takes the raw complex value.
    pub fn load_sample(&mut self, x: f64, y: Complex64, root: &dyn PipelineRoot) {
        self.t = x;
        self.f = x;
        self.w = x * std::f64::consts::TAU;
        self.d = root.time_to_distance(x);
        self.x = y;
    }

    /// Set the derived impedance slot for the current sample.
    pub fn set_impedance(&mut self, z: Complex64) {
        self.z = z;
    }
}

impl VarResolver for VariableContext {
    fn resolve(&self, name: &str) -> Option<Value> {
        match name {
            "x" => Some(Value::Complex(self.x)),
            "z" => Some(Value::Complex(self.z)),
            "t" if self.mode == DomainMode::Time => Some(Value::Scalar(self.t)),
            "d" if self.mode == DomainMode::Time => Some(Value::Scalar(self.d)),
            "f" if self.mode == DomainMode::Frequency => Some(Value::Scalar(self.f)),
            "w" if self.mode == DomainMode::Frequency => Some(Value::Scalar(self.w)),
            _ => None,
        }
    }
}
