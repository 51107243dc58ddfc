//! Configuration for the expression stage.

// ─────────────────────────────────────────────────────────────────────────────
// ContinuityPolicy
// ─────────────────────────────────────────────────────────────────────────────

/// How the phase-unwrap reference is seeded at the start of a partial
/// recompute range.
///
/// The unwrapped angles are not persisted between recompute calls, so when a
/// partial upstream update recomputes `[begin, end)` with `begin > 0` the
/// unwrap reference has to be re-seeded. The two policies differ in what
/// they seed it with:
///
/// - [`RestartAtRange`](ContinuityPolicy::RestartAtRange) restarts at the
///   raw angle of `input[begin]`. A partial update may therefore introduce
///   a discontinuity at the range boundary.
/// - [`CarryFromPrevious`](ContinuityPolicy::CarryFromPrevious) seeds from
///   the raw angle of `input[begin - 1]`, keeping the first recomputed
///   sample continuous with its predecessor. Winding accumulated before
///   `begin` is still lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuityPolicy {
    #[default]
    RestartAtRange,
    CarryFromPrevious,
}

// ─────────────────────────────────────────────────────────────────────────────
// StageConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric configuration for the expression stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageConfig {
    /// Reference impedance Z0 in ohms used by the reflection-coefficient →
    /// impedance conversion. Default: `50.0`.
    pub reference_impedance: f64,
    /// Phase-unwrap seeding at partial-range boundaries.
    pub continuity: ContinuityPolicy,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            reference_impedance: 50.0,
            continuity: ContinuityPolicy::default(),
        }
    }
}
