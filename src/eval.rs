//! Expression evaluator capability.
//!
//! The stage does not define an expression grammar; it delegates parsing and
//! evaluation to an external component behind the [`Evaluator`] trait. The
//! host supplies whatever engine it likes (a parser-combinator evaluator, a
//! scripting engine, ...) and the stage only decides which variables are
//! visible per sample and when evaluation happens.
//!
//! Variables are passed to each evaluation as an explicit lookup
//! ([`VarResolver`]) instead of pre-bound mutable slots, so there is no
//! hidden aliasing between the engine and the evaluator.

use num_complex::Complex64;
use thiserror::Error;

/// A variable value visible to the evaluator: plain scalar or complex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Scalar(f64),
    Complex(Complex64),
}

impl Value {
    /// The value as a complex number (scalars get a zero imaginary part).
    pub fn as_complex(self) -> Complex64 {
        match self {
            Value::Scalar(v) => Complex64::new(v, 0.0),
            Value::Complex(v) => v,
        }
    }
}

/// Per-evaluation variable lookup handed to [`Evaluator::evaluate`].
///
/// Returns `None` for names that are not bound under the current domain
/// mode; a conforming evaluator reports such references as evaluation
/// errors (e.g. "unknown variable").
pub trait VarResolver {
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// Diagnostic produced by the external evaluator (syntax error, unknown
/// variable or function, arity mismatch, ...).
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct EvalError(pub String);

impl EvalError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self(msg.into())
    }
}

/// Capability interface for the external math-expression evaluator.
pub trait Evaluator {
    /// Install (and typically compile) the expression text. The text is
    /// guaranteed non-blank by the caller.
    fn set_expression(&mut self, text: &str) -> Result<(), EvalError>;

    /// Evaluate the installed expression against the given variables,
    /// producing a complex value.
    fn evaluate(&mut self, vars: &dyn VarResolver) -> Result<Complex64, EvalError>;
}

/// Closure-backed [`Evaluator`] adapter.
///
/// Useful for embedding hosts that already have an evaluation function, and
/// for tests. The closure receives the current expression text and the
/// per-sample variable lookup.
pub struct FnEvaluator<F>
where
    F: FnMut(&str, &dyn VarResolver) -> Result<Complex64, EvalError>,
{
    text: String,
    f: F,
}

impl<F> FnEvaluator<F>
where
    F: FnMut(&str, &dyn VarResolver) -> Result<Complex64, EvalError>,
{
    pub fn new(f: F) -> Self {
        Self {
            text: String::new(),
            f,
        }
    }

    /// The currently installed expression text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: FnMut(&str, &dyn VarResolver) -> Result<Complex64, EvalError>,
{
    fn set_expression(&mut self, text: &str) -> Result<(), EvalError> {
        self.text = text.to_string();
        Ok(())
    }

    fn evaluate(&mut self, vars: &dyn VarResolver) -> Result<Complex64, EvalError> {
        (self.f)(&self.text, vars)
    }
}

/// Minimal built-in evaluator that resolves a single variable reference.
///
/// This is *not* an expression language: the installed text must be exactly
/// one variable name (surrounding whitespace allowed). It exists so the
/// stage can be driven end-to-end without an external engine, and it is what
/// the crate's own tests use.
#[derive(Debug, Default)]
pub struct VarRefEvaluator {
    name: String,
}

impl Evaluator for VarRefEvaluator {
    fn set_expression(&mut self, text: &str) -> Result<(), EvalError> {
        let name = text.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(EvalError::new(format!(
                "not a variable reference: \"{text}\""
            )));
        }
        self.name = name.to_string();
        Ok(())
    }

    fn evaluate(&mut self, vars: &dyn VarResolver) -> Result<Complex64, EvalError> {
        vars.resolve(&self.name)
            .map(Value::as_complex)
            .ok_or_else(|| EvalError::new(format!("unknown variable: {}", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneVar;

    impl VarResolver for OneVar {
        fn resolve(&self, name: &str) -> Option<Value> {
            (name == "x").then_some(Value::Complex(Complex64::new(1.0, -2.0)))
        }
    }

    #[test]
    fn var_ref_evaluator_resolves_bound_variable() {
        let mut ev = VarRefEvaluator::default();
        ev.set_expression(" x ").unwrap();
        assert_eq!(ev.evaluate(&OneVar).unwrap(), Complex64::new(1.0, -2.0));
    }

    #[test]
    fn var_ref_evaluator_reports_unbound_variable() {
        let mut ev = VarRefEvaluator::default();
        ev.set_expression("w").unwrap();
        let err = ev.evaluate(&OneVar).unwrap_err();
        assert!(err.0.contains("unknown variable"));
    }

    #[test]
    fn var_ref_evaluator_rejects_non_identifiers() {
        let mut ev = VarRefEvaluator::default();
        assert!(ev.set_expression("x + z").is_err());
    }

    #[test]
    fn scalar_value_as_complex_has_zero_imag() {
        assert_eq!(Value::Scalar(3.5).as_complex(), Complex64::new(3.5, 0.0));
    }
}
