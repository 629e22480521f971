//! Parameter expressions for gate arguments.
//!
//! Gate parameters are kept as expression trees so that values like
//! `-0.1 + 0.55*pi` survive compilation symbolically and render back as
//! the same literal text. Evaluation to `f64` is tolerance-aware: inverse
//! trig arguments that land marginally outside their domain through
//! floating-point accumulation are clamped to the boundary instead of
//! failing.

use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::IrError;

/// How far outside a closed domain an argument may land before it is a
/// real domain violation rather than accumulated rounding.
const DOMAIN_TOLERANCE: f64 = 1e-8;

/// Unary math functions usable inside a parameter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathFn {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Exp,
    Ln,
    Sqrt,
}

impl MathFn {
    /// The function name as written in source text.
    pub fn name(self) -> &'static str {
        match self {
            MathFn::Sin => "sin",
            MathFn::Cos => "cos",
            MathFn::Tan => "tan",
            MathFn::Asin => "asin",
            MathFn::Acos => "acos",
            MathFn::Atan => "atan",
            MathFn::Exp => "exp",
            MathFn::Ln => "ln",
            MathFn::Sqrt => "sqrt",
        }
    }

    /// Look up a function by source name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => MathFn::Sin,
            "cos" => MathFn::Cos,
            "tan" => MathFn::Tan,
            "asin" => MathFn::Asin,
            "acos" => MathFn::Acos,
            "atan" => MathFn::Atan,
            "exp" => MathFn::Exp,
            "ln" => MathFn::Ln,
            "sqrt" => MathFn::Sqrt,
            _ => return None,
        })
    }

    /// Apply the function, clamping near-boundary arguments.
    pub fn apply(self, x: f64) -> Result<f64, IrError> {
        match self {
            MathFn::Sin => Ok(x.sin()),
            MathFn::Cos => Ok(x.cos()),
            MathFn::Tan => Ok(x.tan()),
            MathFn::Asin => Ok(clamp_unit(self, x)?.asin()),
            MathFn::Acos => Ok(clamp_unit(self, x)?.acos()),
            MathFn::Atan => Ok(x.atan()),
            MathFn::Exp => Ok(x.exp()),
            MathFn::Ln => {
                if x <= 0.0 {
                    Err(IrError::ExpressionDomain {
                        func: "ln",
                        arg: x,
                    })
                } else {
                    Ok(x.ln())
                }
            }
            MathFn::Sqrt => {
                if x < -DOMAIN_TOLERANCE {
                    Err(IrError::ExpressionDomain {
                        func: "sqrt",
                        arg: x,
                    })
                } else {
                    Ok(x.max(0.0).sqrt())
                }
            }
        }
    }
}

/// Clamp an inverse-trig argument into [-1, 1] if it is within tolerance.
fn clamp_unit(func: MathFn, x: f64) -> Result<f64, IrError> {
    if x.abs() <= 1.0 {
        Ok(x)
    } else if x.abs() <= 1.0 + DOMAIN_TOLERANCE {
        Ok(x.signum())
    } else {
        Err(IrError::ExpressionDomain {
            func: func.name(),
            arg: x,
        })
    }
}

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A free symbolic parameter.
    Symbol(String),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Power, right-associative.
    Pow(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Unary math function call.
    Call(MathFn, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Create a function call expression.
    pub fn call(func: MathFn, arg: ParameterExpression) -> Self {
        ParameterExpression::Call(func, Box::new(arg))
    }

    /// Check whether this expression contains any free symbols.
    ///
    /// `pi` is not a free symbol; it always evaluates.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) | ParameterExpression::Call(_, e) => e.is_symbolic(),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b)
            | ParameterExpression::Pow(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Evaluate against a binding of symbol names to values.
    pub fn eval(&self, bindings: &FxHashMap<String, f64>) -> Result<f64, IrError> {
        match self {
            ParameterExpression::Constant(v) => Ok(*v),
            ParameterExpression::Symbol(name) => {
                bindings
                    .get(name)
                    .copied()
                    .ok_or_else(|| IrError::UnboundParameter {
                        name: name.clone(),
                    })
            }
            ParameterExpression::Pi => Ok(PI),
            ParameterExpression::Neg(e) => Ok(-e.eval(bindings)?),
            ParameterExpression::Add(a, b) => Ok(a.eval(bindings)? + b.eval(bindings)?),
            ParameterExpression::Sub(a, b) => Ok(a.eval(bindings)? - b.eval(bindings)?),
            ParameterExpression::Mul(a, b) => Ok(a.eval(bindings)? * b.eval(bindings)?),
            ParameterExpression::Div(a, b) => {
                let divisor = b.eval(bindings)?;
                if divisor == 0.0 {
                    return Err(IrError::DivisionByZero);
                }
                Ok(a.eval(bindings)? / divisor)
            }
            ParameterExpression::Pow(a, b) => Ok(a.eval(bindings)?.powf(b.eval(bindings)?)),
            ParameterExpression::Call(func, e) => func.apply(e.eval(bindings)?),
        }
    }

    /// Try to evaluate with no bindings. `None` if a free symbol remains
    /// or evaluation hits a domain error.
    pub fn as_f64(&self) -> Option<f64> {
        self.eval(&FxHashMap::default()).ok()
    }

    /// All free symbol names, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) | ParameterExpression::Call(_, e) => {
                e.collect_symbols(set);
            }
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b)
            | ParameterExpression::Pow(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Substitute a named symbol with another expression.
    pub fn substitute(&self, name: &str, replacement: &ParameterExpression) -> Self {
        match self {
            ParameterExpression::Symbol(n) if n == name => replacement.clone(),
            ParameterExpression::Constant(_)
            | ParameterExpression::Pi
            | ParameterExpression::Symbol(_) => self.clone(),
            ParameterExpression::Neg(e) => {
                ParameterExpression::Neg(Box::new(e.substitute(name, replacement)))
            }
            ParameterExpression::Call(func, e) => {
                ParameterExpression::Call(*func, Box::new(e.substitute(name, replacement)))
            }
            ParameterExpression::Add(a, b) => ParameterExpression::Add(
                Box::new(a.substitute(name, replacement)),
                Box::new(b.substitute(name, replacement)),
            ),
            ParameterExpression::Sub(a, b) => ParameterExpression::Sub(
                Box::new(a.substitute(name, replacement)),
                Box::new(b.substitute(name, replacement)),
            ),
            ParameterExpression::Mul(a, b) => ParameterExpression::Mul(
                Box::new(a.substitute(name, replacement)),
                Box::new(b.substitute(name, replacement)),
            ),
            ParameterExpression::Div(a, b) => ParameterExpression::Div(
                Box::new(a.substitute(name, replacement)),
                Box::new(b.substitute(name, replacement)),
            ),
            ParameterExpression::Pow(a, b) => ParameterExpression::Pow(
                Box::new(a.substitute(name, replacement)),
                Box::new(b.substitute(name, replacement)),
            ),
        }
    }

    /// Bind a symbol to a value, returning a new expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        self.substitute(name, &ParameterExpression::Constant(value))
    }

    /// Numeric value of a subtree that contains neither symbols nor `pi`.
    ///
    /// Used by [`simplify`](Self::simplify) so that folding never turns a
    /// symbolic `pi` into its decimal expansion.
    pub fn literal_value(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Symbol(_) | ParameterExpression::Pi => None,
            ParameterExpression::Neg(e) => e.literal_value().map(|v| -v),
            ParameterExpression::Add(a, b) => Some(a.literal_value()? + b.literal_value()?),
            ParameterExpression::Sub(a, b) => Some(a.literal_value()? - b.literal_value()?),
            ParameterExpression::Mul(a, b) => Some(a.literal_value()? * b.literal_value()?),
            ParameterExpression::Div(a, b) => {
                let divisor = b.literal_value()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(a.literal_value()? / divisor)
            }
            ParameterExpression::Pow(a, b) => {
                Some(a.literal_value()?.powf(b.literal_value()?))
            }
            // Call results are always numeric once the argument evaluates,
            // even when the argument mentions pi. sin(pi/2) has no literal
            // rendering worth keeping.
            ParameterExpression::Call(func, e) => func.apply(e.as_f64()?).ok(),
        }
    }

    /// Fold numeric subexpressions while keeping `pi` symbolic.
    ///
    /// `-0.1 + 0.55*pi` simplifies to itself; `sin(-0.5)` folds to its
    /// decimal value; `1 + 2` folds to `3`.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.literal_value() {
            return ParameterExpression::Constant(v);
        }
        match self {
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.simplify())),
            ParameterExpression::Add(a, b) => {
                ParameterExpression::Add(Box::new(a.simplify()), Box::new(b.simplify()))
            }
            ParameterExpression::Sub(a, b) => {
                ParameterExpression::Sub(Box::new(a.simplify()), Box::new(b.simplify()))
            }
            ParameterExpression::Mul(a, b) => {
                ParameterExpression::Mul(Box::new(a.simplify()), Box::new(b.simplify()))
            }
            ParameterExpression::Div(a, b) => {
                ParameterExpression::Div(Box::new(a.simplify()), Box::new(b.simplify()))
            }
            ParameterExpression::Pow(a, b) => {
                ParameterExpression::Pow(Box::new(a.simplify()), Box::new(b.simplify()))
            }
            ParameterExpression::Call(func, e) => {
                ParameterExpression::Call(*func, Box::new(e.simplify()))
            }
            _ => self.clone(),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            ParameterExpression::Add(..) | ParameterExpression::Sub(..) => 1,
            ParameterExpression::Mul(..) | ParameterExpression::Div(..) => 2,
            ParameterExpression::Neg(..) => 3,
            ParameterExpression::Pow(..) => 4,
            ParameterExpression::Constant(_)
            | ParameterExpression::Symbol(_)
            | ParameterExpression::Pi
            | ParameterExpression::Call(..) => 5,
        }
    }

    fn fmt_child(
        &self,
        f: &mut fmt::Formatter<'_>,
        min_prec: u8,
    ) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for ParameterExpression {
    /// Render as source text with minimal parentheses.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Pi => write!(f, "pi"),
            ParameterExpression::Neg(e) => {
                write!(f, "-")?;
                e.fmt_child(f, 3)
            }
            ParameterExpression::Add(a, b) => {
                a.fmt_child(f, 1)?;
                write!(f, " + ")?;
                b.fmt_child(f, 2)
            }
            ParameterExpression::Sub(a, b) => {
                a.fmt_child(f, 1)?;
                write!(f, " - ")?;
                b.fmt_child(f, 2)
            }
            ParameterExpression::Mul(a, b) => {
                a.fmt_child(f, 2)?;
                write!(f, "*")?;
                b.fmt_child(f, 3)
            }
            ParameterExpression::Div(a, b) => {
                a.fmt_child(f, 2)?;
                write!(f, "/")?;
                b.fmt_child(f, 3)
            }
            ParameterExpression::Pow(a, b) => {
                a.fmt_child(f, 5)?;
                write!(f, "^")?;
                // right-associative: a^b^c prints without parens
                b.fmt_child(f, 4)
            }
            ParameterExpression::Call(func, e) => write!(f, "{}({e})", func.name()),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(text: &str) -> ParameterExpression {
        // small helpers keep the tests readable
        match text {
            "-0.1 + 0.55*pi" => {
                ParameterExpression::Constant(-0.1)
                    + ParameterExpression::Constant(0.55) * ParameterExpression::Pi
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn constant_roundtrip() {
        let p = ParameterExpression::constant(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn symbol_is_free() {
        let p = ParameterExpression::symbol("theta");
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        assert!(p.symbols().contains("theta"));
    }

    #[test]
    fn pi_evaluates_but_stays_symbolic_in_simplify() {
        let p = expr("-0.1 + 0.55*pi");
        let v = p.as_f64().unwrap();
        assert!((v - (-0.1 + 0.55 * PI)).abs() < 1e-12);
        assert_eq!(p.simplify(), p);
    }

    #[test]
    fn display_minimal_parens() {
        assert_eq!(expr("-0.1 + 0.55*pi").to_string(), "-0.1 + 0.55*pi");

        let nested = (ParameterExpression::constant(1.0)
            + ParameterExpression::constant(2.0))
            * ParameterExpression::Pi;
        assert_eq!(nested.to_string(), "(1 + 2)*pi");

        let neg = -(ParameterExpression::Pi / ParameterExpression::constant(2.0));
        assert_eq!(neg.to_string(), "-(pi/2)");
    }

    #[test]
    fn pow_right_associative_display() {
        let p = ParameterExpression::Pow(
            Box::new(ParameterExpression::constant(2.0)),
            Box::new(ParameterExpression::Pow(
                Box::new(ParameterExpression::constant(3.0)),
                Box::new(ParameterExpression::constant(2.0)),
            )),
        );
        assert_eq!(p.to_string(), "2^3^2");
        assert_eq!(p.as_f64(), Some(512.0));
    }

    #[test]
    fn call_folds_to_decimal() {
        let p = ParameterExpression::call(MathFn::Sin, ParameterExpression::constant(-0.5));
        let folded = p.simplify();
        assert_eq!(folded.to_string(), "-0.479425538604203");
    }

    #[test]
    fn acos_clamps_near_boundary() {
        assert_eq!(MathFn::Acos.apply(1.000_000_000_000_000_2).unwrap(), 0.0);
        assert!((MathFn::Asin.apply(-1.000_000_000_000_000_2).unwrap()
            + PI / 2.0)
            .abs()
            < 1e-12);
    }

    #[test]
    fn acos_rejects_far_outside() {
        assert!(matches!(
            MathFn::Acos.apply(1.5),
            Err(IrError::ExpressionDomain { func: "acos", .. })
        ));
    }

    #[test]
    fn sqrt_clamps_tiny_negative() {
        assert_eq!(MathFn::Sqrt.apply(-1e-12).unwrap(), 0.0);
        assert!(MathFn::Sqrt.apply(-0.1).is_err());
    }

    #[test]
    fn ln_rejects_nonpositive() {
        assert!(MathFn::Ln.apply(0.0).is_err());
        assert!(MathFn::Ln.apply(-1.0).is_err());
    }

    #[test]
    fn division_by_zero() {
        let p = ParameterExpression::constant(1.0) / ParameterExpression::constant(0.0);
        assert!(matches!(
            p.eval(&FxHashMap::default()),
            Err(IrError::DivisionByZero)
        ));
    }

    #[test]
    fn unbound_symbol_reports_name() {
        let p = ParameterExpression::symbol("theta");
        match p.eval(&FxHashMap::default()) {
            Err(IrError::UnboundParameter { name }) => assert_eq!(name, "theta"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn substitute_actual_for_formal() {
        let body = ParameterExpression::symbol("theta") / ParameterExpression::constant(2.0);
        let actual = ParameterExpression::Pi;
        let out = body.substitute("theta", &actual);
        assert_eq!(out.to_string(), "pi/2");
        assert!((out.as_f64().unwrap() - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn bind_then_eval() {
        let p = ParameterExpression::symbol("theta");
        let bound = p.bind("theta", PI / 2.0);
        assert!(!bound.is_symbolic());
        assert!((bound.as_f64().unwrap() - PI / 2.0).abs() < 1e-10);
    }
}
