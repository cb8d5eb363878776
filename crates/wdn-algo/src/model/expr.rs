use std::fmt;

use serde::Serialize;

use super::VarId;

/// Nonlinear univariate term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum NonlinearTerm {
    /// `coef · x · |x|^(exponent - 1)`
    SignedPower { var: VarId, coef: f64, exponent: f64 },
    /// `coef · x^exponent`, defined for `x >= 0`
    Power { var: VarId, coef: f64, exponent: f64 },
}

impl NonlinearTerm {
    pub fn var(&self) -> VarId {
        match self {
            NonlinearTerm::SignedPower { var, .. } | NonlinearTerm::Power { var, .. } => *var,
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        match self {
            NonlinearTerm::SignedPower { coef, exponent, .. } => {
                coef * x.signum() * x.abs().powf(*exponent)
            }
            NonlinearTerm::Power { coef, exponent, .. } => coef * x.max(0.0).powf(*exponent),
        }
    }

    /// Whether the term is convex on its domain.
    pub fn is_convex(&self) -> bool {
        match self {
            NonlinearTerm::SignedPower { .. } => false,
            NonlinearTerm::Power { coef, exponent, .. } => *coef >= 0.0 && *exponent >= 1.0,
        }
    }

    fn remap(&self, f: &impl Fn(VarId) -> VarId) -> Self {
        match *self {
            NonlinearTerm::SignedPower { var, coef, exponent } => NonlinearTerm::SignedPower {
                var: f(var),
                coef,
                exponent,
            },
            NonlinearTerm::Power { var, coef, exponent } => NonlinearTerm::Power {
                var: f(var),
                coef,
                exponent,
            },
        }
    }
}

/// Sum of linear terms, nonlinear terms and a constant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Expr {
    pub linear: Vec<(VarId, f64)>,
    pub nonlinear: Vec<NonlinearTerm>,
    pub constant: f64,
}

impl Expr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(var: VarId) -> Self {
        Self::new().term(var, 1.0)
    }

    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        if coef != 0.0 {
            self.linear.push((var, coef));
        }
        self
    }

    pub fn constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    pub fn signed_power(mut self, var: VarId, coef: f64, exponent: f64) -> Self {
        if coef != 0.0 {
            self.nonlinear
                .push(NonlinearTerm::SignedPower { var, coef, exponent });
        }
        self
    }

    pub fn power(mut self, var: VarId, coef: f64, exponent: f64) -> Self {
        if coef != 0.0 {
            self.nonlinear.push(NonlinearTerm::Power { var, coef, exponent });
        }
        self
    }

    pub fn plus(mut self, other: Expr) -> Self {
        self.linear.extend(other.linear);
        self.nonlinear.extend(other.nonlinear);
        self.constant += other.constant;
        self
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for (_, coef) in &mut self.linear {
            *coef *= factor;
        }
        for term in &mut self.nonlinear {
            match term {
                NonlinearTerm::SignedPower { coef, .. } | NonlinearTerm::Power { coef, .. } => {
                    *coef *= factor
                }
            }
        }
        self.constant *= factor;
        self
    }

    pub fn is_linear(&self) -> bool {
        self.nonlinear.is_empty()
    }

    pub fn eval(&self, values: &[f64]) -> f64 {
        let value = |v: VarId| values.get(v.index()).copied().unwrap_or(0.0);
        let linear: f64 = self.linear.iter().map(|(v, c)| c * value(*v)).sum();
        let nonlinear: f64 = self.nonlinear.iter().map(|t| t.eval(value(t.var()))).sum();
        linear + nonlinear + self.constant
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.linear
            .iter()
            .map(|(v, _)| *v)
            .chain(self.nonlinear.iter().map(NonlinearTerm::var))
    }

    pub(crate) fn remap(&self, f: &impl Fn(VarId) -> VarId) -> Self {
        Self {
            linear: self.linear.iter().map(|(v, c)| (f(*v), *c)).collect(),
            nonlinear: self.nonlinear.iter().map(|t| t.remap(f)).collect(),
            constant: self.constant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    Le,
    Eq,
    Ge,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Le => write!(f, "<="),
            Sense::Eq => write!(f, "=="),
            Sense::Ge => write!(f, ">="),
        }
    }
}

/// `expr (<= | == | >=) rhs`, with the expression constant folded into `rhs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraint {
    pub name: String,
    pub expr: Expr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(name: impl Into<String>, mut expr: Expr, sense: Sense, rhs: f64) -> Self {
        let rhs = rhs - expr.constant;
        expr.constant = 0.0;
        Self {
            name: name.into(),
            expr,
            sense,
            rhs,
        }
    }

    pub fn le(name: impl Into<String>, expr: Expr, rhs: f64) -> Self {
        Self::new(name, expr, Sense::Le, rhs)
    }

    pub fn eq(name: impl Into<String>, expr: Expr, rhs: f64) -> Self {
        Self::new(name, expr, Sense::Eq, rhs)
    }

    pub fn ge(name: impl Into<String>, expr: Expr, rhs: f64) -> Self {
        Self::new(name, expr, Sense::Ge, rhs)
    }

    /// Amount by which `values` violates the constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.eval(values);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => (lhs - self.rhs).abs(),
        }
    }

    /// Convex when the feasible set `{x : expr sense rhs}` is convex.
    pub fn is_convex(&self) -> bool {
        if self.expr.is_linear() {
            return true;
        }
        let all_convex = self.expr.nonlinear.iter().all(NonlinearTerm::is_convex);
        let all_concave = self.expr.nonlinear.iter().all(|t| match t {
            NonlinearTerm::Power { coef, exponent, .. } => *coef <= 0.0 && *exponent >= 1.0,
            NonlinearTerm::SignedPower { .. } => false,
        });
        match self.sense {
            Sense::Le => all_convex,
            Sense::Ge => all_concave,
            Sense::Eq => false,
        }
    }
}
