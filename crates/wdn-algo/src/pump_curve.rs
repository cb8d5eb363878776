//! Quadratic pump head-gain curves.
//!
//! A curve `g(q) = c1·q² + c2·q + c3` is fitted to the sampled
//! `(flow, head_gain)` pairs of a pump record. Samples with fewer than three
//! distinct flows are extended with a shutoff anchor `(0, 1.33·h)` at the
//! lowest sampled flow and, if still short, a runout anchor `(2·q, 0)` at the
//! highest before fitting. The least-squares normal equations are solved
//! with a dense LU factorization.

use faer::{prelude::*, solvers::PartialPivLu, Mat};
use serde::Serialize;
use tracing::debug;
use wdn_core::{HeadCurveForm, LinkId};

use crate::error::{BuildError, BuildResult};

/// Shutoff head relative to the lowest sampled head.
const SHUTOFF_HEAD_RATIO: f64 = 1.33;

/// Fitted head-gain curve of one pump.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PumpCurve {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
}

impl PumpCurve {
    /// Fit a curve to the samples of `link` using the requested form.
    pub fn fit(link: LinkId, points: &[(f64, f64)], form: HeadCurveForm) -> BuildResult<Self> {
        if points.is_empty() {
            return Err(BuildError::PumpCurve {
                link,
                reason: "head curve has no points".to_string(),
            });
        }
        let curve = match form {
            HeadCurveForm::Quadratic => Self::fit_quadratic(link, points)?,
            HeadCurveForm::BestEfficiencyPoint => Self::from_best_efficiency_point(link, points)?,
        };
        curve.check(link)?;
        debug!(
            link = link.value(),
            c1 = curve.c1,
            c2 = curve.c2,
            c3 = curve.c3,
            "fitted pump curve"
        );
        Ok(curve)
    }

    fn fit_quadratic(link: LinkId, points: &[(f64, f64)]) -> BuildResult<Self> {
        let mut samples = points.to_vec();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        // Underdetermined curves get the shutoff anchor, then the runout anchor.
        if distinct_flows(&samples) < 3 {
            let (q_first, h_first) = samples[0];
            if q_first != 0.0 {
                samples.insert(0, (0.0, SHUTOFF_HEAD_RATIO * h_first));
            }
        }
        if distinct_flows(&samples) < 3 {
            let (q_last, _) = samples[samples.len() - 1];
            samples.push((2.0 * q_last, 0.0));
        }

        let flows = distinct_flows(&samples);
        if flows < 3 {
            return Err(BuildError::PumpCurve {
                link,
                reason: format!(
                    "a quadratic fit needs three distinct flows, got {}",
                    flows
                ),
            });
        }

        // Normal equations (AᵀA)c = Aᵀh with rows [q², q, 1].
        let mut ata = [[0.0_f64; 3]; 3];
        let mut ath = [0.0_f64; 3];
        for (q, h) in &samples {
            let row = [q * q, *q, 1.0];
            for i in 0..3 {
                for j in 0..3 {
                    ata[i][j] += row[i] * row[j];
                }
                ath[i] += row[i] * h;
            }
        }

        let mat = Mat::from_fn(3, 3, |i, j| ata[i][j]);
        let rhs = Mat::from_fn(3, 1, |i, _| ath[i]);
        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs);

        let curve = PumpCurve {
            c1: sol.read(0, 0),
            c2: sol.read(1, 0),
            c3: sol.read(2, 0),
        };
        if !(curve.c1.is_finite() && curve.c2.is_finite() && curve.c3.is_finite()) {
            return Err(BuildError::PumpCurve {
                link,
                reason: "least-squares system is singular".to_string(),
            });
        }
        Ok(curve)
    }

    fn from_best_efficiency_point(link: LinkId, points: &[(f64, f64)]) -> BuildResult<Self> {
        match points {
            [(q, h)] if *q > 0.0 && *h > 0.0 => Ok(PumpCurve {
                c1: -h / (3.0 * q * q),
                c2: 0.0,
                c3: 4.0 * h / 3.0,
            }),
            [_] => Err(BuildError::PumpCurve {
                link,
                reason: "best efficiency point must have positive flow and head".to_string(),
            }),
            _ => Err(BuildError::InvalidInput(format!(
                "best efficiency point form for {} requires exactly one point, got {}",
                link,
                points.len()
            ))),
        }
    }

    fn check(&self, link: LinkId) -> BuildResult<()> {
        if !(self.c1 < 0.0) {
            return Err(BuildError::PumpCurve {
                link,
                reason: format!("curve is not concave decreasing (c1 = {})", self.c1),
            });
        }
        let disc = self.c2 * self.c2 - 4.0 * self.c1 * self.c3;
        if disc < 0.0 || self.max_flow() <= 0.0 {
            return Err(BuildError::PumpCurve {
                link,
                reason: "curve has no positive zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn head_gain(&self, q: f64) -> f64 {
        self.c1 * q * q + self.c2 * q + self.c3
    }

    pub fn slope(&self, q: f64) -> f64 {
        2.0 * self.c1 * q + self.c2
    }

    /// Positive flow at which head gain reaches zero.
    pub fn max_flow(&self) -> f64 {
        let disc = self.c2 * self.c2 - 4.0 * self.c1 * self.c3;
        (-self.c2 - disc.max(0.0).sqrt()) / (2.0 * self.c1)
    }

    /// Vertex value of the quadratic.
    pub fn max_head_gain(&self) -> f64 {
        self.c3 - self.c2 * self.c2 / (4.0 * self.c1)
    }

    /// Tangent line `(slope, intercept)` at `q0`.
    pub fn tangent(&self, q0: f64) -> (f64, f64) {
        (self.slope(q0), self.c3 - self.c1 * q0 * q0)
    }
}

fn distinct_flows(samples: &[(f64, f64)]) -> usize {
    let mut flows: Vec<f64> = samples.iter().map(|(q, _)| *q).collect();
    flows.sort_by(f64::total_cmp);
    flows.dedup();
    flows.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> LinkId {
        LinkId::new(1)
    }

    #[test]
    fn recovers_exact_quadratic() {
        let (c1, c2, c3) = (-2.0, 1.5, 10.0);
        let points: Vec<(f64, f64)> = [0.5, 1.0, 2.0]
            .iter()
            .map(|q| (*q, c1 * q * q + c2 * q + c3))
            .collect();
        let curve = PumpCurve::fit(link(), &points, HeadCurveForm::Quadratic).unwrap();
        assert!((curve.c1 - c1).abs() < 1e-9);
        assert!((curve.c2 - c2).abs() < 1e-9);
        assert!((curve.c3 - c3).abs() < 1e-9);
    }

    #[test]
    fn single_point_uses_anchor_samples() {
        let curve = PumpCurve::fit(link(), &[(10.0, 30.0)], HeadCurveForm::Quadratic).unwrap();
        assert!((curve.head_gain(0.0) - 39.9).abs() < 1e-7);
        assert!((curve.head_gain(10.0) - 30.0).abs() < 1e-7);
        assert!(curve.head_gain(20.0).abs() < 1e-7);
        assert!((curve.max_flow() - 20.0).abs() < 1e-7);
    }

    #[test]
    fn two_points_gain_the_shutoff_anchor() {
        let curve =
            PumpCurve::fit(link(), &[(2.0, 5.0), (1.0, 10.0)], HeadCurveForm::Quadratic).unwrap();
        assert!((curve.head_gain(0.0) - 13.3).abs() < 1e-9);
        assert!((curve.head_gain(1.0) - 10.0).abs() < 1e-9);
        assert!((curve.head_gain(2.0) - 5.0).abs() < 1e-9);
        assert!((curve.c1 + 0.85).abs() < 1e-9);
        assert!(curve.max_flow() > 2.0);
    }

    #[test]
    fn repeated_flow_gains_both_anchors() {
        let curve =
            PumpCurve::fit(link(), &[(3.0, 9.0), (3.0, 9.0)], HeadCurveForm::Quadratic).unwrap();
        assert!((curve.head_gain(3.0) - 9.0).abs() < 1e-9);
        assert!((curve.max_flow() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn best_efficiency_point_coefficients() {
        let curve =
            PumpCurve::fit(link(), &[(2.0, 60.0)], HeadCurveForm::BestEfficiencyPoint).unwrap();
        assert!((curve.c1 + 5.0).abs() < 1e-12);
        assert_eq!(curve.c2, 0.0);
        assert!((curve.c3 - 80.0).abs() < 1e-12);
        assert!((curve.max_flow() - 4.0).abs() < 1e-12);
        assert!((curve.max_head_gain() - 80.0).abs() < 1e-12);
    }

    #[test]
    fn best_efficiency_point_requires_single_point() {
        let err = PumpCurve::fit(
            link(),
            &[(1.0, 10.0), (2.0, 5.0)],
            HeadCurveForm::BestEfficiencyPoint,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidInput(_)));
    }

    #[test]
    fn rejects_empty_and_increasing_curves() {
        assert!(matches!(
            PumpCurve::fit(link(), &[], HeadCurveForm::Quadratic),
            Err(BuildError::PumpCurve { .. })
        ));
        let rising = [(0.0, 10.0), (1.0, 12.0), (2.0, 16.0)];
        assert!(matches!(
            PumpCurve::fit(link(), &rising, HeadCurveForm::Quadratic),
            Err(BuildError::PumpCurve { .. })
        ));
    }

    #[test]
    fn vertex_and_tangent() {
        let curve = PumpCurve {
            c1: -1.0,
            c2: 4.0,
            c3: 12.0,
        };
        assert!((curve.max_head_gain() - 16.0).abs() < 1e-12);
        assert!((curve.max_flow() - 6.0).abs() < 1e-12);
        let (slope, intercept) = curve.tangent(3.0);
        assert!((slope * 3.0 + intercept - curve.head_gain(3.0)).abs() < 1e-12);
        // Tangents of a concave curve lie above it.
        assert!(slope * 5.0 + intercept >= curve.head_gain(5.0));
    }
}
