//! Friction head-loss coefficients.
//!
//! Head loss along a link of length `L` is `L · r · |q|^α`, where `r` is the
//! per-unit-length resistance returned here and `α` is
//! [`HeadLossMethod::exponent`].

use wdn_core::{HeadLossMethod, LinkId, Options};

use crate::error::{BuildError, BuildResult};

/// Per-unit-length Hazen-Williams resistance for diameter `d` and C factor `c`.
pub fn hazen_williams(d: f64, c: f64) -> f64 {
    10.67 / (c.powf(1.852) * d.powf(4.87))
}

/// Swamee-Jain approximation of the Darcy friction factor.
pub fn swamee_jain(d: f64, roughness: f64, reynolds: f64) -> f64 {
    let term = (roughness / (3.7 * d) + 5.74 / reynolds.powf(0.9)).log10();
    0.25 / (term * term)
}

/// Per-unit-length Darcy-Weisbach resistance, friction factor evaluated at
/// the nominal Reynolds number `base_speed · d / viscosity`.
pub fn darcy_weisbach(d: f64, roughness: f64, viscosity: f64, base_speed: f64) -> f64 {
    let reynolds = base_speed * d / viscosity;
    0.0826 * swamee_jain(d, roughness, reynolds) / d.powi(5)
}

/// Resistance of one diameter candidate of `link` under the global options.
pub fn resistance(link: LinkId, options: &Options, d: f64, roughness: f64) -> BuildResult<f64> {
    if !(d.is_finite() && d > 0.0) {
        return Err(BuildError::InvalidInput(format!(
            "{} has non-positive diameter {}",
            link, d
        )));
    }
    if !(roughness.is_finite() && roughness > 0.0) {
        return Err(BuildError::InvalidInput(format!(
            "{} has non-positive roughness {}",
            link, roughness
        )));
    }
    let r = match options.head_loss {
        HeadLossMethod::HazenWilliams => hazen_williams(d, roughness),
        HeadLossMethod::DarcyWeisbach => {
            darcy_weisbach(d, roughness, options.viscosity, options.base_speed)
        }
    };
    if !(r.is_finite() && r > 0.0) {
        return Err(BuildError::InvalidInput(format!(
            "{} resistance evaluated to {}",
            link, r
        )));
    }
    Ok(r)
}

/// Signed head loss `L·r·q|q|^(α-1)`; `lr` is the length-scaled resistance.
pub fn head_loss(q: f64, lr: f64, alpha: f64) -> f64 {
    lr * q.signum() * q.abs().powf(alpha)
}

/// Inverse of [`head_loss`]: the flow implied by head difference `dh`.
pub fn flow_from_head(dh: f64, lr: f64, alpha: f64) -> f64 {
    if dh == 0.0 {
        return 0.0;
    }
    dh.signum() * (dh.abs() / lr).powf(1.0 / alpha)
}
