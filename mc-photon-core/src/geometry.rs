//! Cartesian positions, unit direction cosines, and dielectric (Fresnel)
//! interface math.
//!
//! Positions and directions both use [`glam::DVec3`] as their storage; the
//! distinction the data model draws between the two (a direction carries
//! the invariant `dx^2 + dy^2 + dz^2 = 1`) is enforced at the call sites
//! that produce directions (initial trajectory, spin, boundary reflection)
//! rather than by a separate wrapper type.

use glam::DVec3;

/// A cartesian point or direction. Re-exported so callers never need to
/// depend on `glam` directly.
pub type Vec3 = DVec3;

/// `true` if `d` is unit-length within the tolerance the data model pins
/// for direction cosines (1e-9 on the squared norm).
pub fn is_unit_direction(d: Vec3) -> bool {
    (d.length_squared() - 1.0).abs() < 1e-9
}

/// The three coordinate axes of the medium box, in the tie-break order
/// boundary crossing uses (x before y before z).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn component(self, v: Vec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    #[inline]
    pub fn flip(self, d: Vec3) -> Vec3 {
        match self {
            Axis::X => Vec3::new(-d.x, d.y, d.z),
            Axis::Y => Vec3::new(d.x, -d.y, d.z),
            Axis::Z => Vec3::new(d.x, d.y, -d.z),
        }
    }
}

/// Fresnel reflectance at a dielectric interface.
///
/// `cos_theta_i` is the (non-negative) cosine of the angle of incidence
/// measured from the interface normal; `n1` is the refractive index of the
/// medium the ray is leaving, `n2` the one it is entering.
///
/// Total internal reflection is returned as `R = 1.0` both when Snell's
/// law has no real solution and, per the numerical-degeneracy rule, when
/// `cos_theta_i` lands exactly on +/-1 with `n1 > n2` at the critical
/// angle.
pub fn fresnel_reflectance(cos_theta_i: f64, n1: f64, n2: f64) -> f64 {
    let cos_theta_i = cos_theta_i.clamp(-1.0, 1.0).abs();

    // Perpendicular incidence (cos theta_i == 1): the general formula is a
    // 0/0 indeterminate form. Per the numerical-degeneracy rule this is
    // never TIR (the critical angle is always > 0), so fall back to the
    // normal-incidence specular fraction directly.
    if (cos_theta_i - 1.0).abs() < 1e-12 {
        return specular_reflectance_fraction(n1, n2);
    }

    let theta_i = cos_theta_i.acos();
    let sin_theta_i = theta_i.sin();

    if n2 < n1 {
        let critical = (n2 / n1).asin();
        if theta_i > critical {
            return 1.0;
        }
    }

    let sin_theta_t = (n1 / n2 * sin_theta_i).clamp(-1.0, 1.0);
    let theta_t = sin_theta_t.asin();

    let sin_sum = (theta_i + theta_t).sin();
    let sin_diff = (theta_i - theta_t).sin();
    let tan_sum = (theta_i + theta_t).tan();
    let tan_diff = (theta_i - theta_t).tan();

    0.5 * ((sin_diff * sin_diff) / (sin_sum * sin_sum) + (tan_diff * tan_diff) / (tan_sum * tan_sum))
}

/// The normal-incidence specular reflectance `((n1-n2)/(n1+n2))^2`.
///
/// Used both as the `theta -> 0` limit of [`fresnel_reflectance`] and
/// directly by the walker when a photon enters the medium at the surface.
pub fn specular_reflectance_fraction(n1: f64, n2: f64) -> f64 {
    let r = (n1 - n2) / (n1 + n2);
    r * r
}

/// Reduce `w` by the normal-incidence specular loss at an `n1 -> n2`
/// interface, returning the new weight.
pub fn apply_specular_loss(w: f64, n1: f64, n2: f64) -> f64 {
    w - specular_reflectance_fraction(n1, n2) * w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresnel_symmetry_at_normal_incidence() {
        let n1 = 1.0;
        let n2 = 1.33;
        let r = fresnel_reflectance(1.0, n1, n2);
        let expected = specular_reflectance_fraction(n1, n2);
        assert!((r - expected).abs() < 1e-9, "got {r}, expected {expected}");
    }

    #[test]
    fn matched_indices_give_zero_reflectance() {
        let r = fresnel_reflectance(0.6, 1.4, 1.4);
        assert!(r.abs() < 1e-12);
    }

    #[test]
    fn total_internal_reflection_past_critical_angle() {
        let n1: f64 = 1.33;
        let n2: f64 = 1.0;
        let critical = (n2 / n1).asin();
        let cos_theta_i = (critical + 0.1).cos();
        let r = fresnel_reflectance(cos_theta_i, n1, n2);
        assert_eq!(r, 1.0);
    }

    #[test]
    fn axis_flip_is_involution() {
        let d = Vec3::new(0.3, 0.4, (1.0 - 0.09 - 0.16_f64).sqrt());
        let flipped_twice = Axis::Z.flip(Axis::Z.flip(d));
        assert!((flipped_twice - d).length() < 1e-12);
    }

    #[test]
    fn unit_direction_check() {
        assert!(is_unit_direction(Vec3::new(1.0, 0.0, 0.0)));
        assert!(!is_unit_direction(Vec3::new(1.0, 1.0, 0.0)));
    }
}
