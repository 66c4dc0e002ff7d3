//! Henyey-Greenstein scattering: deflection-angle sampling and the
//! spherical rotation that applies it to a direction vector.

use crate::geometry::Vec3;
use std::f64::consts::PI;

/// Sample `cos(theta)` from the Henyey-Greenstein phase function with
/// anisotropy `g` and uniform draw `u`.
pub fn sample_cos_theta(g: f64, u: f64) -> f64 {
    if g == 0.0 {
        2.0 * u - 1.0
    } else {
        let term = (1.0 - g * g) / (1.0 - g + 2.0 * g * u);
        ((1.0 + g * g - term * term) / (2.0 * g)).clamp(-1.0, 1.0)
    }
}

/// Rotate direction `d` by polar deflection `theta` (given as
/// `cos_theta`/`sin_theta`) and azimuth `u_psi` (a uniform draw scaled to
/// `2*pi` inside this function).
pub fn rotate(d: Vec3, cos_theta: f64, u_psi: f64) -> Vec3 {
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let psi = 2.0 * PI * u_psi;
    let cos_psi = psi.cos();
    let sin_psi = psi.sin();

    if d.z.abs() >= 1.0 - 1e-12 {
        let sign = d.z.signum();
        Vec3::new(
            sin_theta * cos_psi,
            sin_theta * sin_psi,
            cos_theta * sign,
        )
    } else {
        let denom = (1.0 - d.z * d.z).sqrt();
        let dx = sin_theta / denom * (d.x * d.z * cos_psi - d.y * sin_psi) + d.x * cos_theta;
        let dy = sin_theta / denom * (d.y * d.z * cos_psi + d.x * sin_psi) + d.y * cos_theta;
        let dz = -sin_theta * cos_psi * denom + d.z * cos_theta;
        Vec3::new(dx, dy, dz).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isotropic_scattering_spans_full_range() {
        assert_eq!(sample_cos_theta(0.0, 0.0), -1.0);
        assert_eq!(sample_cos_theta(0.0, 1.0), 1.0);
    }

    #[test]
    fn zero_deflection_leaves_direction_unchanged() {
        let d = Vec3::new(0.0, 0.0, 1.0);
        let rotated = rotate(d, 1.0, 0.0);
        assert!((rotated - d).length() < 1e-9);
    }

    #[test]
    fn rotation_preserves_unit_length() {
        let d = Vec3::new(0.3, 0.4, (1.0 - 0.09 - 0.16_f64).sqrt());
        let rotated = rotate(d, sample_cos_theta(0.8, 0.37), 0.61);
        assert!((rotated.length() - 1.0).abs() < 1e-9);
    }
}
