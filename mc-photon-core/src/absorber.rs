//! Embedded absorbing objects: localized regions inside a layer with their
//! own optical coefficients and their own per-voxel deposited-energy
//! accumulator.

use crate::geometry::Vec3;
use std::sync::atomic::{AtomicU64, Ordering};

/// One embedded absorber: a sphere or a cylinder, each with its own
/// absorption/scattering coefficients distinct from the surrounding layer.
pub enum Absorber {
    Sphere {
        center: Vec3,
        radius: f64,
        mu_a: f64,
        mu_s: f64,
        deposited: AtomicU64,
    },
    Cylinder {
        /// Point on the cylinder axis, axis direction (unit), radius, and
        /// half-length: the finite extent is `[-half_length, +half_length]`
        /// measured from `axis_point` along `axis_dir`.
        axis_point: Vec3,
        axis_dir: Vec3,
        radius: f64,
        half_length: f64,
        mu_a: f64,
        mu_s: f64,
        deposited: AtomicU64,
    },
}

impl Absorber {
    pub fn sphere(center: Vec3, radius: f64, mu_a: f64, mu_s: f64) -> Self {
        Absorber::Sphere {
            center,
            radius,
            mu_a,
            mu_s,
            deposited: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    pub fn cylinder(
        axis_point: Vec3,
        axis_dir: Vec3,
        radius: f64,
        half_length: f64,
        mu_a: f64,
        mu_s: f64,
    ) -> Self {
        Absorber::Cylinder {
            axis_point,
            axis_dir: axis_dir.normalize(),
            radius,
            half_length,
            mu_a,
            mu_s,
            deposited: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// `true` if `p` falls within the absorber's volume: inside the
    /// sphere's radius, or inside the cylinder's radius and within its
    /// finite half-length along the axis (both bounds closed).
    pub fn contains(&self, p: Vec3) -> bool {
        match self {
            Absorber::Sphere { center, radius, .. } => (p - *center).length() <= *radius,
            Absorber::Cylinder {
                axis_point,
                axis_dir,
                radius,
                half_length,
                ..
            } => {
                let rel = p - *axis_point;
                let along = rel.dot(*axis_dir);
                if along.abs() > *half_length {
                    return false;
                }
                let perp = rel - *axis_dir * along;
                perp.length() <= *radius
            }
        }
    }

    /// The absorber's own `(mu_a, mu_s)`, overriding the layer's values for
    /// any photon inside it.
    pub fn coefficients(&self) -> (f64, f64) {
        match self {
            Absorber::Sphere { mu_a, mu_s, .. } => (*mu_a, *mu_s),
            Absorber::Cylinder { mu_a, mu_s, .. } => (*mu_a, *mu_s),
        }
    }

    /// Atomically add `amount` to the absorber's deposited-energy total via
    /// a compare-and-swap loop on the bit pattern (there is no native
    /// atomic f64 in `std`).
    pub fn deposit(&self, amount: f64) {
        let cell = match self {
            Absorber::Sphere { deposited, .. } => deposited,
            Absorber::Cylinder { deposited, .. } => deposited,
        };
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let new = f64::from_bits(current) + amount;
            match cell.compare_exchange_weak(
                current,
                new.to_bits(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn total_deposited(&self) -> f64 {
        let cell = match self {
            Absorber::Sphere { deposited, .. } => deposited,
            Absorber::Cylinder { deposited, .. } => deposited,
        };
        f64::from_bits(cell.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sphere_contains_points_within_radius() {
        let a = Absorber::sphere(Vec3::new(0.0, 0.0, 0.0), 1.0, 1.0, 1.0);
        assert!(a.contains(Vec3::new(0.5, 0.0, 0.0)));
        assert!(!a.contains(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn cylinder_contains_points_within_radius_and_half_length() {
        let a = Absorber::cylinder(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            0.5,
            1.0,
            1.0,
            1.0,
        );
        assert!(a.contains(Vec3::new(0.2, 0.2, 0.9)));
        assert!(!a.contains(Vec3::new(1.0, 1.0, 0.0)), "outside the radius");
        assert!(
            !a.contains(Vec3::new(0.2, 0.2, 100.0)),
            "beyond the finite half-length"
        );
    }

    #[test]
    fn concurrent_deposits_accumulate_without_loss() {
        let absorber = Arc::new(Absorber::sphere(Vec3::ZERO, 1.0, 1.0, 1.0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let a = Arc::clone(&absorber);
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    a.deposit(1.0);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(absorber.total_deposited(), 80_000.0);
    }
}
