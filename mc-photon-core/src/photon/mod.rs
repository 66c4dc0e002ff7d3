//! The photon walker: the hop/drop/spin/roulette state machine that is the
//! core of the simulation.

mod scatter;

use crate::geometry::{self, Axis, Vec3};
use crate::medium::{Medium, MAX_BINS};
use crate::rng::TauswortheRng;

/// One exit event: a photon that transmitted out of the medium through a
/// boundary, possibly registered by a detector.
#[derive(Debug, Clone, Copy)]
pub struct ExitRecord {
    pub weight: f64,
    pub direction: Vec3,
    pub path_length: f64,
    pub position: Vec3,
}

/// Outcome of one injection-to-death cycle.
pub enum CycleOutcome {
    /// The photon transmitted out through a detector-bearing surface.
    Exited(ExitRecord),
    /// The photon was absorbed in full (roulette-killed or fully depleted).
    Absorbed,
}

/// A photon packet's full mutable state for one injection-to-death cycle.
pub struct Photon {
    pub p: Vec3,
    pub d: Vec3,
    pub w: f64,
    pub alive: bool,
    pub tagged: bool,
    step: f64,
    step_remainder: f64,
    layer_index: usize,
    illumination_source: Vec3,
    pub path_length: f64,
    /// The weight discarded at the moment of a roulette kill this cycle
    /// (zero if the photon has not been roulette-killed). Tracked so the
    /// energy-conservation invariant can account for it explicitly.
    pub roulette_loss: f64,
}

const ROULETTE_THRESHOLD: f64 = 0.01;
/// Survival probability applied once a packet's weight drops below
/// [`ROULETTE_THRESHOLD`]; a surviving packet's weight is scaled up by its
/// inverse to keep the ensemble unbiased.
pub const ROULETTE_CHANCE: f64 = 0.1;

impl Photon {
    /// Inject a fresh photon at `source` with a direction sampled from the
    /// documented initial-trajectory formula, and the specular reflectance
    /// between ambient air (n=1) and the entering layer already deducted
    /// from its weight.
    pub fn inject(source: Vec3, medium: &Medium, rng: &mut TauswortheRng) -> Self {
        let layer_index = medium.layer_index_of(source.z);
        let entry_n = medium.layer(layer_index).n;
        Self {
            p: source,
            d: initial_direction(rng),
            w: geometry::apply_specular_loss(1.0, 1.0, entry_n),
            alive: true,
            tagged: false,
            step: 0.0,
            step_remainder: 0.0,
            layer_index,
            illumination_source: source,
            path_length: 0.0,
            roulette_loss: 0.0,
        }
    }

    /// Reset to a fresh INITIAL state at the illumination point, per the
    /// reset-purity invariant: every field but the RNG returns to its
    /// post-injection value.
    pub fn reset(&mut self, medium: &Medium, rng: &mut TauswortheRng) {
        self.layer_index = medium.layer_index_of(self.illumination_source.z);
        let entry_n = medium.layer(self.layer_index).n;
        self.p = self.illumination_source;
        self.d = initial_direction(rng);
        self.w = geometry::apply_specular_loss(1.0, 1.0, entry_n);
        self.alive = true;
        self.tagged = false;
        self.step = 0.0;
        self.step_remainder = 0.0;
        self.path_length = 0.0;
        self.roulette_loss = 0.0;
    }

    /// Number of completed hop/drop/spin iterations so far this cycle.
    pub fn steps(&self) -> f64 {
        self.step
    }

    /// Run one full injection-to-death cycle, accumulating planar fluence
    /// into `shadow` (merged into the Medium's shared array by the caller
    /// once per walker) and absorber deposits directly into the Medium's
    /// absorbers.
    pub fn run_cycle(
        &mut self,
        medium: &Medium,
        rng: &mut TauswortheRng,
        shadow: &mut [f64; MAX_BINS + 1],
        mut on_path_point: impl FnMut(Vec3, f64),
    ) -> CycleOutcome {
        on_path_point(self.p, self.w);
        loop {
            if !self.alive {
                return CycleOutcome::Absorbed;
            }
            if let Some(record) = self.step_once(medium, rng, shadow, &mut on_path_point) {
                return CycleOutcome::Exited(record);
            }
        }
    }

    /// Execute steps 1-7 of one hop/drop/spin/roulette iteration. Returns
    /// `Some(ExitRecord)` if the photon transmitted out through a detected
    /// aperture this iteration; otherwise `None` (the caller loops again,
    /// checking `self.alive`).
    fn step_once(
        &mut self,
        medium: &Medium,
        rng: &mut TauswortheRng,
        shadow: &mut [f64; MAX_BINS + 1],
        on_path_point: &mut impl FnMut(Vec3, f64),
    ) -> Option<ExitRecord> {
        let layer = medium.layer(self.layer_index);
        let (mu_a, mu_s) = layer.coefficients_at(self.p);
        let mu_t = mu_a + mu_s;
        debug_assert!(mu_t > 0.0, "non-positive total attenuation in layer");

        // Step 1: set step size.
        let s = if self.step_remainder == 0.0 {
            rng.exponential_step(mu_t)
        } else {
            let s = self.step_remainder / mu_t;
            self.step_remainder = 0.0;
            s
        };

        if s <= 0.0 {
            // Tie-break: a zero-length step from a point already on a
            // boundary is a no-op; redraw next iteration.
            return None;
        }

        // Step 2: boundary check.
        let p_target = self.p + s * self.d;
        let hit = find_boundary_crossing(self.p, p_target, medium, layer);

        let (p_next, hit_axis) = match hit {
            Some(crossing) => {
                self.step_remainder = (s - crossing.distance) * mu_t;
                (self.p + crossing.distance * self.d, Some(crossing.axis))
            }
            None => (p_target, None),
        };

        let p_prev = self.p;

        // Step 3: propagate.
        self.p = p_next;
        self.step += 1.0;
        self.path_length += self.path_increment(medium, p_prev, p_next);

        // Step 4: absorb (drop) -- skipped for a partial hop that only
        // reached a boundary; that travel is completed (and dropped) on
        // the next full free path once the boundary is resolved.
        if hit_axis.is_none() {
            self.drop(medium, layer, shadow);
        }

        on_path_point(self.p, self.w);

        // Step 5: boundary resolution.
        if let Some(axis) = hit_axis {
            if let Some(record) = self.resolve_boundary(medium, rng, axis, p_prev) {
                return Some(record);
            }
            if !self.alive {
                return None;
            }
            // Either reflected (stay in this layer) or transmitted into a
            // neighboring layer: both return to step 1 next iteration.
            return None;
        }

        // Step 6: scatter (spin).
        let layer = medium.layer(self.layer_index);
        let u = rng.next();
        let u_psi = rng.next();
        let cos_theta = scatter::sample_cos_theta(layer.g, u);
        self.d = scatter::rotate(self.d, cos_theta, u_psi);
        debug_assert!(
            geometry::is_unit_direction(self.d),
            "direction left the unit sphere after spin"
        );

        // Step 7: roulette.
        if self.w < ROULETTE_THRESHOLD {
            let u = rng.next();
            let w_before = self.w;
            let (w, alive) = apply_roulette(self.w, u);
            self.w = w;
            self.alive = alive;
            if !alive {
                self.roulette_loss = w_before;
            }
        }

        None
    }

    fn path_increment(&self, medium: &Medium, p_prev: Vec3, p_next: Vec3) -> f64 {
        let geometric = (p_next - p_prev).length();
        if !medium.has_displacement_field() {
            return geometric;
        }
        let u_prev = medium.displacement_at(p_prev).unwrap_or(Vec3::ZERO);
        let u_next = medium.displacement_at(p_next).unwrap_or(Vec3::ZERO);
        let adjustment = (u_next - u_prev).dot(self.d);
        geometric + adjustment
    }

    fn drop(&mut self, medium: &Medium, layer: &crate::layer::Layer, shadow: &mut [f64; MAX_BINS + 1]) {
        let (mu_a_eff, mu_s_eff) = layer.coefficients_at(self.p);
        let mu_t_eff = mu_a_eff + mu_s_eff;
        let albedo = if mu_t_eff > 0.0 { mu_s_eff / mu_t_eff } else { 0.0 };
        let delta_w = self.w * (1.0 - albedo);
        self.w -= delta_w;

        if let Some(absorber) = layer.lookup_absorber(self.p) {
            absorber.deposit(delta_w);
            self.tagged = true;
        } else {
            let ir = medium.fluence.bin_of(self.p.z);
            shadow[ir.min(MAX_BINS)] += delta_w;
        }
    }

    /// Step 5: Fresnel reflect-or-transmit at the flagged axis. Returns
    /// `Some(ExitRecord)` if the photon transmitted out and a detector
    /// registered the crossing; the caller must still check `self.alive`
    /// afterward (a transmit with no detector hit also kills the photon).
    fn resolve_boundary(
        &mut self,
        medium: &Medium,
        rng: &mut TauswortheRng,
        axis: Axis,
        p_prev: Vec3,
    ) -> Option<ExitRecord> {
        let layer = medium.layer(self.layer_index);
        let n1 = layer.n;
        let neighbor = self.neighbor_layer_index(medium, axis);
        let n2 = neighbor.map(|idx| medium.layer(idx).n).unwrap_or(1.0);

        let cos_theta_i = axis.component(self.d).abs();
        let r = geometry::fresnel_reflectance(cos_theta_i, n1, n2);
        let u = rng.next();

        if r > u {
            // Elastic internal reflection: invert the hit axis component,
            // keep the remaining free path, stay in the current layer.
            self.d = axis.flip(self.d);
            return None;
        }

        match (axis, neighbor) {
            (Axis::Z, Some(idx)) => {
                // Internal layer transition. Per the resolved ambiguity
                // around a mu_t discontinuity at a refractive boundary,
                // the remaining free path is redrawn rather than rescaled.
                self.step_remainder = 0.0;
                self.layer_index = idx;
                None
            }
            _ => {
                let crossed = medium.detectors_crossed(p_prev, self.p) > 0;
                self.alive = false;
                if crossed {
                    Some(ExitRecord {
                        weight: self.w,
                        direction: self.d,
                        path_length: self.path_length,
                        position: self.p,
                    })
                } else {
                    None
                }
            }
        }
    }

    fn neighbor_layer_index(&self, medium: &Medium, axis: Axis) -> Option<usize> {
        if axis != Axis::Z {
            return None;
        }
        let layer = medium.layer(self.layer_index);
        if self.p.z <= layer.depth_start {
            self.layer_index.checked_sub(1)
        } else {
            let below = self.layer_index + 1;
            if below < medium.layer_count() {
                Some(below)
            } else {
                None
            }
        }
    }
}

/// Roulette: a packet below the weight threshold survives with probability
/// [`ROULETTE_CHANCE`], scaled up to conserve ensemble energy, or dies.
fn apply_roulette(w: f64, u: f64) -> (f64, bool) {
    if u <= ROULETTE_CHANCE {
        (w / ROULETTE_CHANCE, true)
    } else {
        (0.0, false)
    }
}

struct Crossing {
    axis: Axis,
    distance: f64,
}

/// Find the nearest axis boundary the segment `p -> p_target` crosses, if
/// any. z is bounded by the current layer's depth range; x and y are
/// bounded by the medium's outer box. Ties prefer x, then y, then z.
fn find_boundary_crossing(
    p: Vec3,
    p_target: Vec3,
    medium: &Medium,
    layer: &crate::layer::Layer,
) -> Option<Crossing> {
    let candidates = [
        axis_crossing(Axis::X, p, p_target, 0.0, medium.x_bound),
        axis_crossing(Axis::Y, p, p_target, 0.0, medium.y_bound),
        axis_crossing(Axis::Z, p, p_target, layer.depth_start, layer.depth_end),
    ];

    candidates
        .into_iter()
        .flatten()
        .min_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

fn axis_crossing(axis: Axis, p: Vec3, p_target: Vec3, lo: f64, hi: f64) -> Option<Crossing> {
    let target = axis.component(p_target);
    if target >= lo && target <= hi {
        return None;
    }
    let start = axis.component(p);
    let delta = target - start;
    if delta.abs() < 1e-15 {
        return None;
    }
    let boundary = if target < lo { lo } else { hi };
    let t = (boundary - start) / delta;
    Some(Crossing {
        axis,
        distance: t * (p_target - p).length(),
    })
}

/// Initial trajectory: an isotropic azimuth with the source's documented
/// `dz = 1` convention (a straight-down pencil beam tilted only by the
/// hemispheric cos/sin sampling).
fn initial_direction(rng: &mut TauswortheRng) -> Vec3 {
    let u = rng.next();
    let u_psi = rng.next();
    let cos_theta = 2.0 * u - 1.0;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let psi = 2.0 * std::f64::consts::PI * u_psi;
    Vec3::new(sin_theta * psi.cos(), sin_theta * psi.sin(), 1.0).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;

    fn single_layer_medium() -> Medium {
        let layers = vec![Layer::new(0.0, 2.0, 0.1, 7.3, 0.9, 1.33)];
        Medium::new(2.0, 2.0, 2.0, 3.0, layers, Vec::new(), None, None)
    }

    #[test]
    fn inject_applies_specular_loss_at_entry() {
        let medium = single_layer_medium();
        let mut rng = TauswortheRng::new(200, 201, 202, 203);
        let photon = Photon::inject(Vec3::new(1.0, 1.0, 1e-5), &medium, &mut rng);
        let expected = geometry::apply_specular_loss(1.0, 1.0, 1.33);
        assert!((photon.w - expected).abs() < 1e-12);
        assert!(photon.alive);
        assert!(geometry::is_unit_direction(photon.d));
    }

    #[test]
    fn reset_restores_initial_state() {
        let medium = single_layer_medium();
        let mut rng = TauswortheRng::new(200, 201, 202, 203);
        let source = Vec3::new(1.0, 1.0, 1e-5);
        let mut photon = Photon::inject(source, &medium, &mut rng);
        let initial_w = photon.w;
        photon.w = 0.2;
        photon.alive = false;
        photon.tagged = true;
        photon.path_length = 5.0;
        photon.reset(&medium, &mut rng);
        assert_eq!(photon.w, initial_w);
        assert!(photon.alive);
        assert!(!photon.tagged);
        assert_eq!(photon.path_length, 0.0);
        assert_eq!(photon.p, source);
    }

    #[test]
    fn zero_scattering_layer_decays_by_beers_law() {
        let layers = vec![Layer::new(0.0, 2.0, 1.0, 0.0, 0.0, 1.0)];
        let medium = Medium::new(2.0, 2.0, 2.0, 3.0, layers, Vec::new(), None, None);
        let mut rng = TauswortheRng::new(200, 201, 202, 203);
        let mut photon = Photon {
            p: Vec3::new(1.0, 1.0, 0.0),
            d: Vec3::new(0.0, 0.0, 1.0),
            w: 1.0,
            alive: true,
            tagged: false,
            step: 0.0,
            step_remainder: 0.0,
            layer_index: 0,
            illumination_source: Vec3::new(1.0, 1.0, 0.0),
            path_length: 0.0,
            roulette_loss: 0.0,
        };
        let mut shadow = [0.0; MAX_BINS + 1];
        let _ = photon.run_cycle(&medium, &mut rng, &mut shadow, |_, _| {});
        let expected_weight = (-1.0_f64 * 2.0).exp();
        assert!(
            (photon.w - expected_weight).abs() < 1e-9,
            "got {}, expected {expected_weight}",
            photon.w
        );
        assert!(!photon.alive);
        assert!((shadow[0] - (1.0 - expected_weight)).abs() < 1e-9);
    }

    #[test]
    fn roulette_survival_scales_weight_by_inverse_chance() {
        let (w, alive) = apply_roulette(0.005, 0.05);
        assert!((w - 0.05).abs() < 1e-12);
        assert!(alive);
    }

    #[test]
    fn roulette_death_above_chance_threshold() {
        let (w, alive) = apply_roulette(0.005, 0.5);
        assert_eq!(w, 0.0);
        assert!(!alive);
    }
}
