//! The medium: an ordered stack of layers, optional bound acoustic field
//! maps, detectors, and the shared planar fluence accumulator.

use crate::detector::Detector;
use crate::field::{DisplacementMap, PressureMap};
use crate::geometry::Vec3;
use crate::layer::Layer;
use std::path::Path;
use std::sync::Mutex;

/// Bin count for the planar fluence array; `Cplanar` holds `MAX_BINS + 1`
/// entries, the last being a saturation bin for `r >= radial_size`.
pub const MAX_BINS: usize = 100;

/// A planar fluence accumulator: `MAX_BINS + 1` additive bins over radial
/// distance from the z-axis, guarded by a single mutex for bulk merges.
pub struct PlanarFluence {
    bins: Mutex<[f64; MAX_BINS + 1]>,
    radial_size: f64,
}

impl PlanarFluence {
    pub fn new(radial_size: f64) -> Self {
        Self {
            bins: Mutex::new([0.0; MAX_BINS + 1]),
            radial_size,
        }
    }

    pub fn bin_width(&self) -> f64 {
        self.radial_size / MAX_BINS as f64
    }

    /// The clamped bin index for absolute depth `z`.
    pub fn bin_of(&self, z: f64) -> usize {
        let ir = (z.abs() / self.bin_width()).floor();
        if ir < 0.0 {
            0
        } else if ir as usize > MAX_BINS {
            MAX_BINS
        } else {
            ir as usize
        }
    }

    /// Thread-safe additive accumulation into bin `ir`.
    pub fn accumulate(&self, ir: usize, energy: f64) {
        let mut bins = self.bins.lock().expect("planar fluence mutex poisoned");
        bins[ir.min(MAX_BINS)] += energy;
    }

    /// Merge a per-walker shadow array into the shared bins under one lock
    /// acquisition (the preferred, contention-free strategy).
    pub fn merge(&self, shadow: &[f64; MAX_BINS + 1]) {
        let mut bins = self.bins.lock().expect("planar fluence mutex poisoned");
        for (dst, src) in bins.iter_mut().zip(shadow.iter()) {
            *dst += src;
        }
    }

    pub fn snapshot(&self) -> [f64; MAX_BINS + 1] {
        *self.bins.lock().expect("planar fluence mutex poisoned")
    }
}

/// The full optical medium: layers, optional bound fields, detectors, and
/// the shared fluence accumulator.
pub struct Medium {
    pub x_bound: f64,
    pub y_bound: f64,
    pub z_bound: f64,
    layers: Vec<Layer>,
    detectors: Vec<Detector>,
    pressure: Option<Mutex<PressureMap>>,
    displacement: Option<Mutex<DisplacementMap>>,
    pub fluence: PlanarFluence,
}

impl Medium {
    /// Construct a medium from its layer stack. `layers` is sorted by
    /// `depth_start` so that layer indices run top-to-bottom: this is what
    /// lets `layer_of`/`layer_index_of` resolve a shared-boundary depth to
    /// the upper layer simply by returning the first match, and what lets
    /// the walker's `layer_index +/- 1` neighbor lookup mean "the layer
    /// above/below."
    pub fn new(
        x_bound: f64,
        y_bound: f64,
        z_bound: f64,
        radial_size: f64,
        mut layers: Vec<Layer>,
        detectors: Vec<Detector>,
        pressure: Option<PressureMap>,
        displacement: Option<DisplacementMap>,
    ) -> Self {
        layers.sort_by(|a, b| a.depth_start.partial_cmp(&b.depth_start).unwrap());
        Self {
            x_bound,
            y_bound,
            z_bound,
            layers,
            detectors,
            pressure: pressure.map(Mutex::new),
            displacement: displacement.map(Mutex::new),
            fluence: PlanarFluence::new(radial_size),
        }
    }

    /// The layer containing depth `z`. `contains_depth` is closed at both
    /// ends, so a depth sitting exactly on a shared boundary matches two
    /// layers; iterating in top-to-bottom order and taking the first match
    /// resolves that tie in favor of the upper layer. Panics if `z` falls
    /// outside every layer -- layers are required to partition the z-axis
    /// contiguously, so this indicates a state invariant violation, not a
    /// data error.
    pub fn layer_of(&self, z: f64) -> &Layer {
        self.layers
            .iter()
            .find(|l| l.contains_depth(z))
            .unwrap_or_else(|| panic!("depth {z} is not covered by any layer"))
    }

    /// As [`Self::layer_of`], but returns the index (top-to-bottom order)
    /// rather than the layer itself.
    pub(crate) fn layer_index_of(&self, z: f64) -> usize {
        self.layers
            .iter()
            .position(|l| l.contains_depth(z))
            .unwrap_or_else(|| panic!("depth {z} is not covered by any layer"))
    }

    /// The layer above `current` (toward the source, i.e. smaller depth),
    /// or `None` if `current` is the topmost layer.
    pub fn layer_above<'a>(&'a self, current: &Layer) -> Option<&'a Layer> {
        let idx = self.layer_index_of(current.depth_start);
        idx.checked_sub(1).map(|i| &self.layers[i])
    }

    /// The layer below depth `z`, or `None` if `z` is in the bottommost
    /// layer.
    pub fn layer_below(&self, z: f64) -> Option<&Layer> {
        let idx = self.layer_index_of(z);
        self.layers.get(idx + 1)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The layer at index `idx`, per the sorted-by-depth order layers are
    /// validated into at construction time.
    pub fn layer(&self, idx: usize) -> &Layer {
        &self.layers[idx]
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn bind_field_frames(&self, path_prefix_pressure: Option<&Path>, path_prefix_displacement: Option<&Path>, time_index: usize) -> crate::error::Result<()> {
        if let (Some(mutex), Some(prefix)) = (&self.pressure, path_prefix_pressure) {
            mutex
                .lock()
                .expect("pressure map mutex poisoned")
                .load_frame(prefix, time_index)?;
        }
        if let (Some(mutex), Some(prefix)) = (&self.displacement, path_prefix_displacement) {
            mutex
                .lock()
                .expect("displacement map mutex poisoned")
                .load_frame(prefix, time_index)?;
        }
        Ok(())
    }

    pub fn pressure_at(&self, p: Vec3) -> Option<f64> {
        self.pressure
            .as_ref()
            .map(|m| m.lock().expect("pressure map mutex poisoned").sample_cart(p.x, p.y, p.z))
    }

    pub fn displacement_at(&self, p: Vec3) -> Option<Vec3> {
        self.displacement.as_ref().map(|m| {
            m.lock()
                .expect("displacement map mutex poisoned")
                .sample_cart(p.x, p.y, p.z)
        })
    }

    pub fn has_displacement_field(&self) -> bool {
        self.displacement.is_some()
    }

    pub fn planar_accumulate(&self, ir: usize, energy: f64) {
        self.fluence.accumulate(ir, energy);
    }

    /// Number of detectors crossed by the segment `(p_prev, p_curr)`.
    pub fn detectors_crossed(&self, p_prev: Vec3, p_curr: Vec3) -> usize {
        self.detectors
            .iter()
            .filter(|d| d.crossed_by(p_prev, p_curr))
            .count()
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }
}
