//! On-disk scenario description: the TOML document the CLI loads and turns
//! into a [`crate::medium::Medium`] plus the Driver's runtime knobs.

use crate::absorber::Absorber;
use crate::detector::{Detector, Plane};
use crate::error::{McError, Result};
use crate::field::{DisplacementMap, GridSpec, PressureMap};
use crate::geometry::Vec3;
use crate::layer::Layer;
use crate::medium::Medium;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ScenarioConfig {
    pub medium: MediumConfig,
    pub fields: Option<FieldsConfig>,
    pub driver: DriverSection,
}

#[derive(Debug, Deserialize)]
pub struct MediumConfig {
    pub x_bound: f64,
    pub y_bound: f64,
    pub z_bound: f64,
    pub radial_size: f64,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub detectors: Vec<DetectorConfig>,
}

#[derive(Debug, Deserialize)]
pub struct LayerConfig {
    pub depth_start: f64,
    pub depth_end: f64,
    pub mu_a: f64,
    pub mu_s: f64,
    pub g: f64,
    pub n: f64,
    #[serde(default)]
    pub absorbers: Vec<AbsorberConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum AbsorberConfig {
    Sphere {
        center: [f64; 3],
        radius: f64,
        mu_a: f64,
        mu_s: f64,
    },
    Cylinder {
        axis_point: [f64; 3],
        axis_dir: [f64; 3],
        radius: f64,
        half_length: f64,
        mu_a: f64,
        mu_s: f64,
    },
}

#[derive(Debug, Deserialize)]
pub struct DetectorConfig {
    pub plane: String,
    pub z: f64,
    pub center: [f64; 2],
    pub radius: f64,
}

#[derive(Debug, Deserialize)]
pub struct FieldsConfig {
    pub pressure_prefix: Option<String>,
    pub displacement_prefix: Option<String>,
    pub grid_nx: usize,
    pub grid_ny: usize,
    pub grid_nz: usize,
}

#[derive(Debug, Deserialize)]
pub struct DriverSection {
    pub max_photons: u64,
    pub num_threads: usize,
    pub time_start: usize,
    pub time_end: usize,
    pub seed_base: Option<u32>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub debug: bool,
}

impl ScenarioConfig {
    /// Deserialize and validate a scenario document from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| McError::io(path, e))?;
        let config: ScenarioConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.medium.radial_size <= 0.0 {
            return Err(McError::Config("radial_size must be > 0".into()));
        }
        if self.medium.layers.is_empty() {
            return Err(McError::Config("medium must define at least one layer".into()));
        }
        if self.driver.num_threads == 0 {
            return Err(McError::Config("num_threads must be > 0".into()));
        }
        if self.driver.time_start > self.driver.time_end {
            return Err(McError::Config("time_start must be <= time_end".into()));
        }

        let mut sorted = self.medium.layers.iter().collect::<Vec<_>>();
        sorted.sort_by(|a, b| a.depth_start.partial_cmp(&b.depth_start).unwrap());
        let mut expected_start = 0.0;
        for layer in &sorted {
            if layer.depth_start >= layer.depth_end {
                return Err(McError::Config(format!(
                    "layer depth_start {} must be < depth_end {}",
                    layer.depth_start, layer.depth_end
                )));
            }
            if (layer.depth_start - expected_start).abs() > 1e-9 {
                return Err(McError::Config(format!(
                    "layers must partition the z-axis contiguously from 0; gap at {}",
                    layer.depth_start
                )));
            }
            expected_start = layer.depth_end;
        }
        if (expected_start - self.medium.z_bound).abs() > 1e-9 {
            return Err(McError::Config(
                "layers must cover the full z_bound of the medium".into(),
            ));
        }

        for detector in &self.medium.detectors {
            if !matches!(detector.plane.as_str(), "xy" | "xz" | "yz") {
                return Err(McError::Config(format!(
                    "unsupported detector plane {:?}",
                    detector.plane
                )));
            }
        }

        Ok(())
    }

    /// Build the runtime [`Medium`] this configuration describes.
    pub fn build_medium(&self) -> Result<Medium> {
        let mut layers = Vec::with_capacity(self.medium.layers.len());
        for lc in &self.medium.layers {
            let mut layer = Layer::new(lc.depth_start, lc.depth_end, lc.mu_a, lc.mu_s, lc.g, lc.n);
            for ac in &lc.absorbers {
                layer.absorbers.push(match ac {
                    AbsorberConfig::Sphere {
                        center,
                        radius,
                        mu_a,
                        mu_s,
                    } => Absorber::sphere(Vec3::from_array(*center), *radius, *mu_a, *mu_s),
                    AbsorberConfig::Cylinder {
                        axis_point,
                        axis_dir,
                        radius,
                        half_length,
                        mu_a,
                        mu_s,
                    } => Absorber::cylinder(
                        Vec3::from_array(*axis_point),
                        Vec3::from_array(*axis_dir),
                        *radius,
                        *half_length,
                        *mu_a,
                        *mu_s,
                    ),
                });
            }
            layers.push(layer);
        }

        let mut detectors = Vec::with_capacity(self.medium.detectors.len());
        for (id, dc) in self.medium.detectors.iter().enumerate() {
            let plane = match dc.plane.as_str() {
                "xy" => Plane::Xy,
                "xz" => Plane::Xz,
                "yz" => Plane::Yz,
                other => return Err(McError::Config(format!("unsupported detector plane {other:?}"))),
            };
            detectors.push(Detector::new(id, plane, dc.z, (dc.center[0], dc.center[1]), dc.radius));
        }

        let (pressure, displacement) = match &self.fields {
            Some(f) => {
                let spec = GridSpec {
                    origin: Vec3::ZERO,
                    spacing: Vec3::new(
                        self.medium.x_bound / f.grid_nx as f64,
                        self.medium.y_bound / f.grid_ny as f64,
                        self.medium.z_bound / f.grid_nz as f64,
                    ),
                    counts: (f.grid_nx, f.grid_ny, f.grid_nz),
                };
                let pressure = f.pressure_prefix.as_ref().map(|_| PressureMap::empty(spec));
                let displacement = f
                    .displacement_prefix
                    .as_ref()
                    .map(|_| DisplacementMap::empty(spec));
                (pressure, displacement)
            }
            None => (None, None),
        };

        Ok(Medium::new(
            self.medium.x_bound,
            self.medium.y_bound,
            self.medium.z_bound,
            self.medium.radial_size,
            layers,
            detectors,
            pressure,
            displacement,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[medium]
x_bound = 2.0
y_bound = 2.0
z_bound = 2.0
radial_size = 3.0

[[medium.layers]]
depth_start = 0.0
depth_end   = 2.0
mu_a = 0.1
mu_s = 7.3
g    = 0.9
n    = 1.33

[driver]
max_photons  = 10000
num_threads  = 4
time_start   = 0
time_end     = 0
output_dir   = "out"
"#;

    #[test]
    fn valid_scenario_parses_and_validates() {
        let config: ScenarioConfig = toml::from_str(VALID).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn gap_between_layers_is_rejected() {
        let bad = VALID.replace("depth_start = 0.0", "depth_start = 0.5");
        let config: ScenarioConfig = toml::from_str(&bad).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_threads_is_rejected() {
        let bad = VALID.replace("num_threads  = 4", "num_threads  = 0");
        let config: ScenarioConfig = toml::from_str(&bad).unwrap();
        assert!(matches!(config.validate(), Err(McError::Config(_))));
    }

    #[test]
    fn build_medium_from_valid_config() {
        let config: ScenarioConfig = toml::from_str(VALID).unwrap();
        let medium = config.build_medium().unwrap();
        assert_eq!(medium.layer_count(), 1);
    }
}
