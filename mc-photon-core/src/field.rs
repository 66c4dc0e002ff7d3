//! Time-sampled acoustic field maps: pressure and displacement grids that
//! the walker samples at a photon's current position to get the local
//! ultrasound perturbation.
//!
//! A map is a fixed-size regular cartesian grid, one frame per acoustic
//! time index. Frames are loaded on demand from ASCII files, one sample
//! per line, x fastest-varying, then y, then z.

use crate::error::{McError, Result};
use crate::geometry::Vec3;
use std::fs;
use std::path::Path;

/// Grid geometry shared by pressure and displacement maps: origin, per-axis
/// spacing, and per-axis sample counts.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub origin: Vec3,
    pub spacing: Vec3,
    pub counts: (usize, usize, usize),
}

impl GridSpec {
    pub fn sample_count(&self) -> usize {
        self.counts.0 * self.counts.1 * self.counts.2
    }

    /// Floor-and-clamp the cartesian point to its nearest grid index.
    fn index_of(&self, p: Vec3) -> (usize, usize, usize) {
        let rel = p - self.origin;
        let ix = (rel.x / self.spacing.x).floor();
        let iy = (rel.y / self.spacing.y).floor();
        let iz = (rel.z / self.spacing.z).floor();
        let clamp = |v: f64, max: usize| -> usize {
            if v < 0.0 {
                0
            } else if v as usize >= max {
                max - 1
            } else {
                v as usize
            }
        };
        (
            clamp(ix, self.counts.0),
            clamp(iy, self.counts.1),
            clamp(iz, self.counts.2),
        )
    }

    #[inline]
    fn flat_index(&self, idx: (usize, usize, usize)) -> usize {
        idx.0 + self.counts.0 * (idx.1 + self.counts.1 * idx.2)
    }
}

/// One loaded frame of scalar acoustic pressure, x-fastest-order.
pub struct PressureMap {
    spec: GridSpec,
    samples: Vec<f64>,
}

impl PressureMap {
    pub fn empty(spec: GridSpec) -> Self {
        let n = spec.sample_count();
        Self {
            spec,
            samples: vec![0.0; n],
        }
    }

    /// Load frame `time_index` from `{path_prefix}{time_index}.txt`.
    pub fn load_frame(&mut self, path_prefix: &Path, time_index: usize) -> Result<()> {
        let path = frame_path(path_prefix, time_index);
        self.samples = read_ascii_frame(&path, self.spec.sample_count())?;
        Ok(())
    }

    /// Sample the nearest grid value to `(x, y, z)`.
    pub fn sample_cart(&self, x: f64, y: f64, z: f64) -> f64 {
        let idx = self.spec.index_of(Vec3::new(x, y, z));
        self.samples[self.spec.flat_index(idx)]
    }
}

/// One loaded frame of vector acoustic displacement, x-fastest-order.
pub struct DisplacementMap {
    spec: GridSpec,
    samples: Vec<Vec3>,
}

impl DisplacementMap {
    pub fn empty(spec: GridSpec) -> Self {
        let n = spec.sample_count();
        Self {
            spec,
            samples: vec![Vec3::ZERO; n],
        }
    }

    pub fn load_frame(&mut self, path_prefix: &Path, time_index: usize) -> Result<()> {
        let path = frame_path(path_prefix, time_index);
        let flat = read_ascii_frame(&path, self.spec.sample_count() * 3)?;
        self.samples = flat
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        Ok(())
    }

    pub fn sample_cart(&self, x: f64, y: f64, z: f64) -> Vec3 {
        let idx = self.spec.index_of(Vec3::new(x, y, z));
        self.samples[self.spec.flat_index(idx)]
    }
}

fn frame_path(prefix: &Path, time_index: usize) -> std::path::PathBuf {
    let mut s = prefix.as_os_str().to_owned();
    s.push(time_index.to_string());
    s.push(".txt");
    std::path::PathBuf::from(s)
}

fn read_ascii_frame(path: &Path, expected: usize) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path).map_err(|e| McError::io(path, e))?;
    let values: Vec<f64> = text
        .split_whitespace()
        .map(|tok| tok.parse::<f64>().unwrap_or(0.0))
        .collect();
    if values.len() != expected {
        return Err(McError::FrameShapeMismatch {
            path: path.to_path_buf(),
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn spec() -> GridSpec {
        GridSpec {
            origin: Vec3::ZERO,
            spacing: Vec3::new(1.0, 1.0, 1.0),
            counts: (2, 2, 2),
        }
    }

    #[test]
    fn index_clamps_outside_grid() {
        let s = spec();
        assert_eq!(s.index_of(Vec3::new(-5.0, -5.0, -5.0)), (0, 0, 0));
        assert_eq!(s.index_of(Vec3::new(50.0, 50.0, 50.0)), (1, 1, 1));
    }

    #[test]
    fn pressure_frame_round_trip() {
        let dir = std::env::temp_dir().join("mc_photon_field_test");
        let _ = fs::create_dir_all(&dir);
        let prefix = dir.join("pressure_");
        let path = frame_path(&prefix, 3);
        let mut f = fs::File::create(&path).unwrap();
        for v in 0..8 {
            writeln!(f, "{}", v as f64).unwrap();
        }
        let mut map = PressureMap::empty(spec());
        map.load_frame(&prefix, 3).unwrap();
        assert_eq!(map.sample_cart(0.0, 0.0, 0.0), 0.0);
        assert_eq!(map.sample_cart(1.4, 1.4, 1.4), 7.0);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn frame_shape_mismatch_is_reported() {
        let dir = std::env::temp_dir().join("mc_photon_field_test2");
        let _ = fs::create_dir_all(&dir);
        let prefix = dir.join("bad_");
        let path = frame_path(&prefix, 0);
        fs::write(&path, "1.0 2.0 3.0").unwrap();
        let mut map = PressureMap::empty(spec());
        let err = map.load_frame(&prefix, 0).unwrap_err();
        assert!(matches!(err, McError::FrameShapeMismatch { .. }));
        fs::remove_file(&path).unwrap();
    }
}
