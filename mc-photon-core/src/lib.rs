//! Monte Carlo simulation of optical photon transport through a layered,
//! optionally ultrasound-modulated turbid medium.
//!
//! A [`config::ScenarioConfig`] loaded from TOML describes the medium's
//! layer stack, embedded absorbers, detectors, and any bound acoustic
//! field maps; [`driver::Driver`] turns that description into a
//! [`medium::Medium`] and runs the hop/drop/spin/roulette photon walker
//! (see [`photon`]) to completion across one or more acoustic time
//! indices, writing exit records and fluence totals.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use mc_photon_core::config::ScenarioConfig;
//! use mc_photon_core::driver::Driver;
//!
//! let config = ScenarioConfig::load(Path::new("scenario.toml"))?;
//! let driver = Driver::new(config)?;
//! driver.run()?;
//! # Ok::<(), mc_photon_core::error::McError>(())
//! ```

pub mod absorber;
pub mod config;
pub mod detector;
pub mod driver;
pub mod error;
pub mod field;
pub mod geometry;
pub mod layer;
pub mod logger;
pub mod medium;
pub mod photon;
pub mod rng;

pub mod prelude {
    pub use crate::config::ScenarioConfig;
    pub use crate::driver::Driver;
    pub use crate::error::{McError, Result};
    pub use crate::geometry::Vec3;
    pub use crate::medium::Medium;
}
