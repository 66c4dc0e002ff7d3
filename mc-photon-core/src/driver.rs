//! The batch simulation driver: for each acoustic time index, binds field
//! frames to the medium, spawns one OS thread per walker, joins them, and
//! writes the exit-record and fluence outputs for that index.

use crate::config::ScenarioConfig;
use crate::error::{McError, Result};
use crate::logger::Logger;
use crate::medium::{Medium, MAX_BINS};
use crate::photon::{CycleOutcome, Photon};
use crate::rng::TauswortheRng;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info_span;

pub struct Driver {
    medium: Medium,
    max_photons: u64,
    num_threads: usize,
    time_start: usize,
    time_end: usize,
    seed_base: Option<u32>,
    output_dir: PathBuf,
    debug: bool,
    pressure_prefix: Option<PathBuf>,
    displacement_prefix: Option<PathBuf>,
}

impl Driver {
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        let pressure_prefix = config
            .fields
            .as_ref()
            .and_then(|f| f.pressure_prefix.clone())
            .map(PathBuf::from);
        let displacement_prefix = config
            .fields
            .as_ref()
            .and_then(|f| f.displacement_prefix.clone())
            .map(PathBuf::from);
        let medium = config.build_medium()?;
        Ok(Self {
            medium,
            max_photons: config.driver.max_photons,
            num_threads: config.driver.num_threads,
            time_start: config.driver.time_start,
            time_end: config.driver.time_end,
            seed_base: config.driver.seed_base,
            output_dir: config.driver.output_dir,
            debug: config.driver.debug,
            pressure_prefix,
            displacement_prefix,
        })
    }

    pub fn medium(&self) -> &Medium {
        &self.medium
    }

    /// Run every acoustic time index in `[time_start, time_end]` to
    /// completion.
    pub fn run(&self) -> Result<()> {
        for t in self.time_start..=self.time_end {
            self.run_time_index(t)?;
        }
        Ok(())
    }

    /// Run a single acoustic time index: bind frames, spawn walkers, join,
    /// write outputs.
    pub fn run_time_index(&self, t: usize) -> Result<()> {
        let span = info_span!("time_index", t);
        let _enter = span.enter();

        self.medium.bind_field_frames(
            self.pressure_prefix.as_deref(),
            self.displacement_prefix.as_deref(),
            t,
        )?;

        let logger = Logger::open(&self.output_dir, t, self.debug)?;
        let photons_per_thread = self.max_photons / self.num_threads as u64;

        let exit_counts: Vec<usize> = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.num_threads);
            for thread_index in 0..self.num_threads {
                let seed = self.thread_seed(thread_index, t);
                let medium = &self.medium;
                let logger = &logger;
                handles.push(scope.spawn(move || {
                    run_walker(medium, logger, seed, photons_per_thread)
                }));
            }
            handles.into_iter().map(|h| h.join().expect("walker thread panicked")).collect()
        });

        if self.debug {
            for (index, absorber) in self.medium.layers().iter().flat_map(|l| l.absorbers.iter()).enumerate() {
                logger.log_absorber(index, absorber.total_deposited())?;
            }
        }
        logger.close()?;
        tracing::info!(
            exit_records = exit_counts.iter().sum::<usize>(),
            photons = self.max_photons,
            "time index complete"
        );

        self.write_fluence_dump(t)?;
        Ok(())
    }

    fn thread_seed(&self, thread_index: usize, time_index: usize) -> u64 {
        match self.seed_base {
            Some(base) => (base as u64) + 4 * thread_index as u64,
            None => {
                let coarse = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos() as u64)
                    .unwrap_or(0);
                coarse ^ (thread_index as u64) ^ ((time_index as u64) << 32)
            }
        }
    }

    fn write_fluence_dump(&self, t: usize) -> Result<()> {
        let mu_a_top = self.medium.layer(0).mu_a;
        let dr = self.medium.fluence.bin_width();
        let n_photons = self.max_photons as f64;
        let snapshot = self.medium.fluence.snapshot();

        let path = self.output_dir.join(format!("fluences-{t}.txt"));
        let mut out = String::new();
        for (ir, &c) in snapshot.iter().enumerate() {
            let r_center = (ir as f64 + 0.5) * dr;
            let planar_fluence = if n_photons > 0.0 && dr > 0.0 && mu_a_top > 0.0 {
                c / (n_photons * dr * mu_a_top)
            } else {
                0.0
            };
            out.push_str(&format!("{r_center:.5} {planar_fluence:.3e}\n"));
        }
        std::fs::write(&path, out).map_err(|e| McError::io(&path, e))
    }
}

fn run_walker(medium: &Medium, logger: &Logger, seed: u64, cycles: u64) -> usize {
    let mut rng = TauswortheRng::from_seed(seed);
    let mut shadow = [0.0; MAX_BINS + 1];
    let mut exit_count = 0;

    let source = crate::geometry::Vec3::new(medium.x_bound / 2.0, medium.y_bound / 2.0, 1e-5);
    let mut photon = Photon::inject(source, medium, &mut rng);

    for cycle in 0..cycles {
        if cycle > 0 {
            photon.reset(medium, &mut rng);
        }
        let outcome = photon.run_cycle(medium, &mut rng, &mut shadow, |p, _w| {
            let _ = logger.log_path_point(p);
        });
        if let CycleOutcome::Exited(record) = outcome {
            let _ = logger.log_exit(&record);
            exit_count += 1;
        }
    }

    medium.fluence.merge(&shadow);
    exit_count
}
