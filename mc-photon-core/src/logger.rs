//! Three append-only, mutex-guarded output sinks: exit records, optional
//! per-photon path traces, and optional per-absorber debug dumps. Each
//! sink owns its own mutex; sinks never share one, so a write to one never
//! blocks a write to another.

use crate::error::{McError, Result};
use crate::geometry::Vec3;
use crate::photon::ExitRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct Sink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl Sink {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| McError::io(path, e))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut w = self.writer.lock().expect("sink mutex poisoned");
        writeln!(w, "{line}").map_err(|e| McError::io(&self.path, e))
    }

    fn flush(&self) -> Result<()> {
        let mut w = self.writer.lock().expect("sink mutex poisoned");
        w.flush().map_err(|e| McError::io(&self.path, e))
    }
}

/// The process-wide logger for one acoustic time index's run. Opened by the
/// Driver before spawning walkers, flushed and dropped when the time index
/// completes.
pub struct Logger {
    exit_aperture: Sink,
    photon_paths: Option<Sink>,
    absorbers: Option<Sink>,
}

impl Logger {
    /// Open the mandatory exit-aperture sink for time index `t` under
    /// `output_dir`, plus the two debug sinks if `debug` is set.
    pub fn open(output_dir: &Path, time_index: usize, debug: bool) -> Result<Self> {
        std::fs::create_dir_all(output_dir).map_err(|e| McError::io(output_dir, e))?;
        let exit_aperture = Sink::create(&output_dir.join(format!("exit-aperture-{time_index}.txt")))?;
        let photon_paths = if debug {
            Some(Sink::create(&output_dir.join(format!("photon-paths-{time_index}.txt")))?)
        } else {
            None
        };
        let absorbers = if debug {
            Some(Sink::create(&output_dir.join(format!("absorbers-{time_index}.txt")))?)
        } else {
            None
        };
        Ok(Self {
            exit_aperture,
            photon_paths,
            absorbers,
        })
    }

    /// Record one exit event: `weight dx dy dz path_length x y z`, fixed
    /// to 9 decimal digits.
    pub fn log_exit(&self, record: &ExitRecord) -> Result<()> {
        self.exit_aperture.write_line(&format!(
            "{:.9} {:.9} {:.9} {:.9} {:.9} {:.9} {:.9} {:.9}",
            record.weight,
            record.direction.x,
            record.direction.y,
            record.direction.z,
            record.path_length,
            record.position.x,
            record.position.y,
            record.position.z,
        ))
    }

    /// Append one `(x y z)` point to a photon's trajectory trace, if debug
    /// path logging is enabled.
    pub fn log_path_point(&self, p: Vec3) -> Result<()> {
        if let Some(sink) = &self.photon_paths {
            sink.write_line(&format!("{:.9} {:.9} {:.9}", p.x, p.y, p.z))?;
        }
        Ok(())
    }

    /// Append one absorber's final deposited-energy total, if debug
    /// absorber logging is enabled.
    pub fn log_absorber(&self, index: usize, deposited: f64) -> Result<()> {
        if let Some(sink) = &self.absorbers {
            sink.write_line(&format!("{index} {deposited:.9}"))?;
        }
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.exit_aperture.flush()?;
        if let Some(sink) = &self.photon_paths {
            sink.flush()?;
        }
        if let Some(sink) = &self.absorbers {
            sink.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_record_round_trips_through_file() {
        let dir = std::env::temp_dir().join("mc_photon_logger_test");
        let logger = Logger::open(&dir, 0, false).unwrap();
        let record = ExitRecord {
            weight: 0.123456789,
            direction: Vec3::new(0.0, 0.0, 1.0),
            path_length: 1.5,
            position: Vec3::new(1.0, 1.0, 2.0),
        };
        logger.log_exit(&record).unwrap();
        logger.close().unwrap();
        let contents = std::fs::read_to_string(dir.join("exit-aperture-0.txt")).unwrap();
        assert!(contents.starts_with("0.123456789"));
    }

    #[test]
    fn debug_sinks_are_absent_without_debug_flag() {
        let dir = std::env::temp_dir().join("mc_photon_logger_test2");
        let logger = Logger::open(&dir, 0, false).unwrap();
        assert!(logger.log_path_point(Vec3::ZERO).is_ok());
        assert!(!dir.join("photon-paths-0.txt").exists());
    }
}
