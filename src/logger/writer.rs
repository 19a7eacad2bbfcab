//! Size/time rotating log file used as the file layer's `MakeWriter`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use flate2::Compression;
use flate2::write::GzEncoder;
use jiff::{Timestamp, Zoned};
use tracing_subscriber::fmt::MakeWriter;

use crate::logger::{FileConfig, LoggerError, RotationConfig, RotationPeriod, RotationStrategy};

#[derive(Clone)]
pub struct RotatingFileWriter {
    inner: Arc<Mutex<ActiveFile>>,
}

struct ActiveFile {
    path: PathBuf,
    rotation: RotationConfig,
    file: BufWriter<File>,
    written: u64,
    opened_at: Timestamp,
    sequence: u32,
}

impl RotatingFileWriter {
    pub fn new(config: &FileConfig) -> Result<Self, LoggerError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = open(&config.path, config.append)?;
        let written = if config.append {
            fs::metadata(&config.path).map(|m| m.len()).unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            inner: Arc::new(Mutex::new(ActiveFile {
                path: config.path.clone(),
                rotation: config.rotation,
                file,
                written,
                opened_at: Timestamp::now(),
                sequence: 0,
            })),
        })
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, ActiveFile>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = RotatingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut active = self.lock()?;

        if active.due(Timestamp::now())
            && let Err(e) = active.rotate()
        {
            // Keep logging into the current file; the next write retries.
            eprintln!("log rotation failed for {}: {}", active.path.display(), e);
        }

        match active.file.write(buf) {
            Ok(n) => {
                active.written += n as u64;
                Ok(n)
            }
            Err(_) => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.file.flush()
    }
}

impl ActiveFile {
    fn due(&self, now: Timestamp) -> bool {
        let elapsed = now.as_second() - self.opened_at.as_second();
        match self.rotation.strategy {
            RotationStrategy::Size => self.written >= self.rotation.max_size,
            RotationStrategy::Time(period) => elapsed >= period.as_secs(),
            RotationStrategy::Combined => {
                self.written >= self.rotation.max_size
                    || elapsed >= RotationPeriod::Daily.as_secs()
            }
        }
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.sequence += 1;

        let rotated = rotated_path(&self.path, &Zoned::now(), self.sequence);
        fs::rename(&self.path, &rotated)?;
        if self.rotation.compress {
            gzip(&rotated)?;
        }

        self.file = open(&self.path, false)?;
        self.written = 0;
        self.opened_at = Timestamp::now();

        prune(&self.path, self.rotation.max_files)
    }
}

fn open(path: &Path, append: bool) -> io::Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    Ok(BufWriter::new(file))
}

/// `logs/app.log` becomes `logs/app.20250101_120000.0001.log`.
fn rotated_path(path: &Path, now: &Zoned, sequence: u32) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let stamp = now.strftime("%Y%m%d_%H%M%S");
    let name = match path.extension() {
        Some(ext) => format!("{}.{}.{:04}.{}", stem, stamp, sequence, ext.to_string_lossy()),
        None => format!("{}.{}.{:04}", stem, stamp, sequence),
    };
    path.with_file_name(name)
}

fn gzip(path: &Path) -> io::Result<()> {
    let input = fs::read(path)?;
    let mut target = path.as_os_str().to_owned();
    target.push(".gz");

    let mut encoder = GzEncoder::new(File::create(PathBuf::from(target))?, Compression::default());
    encoder.write_all(&input)?;
    encoder.finish()?;
    fs::remove_file(path)
}

/// Deletes the oldest rotated siblings of `active` beyond `keep`.
///
/// Rotated names embed a timestamp and sequence, so name order is age order.
fn prune(active: &Path, keep: usize) -> io::Result<()> {
    let dir = match active.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    };
    let prefix = format!("{}.", active.file_stem().unwrap_or_default().to_string_lossy());
    let active_name = active.file_name().unwrap_or_default();

    let mut rotated: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| {
            let name = p.file_name().unwrap_or_default();
            name != active_name && name.to_string_lossy().starts_with(&prefix)
        })
        .collect();
    rotated.sort();

    let excess = rotated.len().saturating_sub(keep);
    for old in rotated.into_iter().take(excess) {
        fs::remove_file(old)?;
    }
    Ok(())
}
