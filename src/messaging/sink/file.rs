use super::OutputSink;
use crate::messaging::error::SinkError;
use crate::messaging::format::Formatter;
use crate::messaging::message::Delivery;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// When and how far the output file rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before a write would push the file past this size (0 = never).
    pub max_bytes: u64,
    /// Rotated files kept as `<path>.1` .. `<path>.N`; 0 discards on rotation.
    pub max_files: u32,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_files: 5,
        }
    }
}

/// Appends rendered messages to a file, rotating by size.
pub struct RotatingFileSink {
    formatter: Formatter,
    path: PathBuf,
    policy: RotationPolicy,
    file: File,
    size: u64,
}

impl RotatingFileSink {
    pub fn open(
        path: impl Into<PathBuf>,
        formatter: Formatter,
        policy: RotationPolicy,
    ) -> Result<Self, SinkError> {
        let path = path.into();
        let file = open_append(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            formatter,
            path,
            policy,
            file,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.policy.max_files == 0 {
            fs::remove_file(&self.path)?;
        } else {
            let oldest = rotated_path(&self.path, self.policy.max_files);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for idx in (1..self.policy.max_files).rev() {
                let from = rotated_path(&self.path, idx);
                if from.exists() {
                    fs::rename(&from, rotated_path(&self.path, idx + 1))?;
                }
            }
            fs::rename(&self.path, rotated_path(&self.path, 1))?;
        }
        self.file = open_append(&self.path)?;
        self.size = 0;
        tracing::debug!(path = %self.path.display(), "rotated output file");
        Ok(())
    }
}

impl OutputSink for RotatingFileSink {
    fn emit(&mut self, delivery: &Delivery) -> Result<(), SinkError> {
        let record = self.formatter.render(delivery)?;
        let len = record.len() as u64;
        if self.policy.max_bytes > 0 && self.size > 0 && self.size + len > self.policy.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(&record)?;
        self.file.flush()?;
        self.size += len;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.file.sync_data()?;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `<path>.<idx>`
pub(crate) fn rotated_path(path: &Path, idx: u32) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{idx}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::format::OutputFormat;
    use tempfile::tempdir;

    fn raw() -> Formatter {
        Formatter::new(OutputFormat::Raw)
    }

    #[test]
    fn appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        fs::write(&path, "old\n").unwrap();

        let mut sink = RotatingFileSink::open(&path, raw(), RotationPolicy::default()).unwrap();
        sink.emit(&Delivery::new(1, "q", "new")).unwrap();
        sink.finish().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn rotates_when_size_exceeded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        let policy = RotationPolicy {
            max_bytes: 8,
            max_files: 2,
        };
        let mut sink = RotatingFileSink::open(&path, raw(), policy).unwrap();

        // Each record is 5 bytes, so every second write rotates.
        for (tag, body) in ["aaaa", "bbbb", "cccc", "dddd"].iter().enumerate() {
            sink.emit(&Delivery::new(tag as u64 + 1, "q", *body)).unwrap();
        }
        sink.finish().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "dddd\n");
        assert_eq!(fs::read_to_string(rotated_path(&path, 1)).unwrap(), "cccc\n");
        assert_eq!(fs::read_to_string(rotated_path(&path, 2)).unwrap(), "bbbb\n");
        assert!(!rotated_path(&path, 3).exists());
    }

    #[test]
    fn oversized_record_written_to_fresh_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        let policy = RotationPolicy {
            max_bytes: 4,
            max_files: 1,
        };
        let mut sink = RotatingFileSink::open(&path, raw(), policy).unwrap();
        sink.emit(&Delivery::new(1, "q", "0123456789")).unwrap();
        sink.emit(&Delivery::new(2, "q", "x")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "x\n");
        assert_eq!(
            fs::read_to_string(rotated_path(&path, 1)).unwrap(),
            "0123456789\n"
        );
    }

    #[test]
    fn zero_max_files_discards_on_rotation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        let policy = RotationPolicy {
            max_bytes: 3,
            max_files: 0,
        };
        let mut sink = RotatingFileSink::open(&path, raw(), policy).unwrap();
        sink.emit(&Delivery::new(1, "q", "ab")).unwrap();
        sink.emit(&Delivery::new(2, "q", "cd")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "cd\n");
        assert!(!rotated_path(&path, 1).exists());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.log");
        assert!(matches!(
            RotatingFileSink::open(&path, raw(), RotationPolicy::default()),
            Err(SinkError::Io(_))
        ));
    }
}
