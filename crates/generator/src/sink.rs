//! Atomic output files
//!
//! Every artefact is written to `<path>.new` and renamed over `<path>` on
//! commit, so a concurrent reader of the target sees either the previous
//! generation in full or the new generation in full, never a torn file.
//! A sink dropped without commit leaves the target untouched; the stale
//! `.new` file is simply overwritten by the next run.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A single output file in the middle of being generated.
pub struct Sink {
    target: PathBuf,
    staging: PathBuf,
    writer: BufWriter<File>,
}

impl Sink {
    /// Open `<path>.new` for writing, creating parent directories as
    /// needed.
    pub fn create(path: &Path) -> io::Result<Sink> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut staging = path.as_os_str().to_os_string();
        staging.push(".new");
        let staging = PathBuf::from(staging);

        let file = File::create(&staging)?;
        Ok(Sink {
            target: path.to_path_buf(),
            staging,
            writer: BufWriter::new(file),
        })
    }

    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())
    }

    /// Flush, close and atomically rename onto the target, then report the
    /// one-line written status.
    pub fn commit(self) -> io::Result<()> {
        let Sink {
            target,
            staging,
            mut writer,
        } = self;
        writer.flush()?;
        drop(writer);
        fs::rename(&staging, &target)?;
        println!("written {}", target.display());
        Ok(())
    }
}
