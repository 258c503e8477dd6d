//! Seek-then-write sink over a single output file.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// The run's output file. Opened once before scheduling, closed once at the
/// end; dropping it on an error path closes the handle as well.
#[derive(Debug)]
pub struct OutputSink {
    file: File,
    path: PathBuf,
    bytes_written: u64,
}

impl OutputSink {
    /// Create (or truncate) the output file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        tracing::debug!(path = %path.display(), "output file opened");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            bytes_written: 0,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_file(file: File, path: &Path) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
            bytes_written: 0,
        }
    }

    /// Reserve `size` bytes. On Unix tries `posix_fallocate` for real block
    /// allocation; falls back to `set_len`.
    pub fn preallocate(&mut self, size: u64) -> io::Result<()> {
        #[cfg(unix)]
        {
            let fd = self.file.as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        self.file.set_len(size)
    }

    /// Write `data` at absolute `offset`. Returns the number of bytes written,
    /// which is always `data.len()` on success.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> io::Result<u64> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        let n = data.len() as u64;
        self.bytes_written += n;
        Ok(n)
    }

    /// Total bytes written through this sink.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush file data to disk.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Flush and close the file. Consumes the sink so it cannot be closed twice.
    pub fn close(mut self) -> io::Result<()> {
        self.file.flush()?;
        tracing::debug!(
            path = %self.path.display(),
            bytes = self.bytes_written,
            "output file closed"
        );
        Ok(())
    }
}
