use std::io::Write;
use std::path::Path;

/// Destination for the patched script.
pub trait Writer {
    fn write(&self, bytes: &[u8], path: &Path) -> std::io::Result<()>;
}

/// Writes through a temporary file in the destination directory.
///
/// Either the full content lands at `path` or the previous file (if any) is
/// left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicFileWriter;

impl Writer for AtomicFileWriter {
    fn write(&self, bytes: &[u8], path: &Path) -> std::io::Result<()> {
        atomic_write(path, bytes)
    }
}

/// Atomic file write: tempfile + fsync + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // A bare file name has an empty parent
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file path", path.display()),
            ))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
