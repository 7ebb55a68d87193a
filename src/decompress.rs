use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const TEMP_PREFIX: &str = "tmp.pardiff.";

/// A file ready to hand to the comparator: either the original path or a
/// decompressed temporary copy that is removed when this value is dropped.
#[derive(Debug)]
pub struct Materialized {
    original: PathBuf,
    temp: Option<NamedTempFile>,
}

impl Materialized {
    pub fn path(&self) -> &Path {
        match self.temp {
            Some(ref t) => t.path(),
            None => &self.original,
        }
    }
}

pub fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Returns a decompressed copy of `path` when `enabled` and the name ends in
/// `.gz`, otherwise the path itself.
pub fn materialize(path: &Path, enabled: bool) -> io::Result<Materialized> {
    let temp = if enabled && is_compressed(path) {
        debug!("decompressing: {}", path.display());
        Some(gunzip_to_temp(path)?)
    } else {
        None
    };
    Ok(Materialized {
        original: path.to_path_buf(),
        temp,
    })
}

fn gunzip_to_temp(path: &Path) -> io::Result<NamedTempFile> {
    let mut out = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile()?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
    io::copy(&mut decoder, out.as_file_mut())?;
    out.as_file_mut().flush()?;
    Ok(out)
}
