use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::errors::CoreError;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>, CoreError> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path)
        .map_err(|err| CoreError::FileReadError(format!("{}: {}", path.display(), err)))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Get a writer for a table, gzip-encoding it (and appending `.gz`) on request.
/// Parent directories are created as needed.
///
/// Gzip writers finish their stream on drop; call `flush` before dropping to
/// surface IO errors.
///
/// # Arguments
///
/// - path: path of the plain-text file
/// - compress: whether to gzip the output
///
pub fn get_dynamic_writer(path: &Path, compress: bool) -> Result<Box<dyn Write>, CoreError> {
    let path = if compress {
        let mut gz_path = path.as_os_str().to_owned();
        gz_path.push(".gz");
        PathBuf::from(gz_path)
    } else {
        path.to_path_buf()
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = BufWriter::new(File::create(&path)?);
    Ok(match compress {
        true => Box::new(GzEncoder::new(file, Compression::default())),
        false => Box::new(file),
    })
}

///
/// Create the directory component of an output prefix such as
/// `results/sample1`. A bare prefix has no directory and is left alone.
///
pub fn create_prefix_dir(prefix: &str) -> Result<(), CoreError> {
    if let Some(parent) = Path::new(prefix).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
