//! Binary snapshot of an [`ArrayModel`].
//!
//! Layout (big-endian):
//! `magic:i32 version:i32 order:i32 fingerprint:i32 unknown:f32 populated:i32`
//! `first_order_count:i32 [letter:u16 count:i64 log_prob:f64]*`
//! `array_len:i32 [log_prob:f32]*`

use super::array::{array_length, ArrayModel};
use super::{LanguageModel, NGramNode};
use crate::consts::{CACHE_MAGIC, CACHE_VERSION};
use crate::error::{CfResult, CipherForgeError};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn to_i32(value: usize, what: &str) -> CfResult<i32> {
    i32::try_from(value).map_err(|_| {
        CipherForgeError::Config(format!("{} ({}) does not fit the cache format", what, value))
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `model` to `path`. The data lands in `<path>.tmp` first and is then
/// renamed over the target so readers never see a half-written file.
pub fn write<P: AsRef<Path>>(path: P, model: &ArrayModel, fingerprint: usize) -> CfResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_sibling(path);
    let written = write_snapshot(&temp_path, model, fingerprint)
        .and_then(|()| fs::rename(&temp_path, path).map_err(CipherForgeError::from));
    if let Err(e) = written {
        // Best effort, keep the first error
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    info!("💾 Wrote model cache to {:?}", path);
    Ok(())
}

fn write_snapshot(temp_path: &Path, model: &ArrayModel, fingerprint: usize) -> CfResult<()> {
    let mut out = BufWriter::new(File::create(temp_path)?);
    out.write_all(&CACHE_MAGIC.to_be_bytes())?;
    out.write_all(&CACHE_VERSION.to_be_bytes())?;
    out.write_all(&to_i32(model.order(), "order")?.to_be_bytes())?;
    out.write_all(&to_i32(fingerprint, "max n-grams to keep")?.to_be_bytes())?;
    out.write_all(&model.unknown_probability().to_be_bytes())?;
    out.write_all(&to_i32(model.populated_count(), "populated count")?.to_be_bytes())?;

    let first_order = model.first_order_nodes();
    out.write_all(&to_i32(first_order.len(), "first-order count")?.to_be_bytes())?;
    for node in first_order {
        let letter = node.letter().unwrap_or(0) as u16;
        out.write_all(&letter.to_be_bytes())?;
        out.write_all(&(node.count as i64).to_be_bytes())?;
        out.write_all(&node.log_probability.to_be_bytes())?;
    }

    let table = model.log_probabilities();
    out.write_all(&to_i32(table.len(), "array length")?.to_be_bytes())?;
    for value in table {
        out.write_all(&value.to_be_bytes())?;
    }

    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

/// Reads a cache written by [`write`]. Any mismatch or a missing/truncated
/// file is a cache miss (`Ok(None)`); only unexpected I/O failures are errors.
pub fn read_if_valid<P: AsRef<Path>>(
    path: P,
    expected_order: usize,
    expected_fingerprint: usize,
) -> CfResult<Option<ArrayModel>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("Model cache {:?} not found", path);
        return Ok(None);
    }

    let mut reader = CacheReader::new(BufReader::new(File::open(path)?));
    match reader.read_model(expected_order, expected_fingerprint) {
        Ok(model) => Ok(model),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            debug!("Model cache {:?} is truncated", path);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

struct CacheReader<R: Read> {
    inner: R,
}

impl<R: Read> CacheReader<R> {
    fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_i32(&mut self) -> io::Result<i32> {
        self.read_array().map(i32::from_be_bytes)
    }

    fn read_u16(&mut self) -> io::Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    fn read_i64(&mut self) -> io::Result<i64> {
        self.read_array().map(i64::from_be_bytes)
    }

    fn read_f32(&mut self) -> io::Result<f32> {
        self.read_array().map(f32::from_be_bytes)
    }

    fn read_f64(&mut self) -> io::Result<f64> {
        self.read_array().map(f64::from_be_bytes)
    }

    fn read_model(
        &mut self,
        expected_order: usize,
        expected_fingerprint: usize,
    ) -> io::Result<Option<ArrayModel>> {
        if self.read_i32()? != CACHE_MAGIC {
            debug!("Model cache has a foreign signature");
            return Ok(None);
        }
        if self.read_i32()? != CACHE_VERSION {
            debug!("Model cache version differs");
            return Ok(None);
        }

        let order = self.read_i32()?;
        let fingerprint = self.read_i32()?;
        let unknown_probability = self.read_f32()?;
        let populated = self.read_i32()?;

        if usize::try_from(order).ok() != Some(expected_order)
            || usize::try_from(fingerprint).ok() != Some(expected_fingerprint)
        {
            debug!(
                "Model cache built for order {} / fingerprint {}, wanted {} / {}",
                order, fingerprint, expected_order, expected_fingerprint
            );
            return Ok(None);
        }

        let first_order_count = self.read_i32()?.max(0) as usize;
        let mut first_order_nodes = Vec::with_capacity(first_order_count.min(256));
        for _ in 0..first_order_count {
            let letter = self.read_u16()?;
            let count = self.read_i64()?;
            let log_probability = self.read_f64()?;
            let letter = char::from_u32(letter as u32).unwrap_or('?');
            first_order_nodes.push(NGramNode::new(
                letter.to_string(),
                count.max(0) as u64,
                log_probability,
            ));
        }

        let array_len = self.read_i32()?;
        if usize::try_from(array_len).ok() != Some(array_length(expected_order)) {
            debug!("Model cache array length {} is wrong", array_len);
            return Ok(None);
        }

        let mut log_probabilities = Vec::with_capacity(array_len as usize);
        for _ in 0..array_len {
            log_probabilities.push(self.read_f32()?);
        }

        Ok(ArrayModel::from_parts(
            expected_order,
            unknown_probability,
            first_order_nodes,
            log_probabilities,
            populated.max(0) as usize,
        )
        .ok())
    }
}
