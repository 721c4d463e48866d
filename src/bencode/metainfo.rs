use crate::bencode::decoder::{decode, DecodeError, Value};
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Upper bound for a .torrent file read from disk
const MAX_METAINFO_SIZE: u64 = 16 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetainfoError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field: {0}")]
    InvalidField(&'static str),
}

/// Total payload size declared by a metainfo document.
///
/// Single-file torrents carry `info.length`; multi-file torrents carry
/// `info.files[].length`, which are summed.
pub fn declared_length(data: &[u8]) -> Result<u64, MetainfoError> {
    let root = decode(data)?;
    let info = root.get("info").ok_or(MetainfoError::MissingField("info"))?;

    if info.as_dict().is_none() {
        return Err(MetainfoError::InvalidField("info"));
    }

    if let Some(length) = info.get("length") {
        return non_negative(length, "length");
    }

    let files = info
        .get("files")
        .ok_or(MetainfoError::MissingField("length or files"))?
        .as_list()
        .ok_or(MetainfoError::InvalidField("files"))?;

    files.iter().try_fold(0u64, |total, file| {
        let length = file
            .get("length")
            .ok_or(MetainfoError::MissingField("files.length"))?;
        Ok(total.saturating_add(non_negative(length, "files.length")?))
    })
}

fn non_negative(value: &Value<'_>, field: &'static str) -> Result<u64, MetainfoError> {
    value
        .as_integer()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or(MetainfoError::InvalidField(field))
}

/// Read a .torrent file and return its declared payload size.
///
/// Only regular files are read, and never more than `MAX_METAINFO_SIZE`
/// bytes, so a FIFO or device path fails instead of blocking the caller.
pub fn read_declared_length(path: &Path) -> Result<u64> {
    let data = read_capped(path, MAX_METAINFO_SIZE)?;
    declared_length(&data).context("Failed to parse metainfo")
}

fn read_capped(path: &Path, limit: u64) -> Result<Vec<u8>> {
    let metadata = std::fs::metadata(path)
        .context(format!("Failed to stat metainfo file: {}", path.display()))?;

    if !metadata.is_file() {
        bail!("Not a regular file: {}", path.display());
    }

    if metadata.len() > limit {
        bail!(
            "Metainfo file too large: {} bytes (max {})",
            metadata.len(),
            limit
        );
    }

    let file = File::open(path)
        .context(format!("Failed to open metainfo file: {}", path.display()))?;

    // The file may grow between stat and read
    let mut data = Vec::with_capacity(metadata.len() as usize);
    file.take(limit + 1)
        .read_to_end(&mut data)
        .context(format!("Failed to read metainfo file: {}", path.display()))?;

    if data.len() as u64 > limit {
        bail!("Metainfo file too large: more than {} bytes", limit);
    }

    Ok(data)
}
