//! Side-car index persistence
//!
//! The index of `data.impute2` lives next to it in `data.impute2.idx`:
//!
//! ```text
//! ┌──────────────────────┐
//! │ "GENOSEEK INDEX FILE"│ fixed header
//! ├──────────────────────┤
//! │   ZSTD-compressed    │ CSV table: chrom,name,pos,seek,multiallelic
//! │      CSV table       │
//! └──────────────────────┘
//! ```
//!
//! Chromosomes are stored as integer codes and identifiers as they appear in the
//! data file, before duplicates are disambiguated. There is no versioning: a
//! side-car that does not match the expected header or columns is rebuilt.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use zstd::stream::{copy_decode, copy_encode};

use super::{Column, ColumnSpec, IndexEntry, Locus, RawIndex, MULTIALLELIC_COLUMN, SEEK_COLUMN};
use crate::core::Chromosome;
use crate::error::{IndexError, Result};
use crate::{DEFAULT_COMPRESSION_LEVEL, INDEX_MAGIC, INDEX_SUFFIX};

/// Returns the side-car index path of a data file
///
/// The path is derived from the absolute path of the data file with
/// [`INDEX_SUFFIX`] appended.
pub fn index_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let mut name = OsString::from(std::path::absolute(path)?);
    name.push(INDEX_SUFFIX);
    Ok(PathBuf::from(name))
}

/// Checks if the side-car index of a data file exists
pub fn has_index<P: AsRef<Path>>(path: P) -> bool {
    index_path(path).is_ok_and(|idx| idx.is_file())
}

/// Writes an index to `idx_path`
///
/// The index is first written to a temporary sibling and then renamed, so a
/// partially written index is never left at `idx_path`.
pub fn write_index<P: AsRef<Path>>(idx_path: P, index: &RawIndex) -> Result<()> {
    let idx_path = idx_path.as_ref();
    let payload = encode_payload(index)?;

    let mut tmp_name = OsString::from(idx_path);
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    {
        let mut handle = fs::File::create(&tmp_path)?;
        handle.write_all(INDEX_MAGIC)?;
        handle.write_all(&payload)?;
        handle.sync_all()?;
    }
    fs::rename(&tmp_path, idx_path)?;

    info!("Wrote index of {} records to {}", index.entries.len(), idx_path.display());
    Ok(())
}

/// Reads the index at `idx_path`, checking it provides every column of `spec`
pub fn read_index<P: AsRef<Path>>(idx_path: P, spec: &ColumnSpec) -> Result<RawIndex> {
    let idx_path = idx_path.as_ref();
    let bytes = fs::read(idx_path)?;
    let index = decode(&bytes, idx_path, spec)?;
    info!("Loaded index of {} records from {}", index.entries.len(), idx_path.display());
    Ok(index)
}

/// Serializes the index as a compressed CSV table
fn encode_payload(index: &RawIndex) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if index.has_location {
        writer.write_record([
            Column::Chrom.name(),
            Column::Name.name(),
            Column::Pos.name(),
            SEEK_COLUMN,
            MULTIALLELIC_COLUMN,
        ])?;
    } else {
        writer.write_record([Column::Name.name(), SEEK_COLUMN])?;
    }

    for entry in &index.entries {
        let seek = entry.seek.to_string();
        match entry.locus {
            Some(locus) if index.has_location => {
                let chrom = locus.chrom.code().to_string();
                let pos = locus.pos.to_string();
                let multiallelic = if entry.multiallelic { "true" } else { "false" };
                writer.write_record([
                    chrom.as_str(),
                    entry.name.as_str(),
                    pos.as_str(),
                    seek.as_str(),
                    multiallelic,
                ])?;
            }
            _ => writer.write_record([entry.name.as_str(), seek.as_str()])?,
        }
    }
    let table = writer.into_inner().map_err(|e| e.into_error())?;

    let mut encoded = Vec::default();
    copy_encode(table.as_slice(), &mut encoded, DEFAULT_COMPRESSION_LEVEL)?;
    Ok(encoded)
}

/// Validates the header of a side-car and parses its payload
pub(crate) fn decode(bytes: &[u8], path: &Path, spec: &ColumnSpec) -> Result<RawIndex> {
    let Some(payload) = bytes.strip_prefix(INDEX_MAGIC) else {
        return Err(IndexError::InvalidHeader(path.to_path_buf()).into());
    };
    let corrupt = |reason: String| IndexError::CorruptPayload {
        path: path.to_path_buf(),
        reason,
    };

    let mut table = Vec::default();
    copy_decode(payload, &mut table).map_err(|e| corrupt(e.to_string()))?;

    let mut reader = csv::Reader::from_reader(table.as_slice());
    let headers = reader.headers().map_err(|e| corrupt(e.to_string()))?.clone();
    let find = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = spec
        .required_names()
        .into_iter()
        .filter(|name| find(name).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(IndexError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        }
        .into());
    }

    // checked above: every layout includes name and seek
    let (Some(name_col), Some(seek_col)) = (find(Column::Name.name()), find(SEEK_COLUMN)) else {
        return Err(corrupt("missing name or seek column".into()).into());
    };
    let location_cols = find(Column::Chrom.name()).zip(find(Column::Pos.name()));
    let multiallelic_col = find(MULTIALLELIC_COLUMN).filter(|_| location_cols.is_some());

    let mut entries = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| corrupt(e.to_string()))?;
        let field = |col: usize| {
            record
                .get(col)
                .ok_or_else(|| corrupt(format!("row {row} is missing field {col}")))
        };

        let name = field(name_col)?.to_string();
        let seek = field(seek_col)?
            .parse::<u64>()
            .map_err(|e| corrupt(format!("row {row}: invalid seek ({e})")))?;
        let locus = match location_cols {
            Some((chrom_col, pos_col)) => {
                let chrom = field(chrom_col)?
                    .parse::<Chromosome>()
                    .map_err(|e| corrupt(format!("row {row}: {e}")))?;
                let pos = field(pos_col)?
                    .parse::<u64>()
                    .map_err(|e| corrupt(format!("row {row}: invalid pos ({e})")))?;
                Some(Locus::new(chrom, pos))
            }
            None => None,
        };
        let multiallelic = match multiallelic_col {
            Some(col) => parse_bool(field(col)?)
                .ok_or_else(|| corrupt(format!("row {row}: invalid multiallelic flag")))?,
            None => false,
        };

        entries.push(IndexEntry {
            name,
            locus,
            seek,
            multiallelic,
        });
    }

    Ok(RawIndex {
        entries,
        has_location: location_cols.is_some(),
        has_multiallelic: multiallelic_col.is_some(),
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "1" => Some(true),
        "false" | "False" | "0" => Some(false),
        _ => None,
    }
}
