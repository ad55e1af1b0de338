//! # Side-car index
//!
//! The index maps every record of a data file to its stream position, and
//! optionally to its location. It is produced by one sequential scan
//! ([`IndexBuilder`]), cached next to the data file ([`persist`]) and finalized
//! on every load: duplicated identifiers are disambiguated
//! ([`DuplicateMap`]) and records sharing a locus are flagged as multiallelic.

mod builder;
mod duplicates;
mod multiallelic;
pub mod persist;
mod table;

pub use builder::IndexBuilder;
pub use duplicates::DuplicateMap;
pub use persist::{has_index, index_path, read_index, write_index};
pub use table::{
    Column, ColumnSpec, IndexEntry, IndexTable, Locus, RawIndex, MULTIALLELIC_COLUMN, SEEK_COLUMN,
};

pub(crate) use duplicates::is_alias_of;

use std::path::Path;

use crate::error::Result;
use crate::stream::ByteStream;

/// Scans a data stream, computes multiallelic flags and writes the side-car of `path`
///
/// Returns the raw index (identifiers not yet disambiguated).
pub fn generate_index<P, S>(path: P, stream: &mut S, spec: &ColumnSpec) -> Result<RawIndex>
where
    P: AsRef<Path>,
    S: ByteStream + ?Sized,
{
    let mut index = IndexBuilder::new(spec)?.build(stream)?;
    index.group_multiallelic();
    write_index(index_path(path)?, &index)?;
    Ok(index)
}
