use log::info;
use memchr::memchr_iter;

use super::{Column, ColumnSpec, IndexEntry, Locus, RawIndex};
use crate::core::Chromosome;
use crate::error::{ReadError, Result};
use crate::stream::ByteStream;

/// Builds an index with a single sequential scan of a data stream
///
/// The stream position immediately preceding each record is stored as its
/// seek offset, so the first record is at offset 0. Blank lines are skipped.
pub struct IndexBuilder<'a> {
    spec: &'a ColumnSpec,
    /// Highest field position to extract
    max_field: usize,
    /// Reusable line buffer
    line: Vec<u8>,
    /// Reusable field boundaries
    fields: Vec<(usize, usize)>,
}
impl<'a> IndexBuilder<'a> {
    pub fn new(spec: &'a ColumnSpec) -> Result<Self> {
        spec.validate()?;
        let max_field = spec.columns().iter().map(|(pos, _)| *pos).max().unwrap_or(0);
        Ok(Self {
            spec,
            max_field,
            line: Vec::new(),
            fields: Vec::with_capacity(max_field + 1),
        })
    }

    /// Scans the whole stream from its start
    pub fn build<S: ByteStream + ?Sized>(mut self, stream: &mut S) -> Result<RawIndex> {
        stream.seek_to(0)?;
        let has_location = self.spec.has_location();

        let mut entries = Vec::new();
        let mut line_number = 0;
        loop {
            let seek = stream.position()?;
            self.line.clear();
            if stream.read_until(b'\n', &mut self.line)? == 0 {
                break;
            }
            line_number += 1;
            trim_newline(&mut self.line);
            if self.line.is_empty() {
                continue;
            }
            entries.push(self.parse_entry(line_number, seek, has_location)?);
        }

        info!("Indexed {} records", entries.len());
        Ok(RawIndex {
            entries,
            has_location,
            has_multiallelic: false,
        })
    }

    fn parse_entry(&mut self, line_number: usize, seek: u64, has_location: bool) -> Result<IndexEntry> {
        self.split_fields();

        let mut name = None;
        let mut chrom = None;
        let mut pos = None;
        for &(position, column) in self.spec.columns() {
            let Some(&(start, end)) = self.fields.get(position) else {
                return Err(ReadError::malformed(
                    line_number,
                    format!("missing field {position} ({})", column.name()),
                )
                .into());
            };
            let field = std::str::from_utf8(&self.line[start..end])?;
            match column {
                Column::Name => name = Some(field.to_string()),
                Column::Chrom => chrom = Some(field.parse::<Chromosome>()?),
                Column::Pos => {
                    let value = field.parse::<u64>().map_err(|_| {
                        ReadError::malformed(line_number, format!("invalid position: {field}"))
                    })?;
                    pos = Some(value);
                }
            }
        }

        let locus = match (chrom, pos) {
            (Some(chrom), Some(pos)) if has_location => Some(Locus::new(chrom, pos)),
            _ => None,
        };
        Ok(IndexEntry {
            // validated to contain a name column
            name: name.unwrap_or_default(),
            locus,
            seek,
            multiallelic: false,
        })
    }

    /// Records the boundaries of the fields up to `max_field`
    fn split_fields(&mut self) {
        self.fields.clear();
        let mut start = 0;
        for sep in memchr_iter(self.spec.separator(), &self.line) {
            self.fields.push((start, sep));
            if self.fields.len() > self.max_field {
                return;
            }
            start = sep + 1;
        }
        self.fields.push((start, self.line.len()));
    }
}

fn trim_newline(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}
