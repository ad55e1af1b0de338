use std::collections::HashMap;

use log::info;

use super::duplicates::{resolve_duplicates, DuplicateMap};
use super::multiallelic::{group_multiallelic, locus_map};
use crate::core::Chromosome;
use crate::error::{IndexError, Result};

/// Name of the column holding the position of each record in the data stream
pub const SEEK_COLUMN: &str = "seek";

/// Name of the column holding the multiallelic flag
pub const MULTIALLELIC_COLUMN: &str = "multiallelic";

/// A column extracted from the data file into the index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    Chrom,
    Name,
    Pos,
}
impl Column {
    /// The column name used in the persisted index
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Chrom => "chrom",
            Self::Name => "name",
            Self::Pos => "pos",
        }
    }
}

/// Which fields of a data line are indexed, and how fields are separated
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    columns: Vec<(usize, Column)>,
    separator: u8,
}
impl Default for ColumnSpec {
    /// The IMPUTE2 layout: `<chrom> <name> <pos> ...` separated by spaces
    fn default() -> Self {
        Self::new(b' ')
            .column(0, Column::Chrom)
            .column(1, Column::Name)
            .column(2, Column::Pos)
    }
}
impl ColumnSpec {
    /// Creates an empty column layout for the given separator
    #[must_use]
    pub fn new(separator: u8) -> Self {
        Self {
            columns: Vec::new(),
            separator,
        }
    }

    /// Indexes the zero-based field `position` as `column`
    #[must_use]
    pub fn column(mut self, position: usize, column: Column) -> Self {
        self.columns.retain(|(_, c)| *c != column);
        self.columns.push((position, column));
        self
    }

    #[must_use]
    pub fn separator(&self) -> u8 {
        self.separator
    }

    /// Returns the (position, column) pairs
    #[must_use]
    pub fn columns(&self) -> &[(usize, Column)] {
        &self.columns
    }

    /// Returns the zero-based field position of a column, if it is indexed
    #[must_use]
    pub fn position_of(&self, column: Column) -> Option<usize> {
        self.columns
            .iter()
            .find_map(|(pos, c)| (*c == column).then_some(*pos))
    }

    /// Checks if both location columns are indexed
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.position_of(Column::Chrom).is_some() && self.position_of(Column::Pos).is_some()
    }

    /// Names of the columns a persisted index must provide
    #[must_use]
    pub fn required_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.columns.iter().map(|(_, c)| c.name()).collect();
        names.push(SEEK_COLUMN);
        names
    }

    /// Checks the layout can produce a usable index
    pub fn validate(&self) -> Result<()> {
        if self.position_of(Column::Name).is_none() {
            return Err(IndexError::MissingNameColumn.into());
        }
        if self.position_of(Column::Chrom).is_some() != self.position_of(Column::Pos).is_some() {
            return Err(IndexError::PartialLocation.into());
        }
        Ok(())
    }
}

/// A genomic location
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locus {
    pub chrom: Chromosome,
    pub pos: u64,
}
impl Locus {
    #[must_use]
    pub fn new(chrom: Chromosome, pos: u64) -> Self {
        Self { chrom, pos }
    }
}

/// One row of the index: one record of the data file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Identifier (unique once duplicates are resolved)
    pub name: String,
    /// Location, when the index has location columns
    pub locus: Option<Locus>,
    /// Stream position of the first byte of the record
    pub seek: u64,
    /// Whether another record shares this record's locus
    pub multiallelic: bool,
}

/// Index rows as produced by a scan or read from a side-car, before identifiers are
/// disambiguated
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawIndex {
    pub entries: Vec<IndexEntry>,
    /// Both chromosome and position are present on every entry
    pub has_location: bool,
    /// The multiallelic flags have already been computed
    pub has_multiallelic: bool,
}
impl RawIndex {
    /// Computes the multiallelic flags, if the index has location columns
    pub fn group_multiallelic(&mut self) {
        if self.has_location {
            group_multiallelic(&mut self.entries);
            self.has_multiallelic = true;
        }
    }
}

/// The in-memory index of a data file
///
/// Rows are stored in file order. Lookups by identifier go through a hash map,
/// lookups by locus through a map of loci to rows.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexTable {
    entries: Vec<IndexEntry>,
    has_location: bool,
    by_name: HashMap<String, usize>,
    by_locus: HashMap<Locus, Vec<usize>>,
    duplicates: DuplicateMap,
}
impl IndexTable {
    /// Finalizes a raw index: validates offsets, groups multiallelic sites and
    /// disambiguates duplicated identifiers
    pub fn from_raw(raw: RawIndex) -> Result<Self> {
        let RawIndex {
            mut entries,
            has_location,
            has_multiallelic,
        } = raw;

        for (row, pair) in entries.windows(2).enumerate() {
            if pair[1].seek <= pair[0].seek {
                return Err(IndexError::NonIncreasingOffset(row + 1, pair[1].seek).into());
            }
        }

        let by_locus = if has_location {
            if !has_multiallelic {
                group_multiallelic(&mut entries);
            }
            locus_map(&entries)
        } else {
            HashMap::new()
        };

        let duplicates = resolve_duplicates(&mut entries);

        let mut by_name = HashMap::with_capacity(entries.len());
        for (row, entry) in entries.iter().enumerate() {
            if by_name.insert(entry.name.clone(), row).is_some() {
                return Err(IndexError::UnresolvedDuplicate(entry.name.clone()).into());
            }
        }

        info!(
            "Index ready: {} records, {} duplicated identifiers",
            entries.len(),
            duplicates.len()
        );
        Ok(Self {
            entries,
            has_location,
            by_name,
            by_locus,
            duplicates,
        })
    }

    /// Returns the number of records in the index
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn has_location(&self) -> bool {
        self.has_location
    }

    /// Looks up a record by its (disambiguated) identifier
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.by_name.get(name).map(|&row| &self.entries[row])
    }

    /// Returns all records at a locus, in file order
    pub fn at_locus(&self, locus: Locus) -> impl Iterator<Item = &IndexEntry> {
        self.by_locus
            .get(&locus)
            .into_iter()
            .flatten()
            .map(|&row| &self.entries[row])
    }

    /// Returns the records on `chrom` with `start <= pos <= end`, in file order
    pub fn in_region(
        &self,
        chrom: Chromosome,
        start: u64,
        end: u64,
    ) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter().filter(move |entry| {
            entry
                .locus
                .is_some_and(|l| l.chrom == chrom && start <= l.pos && l.pos <= end)
        })
    }

    /// The mapping of duplicated identifiers to their aliases
    #[must_use]
    pub fn duplicates(&self) -> &DuplicateMap {
        &self.duplicates
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn entry(name: &str, chrom: u8, pos: u64, seek: u64) -> IndexEntry {
        IndexEntry {
            name: name.to_string(),
            locus: Some(Locus::new(Chromosome::from_code(chrom).unwrap(), pos)),
            seek,
            multiallelic: false,
        }
    }

    pub(crate) fn raw(entries: Vec<IndexEntry>) -> RawIndex {
        RawIndex {
            entries,
            has_location: true,
            has_multiallelic: false,
        }
    }

    // ==================== ColumnSpec Tests ====================

    #[test]
    fn test_default_spec() {
        let spec = ColumnSpec::default();
        assert_eq!(spec.separator(), b' ');
        assert_eq!(spec.position_of(Column::Name), Some(1));
        assert!(spec.has_location());
        assert_eq!(spec.required_names(), ["chrom", "name", "pos", "seek"]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_spec_requires_name() {
        let spec = ColumnSpec::new(b' ').column(0, Column::Chrom).column(2, Column::Pos);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_spec_requires_full_location() {
        let spec = ColumnSpec::new(b' ').column(1, Column::Name).column(2, Column::Pos);
        assert!(matches!(
            spec.validate(),
            Err(crate::Error::IndexError(IndexError::PartialLocation))
        ));
    }

    #[test]
    fn test_spec_column_replaces_previous() {
        let spec = ColumnSpec::default().column(4, Column::Name);
        assert_eq!(spec.position_of(Column::Name), Some(4));
        assert_eq!(spec.columns().len(), 3);
    }

    // ==================== IndexTable Tests ====================

    #[test]
    fn test_table_lookup() {
        let table = IndexTable::from_raw(raw(vec![
            entry("rs1", 1, 100, 0),
            entry("rs2", 1, 200, 30),
            entry("rs3", 2, 150, 60),
        ]))
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("rs2").unwrap().seek, 30);
        assert!(table.get("rs4").is_none());
        assert!(table.duplicates().is_empty());
    }

    #[test]
    fn test_table_region_is_inclusive_and_ordered() {
        let table = IndexTable::from_raw(raw(vec![
            entry("a", 1, 99, 0),
            entry("b", 1, 100, 10),
            entry("c", 2, 150, 20),
            entry("d", 1, 150, 30),
            entry("e", 1, 200, 40),
            entry("f", 1, 201, 50),
        ]))
        .unwrap();
        let chrom = Chromosome::autosome(1).unwrap();
        let names: Vec<_> = table
            .in_region(chrom, 100, 200)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["b", "d", "e"]);
    }

    #[test]
    fn test_table_at_locus() {
        let table = IndexTable::from_raw(raw(vec![
            entry("a", 1, 12345, 0),
            entry("b", 1, 12345, 10),
            entry("c", 1, 500, 20),
        ]))
        .unwrap();
        let locus = Locus::new(Chromosome::autosome(1).unwrap(), 12345);
        let names: Vec<_> = table.at_locus(locus).map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        let missing = Locus::new(Chromosome::autosome(2).unwrap(), 12345);
        assert_eq!(table.at_locus(missing).count(), 0);
    }

    #[test]
    fn test_table_rejects_non_increasing_offsets() {
        let result = IndexTable::from_raw(raw(vec![entry("a", 1, 1, 10), entry("b", 1, 2, 10)]));
        assert!(matches!(
            result,
            Err(crate::Error::IndexError(IndexError::NonIncreasingOffset(1, 10)))
        ));
    }

    #[test]
    fn test_table_rejects_alias_collision() {
        let result = IndexTable::from_raw(raw(vec![
            entry("rs1", 1, 1, 0),
            entry("rs1", 1, 2, 10),
            entry("rs1:dup1", 1, 3, 20),
        ]));
        assert!(matches!(
            result,
            Err(crate::Error::IndexError(IndexError::UnresolvedDuplicate(_)))
        ));
    }

    #[test]
    fn test_table_without_location() {
        let mut entries = vec![entry("a", 1, 1, 0), entry("b", 1, 1, 10)];
        for e in &mut entries {
            e.locus = None;
        }
        let table = IndexTable::from_raw(RawIndex {
            entries,
            has_location: false,
            has_multiallelic: false,
        })
        .unwrap();
        assert!(!table.has_location());
        assert!(table.entries().iter().all(|e| !e.multiallelic));
        assert_eq!(
            table.in_region(Chromosome::autosome(1).unwrap(), 0, 10).count(),
            0
        );
    }
}
