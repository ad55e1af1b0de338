//! Indexed IMPUTE2 genotype reader
//!
//! [`Impute2Reader`] composes the side-car index, the seek reader and the
//! dosage decoder into lookups by identifier, by exact variant and by region,
//! plus a full sequential scan.
//!
//! # Example
//!
//! ```rust,no_run
//! use genoseek::{Chromosome, GenotypeReader, ReaderBuilder, Variant};
//!
//! let mut reader = ReaderBuilder::default()
//!     .threshold(0.9)
//!     .build_index(true)
//!     .open("chr1.impute2")?;
//!
//! for record in reader.get_variant_by_name("rs12345")? {
//!     println!("{} {:?}", record.variant.name, record.dosages);
//! }
//!
//! let chrom: Chromosome = "1".parse()?;
//! let variant = Variant::new("", chrom, 12345).with_alleles(["A", "T"]);
//! let matches = reader.get_variant_genotypes(&variant)?;
//! # Ok::<(), genoseek::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::core::{Chromosome, GenotypeRecord, Variant};
use crate::dosage::{DosageDecoder, DEFAULT_PROBABILITY_THRESHOLD};
use crate::error::{Error, ReadError, Result};
use crate::index::{
    generate_index, has_index, index_path, is_alias_of, read_index, ColumnSpec, DuplicateMap,
    IndexEntry, IndexTable, Locus,
};
use crate::seek::{RawRecord, SeekReader};
use crate::stream::{open_stream, ByteStream, Capabilities};

const NOT_INDEXED: &str = "the file is not indexed";
const NO_LOCATION: &str = "the index has no location columns";
const END_OF_FILE: &str = "end of file";

/// Random access to genotypes, shared by every genotype file reader
pub trait GenotypeReader {
    /// Returns the records matching a variant's locus, filtered on its alleles if set
    fn get_variant_genotypes(&mut self, variant: &Variant) -> Result<Vec<GenotypeRecord>>;

    /// Returns the records with this identifier (several if the identifier is duplicated)
    fn get_variant_by_name(&mut self, name: &str) -> Result<Vec<GenotypeRecord>>;

    /// Returns the records on `chrom` with `start <= pos <= end`, in file order
    fn get_variants_in_region(
        &mut self,
        chrom: Chromosome,
        start: u64,
        end: u64,
    ) -> Result<Vec<GenotypeRecord>>;

    /// Returns the number of samples, if the sample list is known
    fn num_samples(&self) -> Option<usize>;

    /// Returns the number of variants, if the file is indexed
    fn num_variants(&self) -> Option<usize>;

    /// Releases the underlying file handle (idempotent)
    fn close(&mut self);
}

/// A builder for configured [`Impute2Reader`] instances
#[derive(Clone, Debug, Default)]
pub struct ReaderBuilder {
    threshold: Option<f64>,
    samples: Option<Vec<String>>,
    columns: Option<ColumnSpec>,
    build_index: bool,
    capabilities: Option<Capabilities>,
    index: Option<Arc<IndexTable>>,
}
impl ReaderBuilder {
    /// Sets the calling threshold (default [`DEFAULT_PROBABILITY_THRESHOLD`])
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Sets the ordered list of sample identifiers
    ///
    /// When set, every decoded record must have exactly one probability triple per sample.
    #[must_use]
    pub fn samples(mut self, samples: Vec<String>) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Sets the indexed columns (default: IMPUTE2 `chrom`, `name`, `pos`)
    #[must_use]
    pub fn columns(mut self, columns: ColumnSpec) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Generates (and persists) the index when the side-car is missing
    #[must_use]
    pub fn build_index(mut self, build_index: bool) -> Self {
        self.build_index = build_index;
        self
    }

    /// Sets the available stream providers (default [`Capabilities::detect`])
    #[must_use]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Uses an already loaded index instead of reading the side-car
    #[must_use]
    pub fn index(mut self, index: Arc<IndexTable>) -> Self {
        self.index = Some(index);
        self
    }

    /// Opens the data file at `path`
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<Impute2Reader> {
        let path = path.as_ref().to_path_buf();
        let decoder = DosageDecoder::new(self.threshold.unwrap_or(DEFAULT_PROBABILITY_THRESHOLD))?;
        let caps = self.capabilities.unwrap_or_default();
        let spec = self.columns.unwrap_or_default();
        spec.validate()?;

        let mut stream = open_stream(&path, caps)?;
        let index = match self.index {
            Some(index) => Some(index),
            None if has_index(&path) => {
                let raw = read_index(index_path(&path)?, &spec)?;
                Some(Arc::new(IndexTable::from_raw(raw)?))
            }
            None if self.build_index => {
                info!("{}: generating index", path.display());
                let raw = generate_index(&path, &mut stream, &spec)?;
                Some(Arc::new(IndexTable::from_raw(raw)?))
            }
            None => {
                info!("{}: no index, random access is unavailable", path.display());
                None
            }
        };

        let num_samples = self.samples.as_ref().map(Vec::len);
        let separator = spec.separator();
        Ok(Impute2Reader {
            path,
            reader: Some(SeekReader::new(stream, separator, num_samples)),
            index,
            decoder,
            samples: self.samples,
            caps,
            separator,
            warned_multiallelic: false,
        })
    }
}

/// Reader of an IMPUTE2 file, with random access through its side-car index
///
/// Each reader owns one file handle and therefore one cursor; readers used in
/// parallel must each have their own handle (see [`Impute2Reader::try_clone_handle`]),
/// and can share the same read-only index.
pub struct Impute2Reader {
    path: PathBuf,
    reader: Option<SeekReader<Box<dyn ByteStream>>>,
    index: Option<Arc<IndexTable>>,
    decoder: DosageDecoder,
    samples: Option<Vec<String>>,
    caps: Capabilities,
    separator: u8,
    /// The "multiallelic detection unavailable" warning was emitted
    warned_multiallelic: bool,
}
impl Impute2Reader {
    /// Opens a file with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        ReaderBuilder::default().open(path)
    }

    /// Opens a new handle on the same file, sharing this reader's index
    pub fn try_clone_handle(&self) -> Result<Self> {
        let num_samples = self.samples.as_ref().map(Vec::len);
        let stream = open_stream(&self.path, self.caps)?;
        Ok(Self {
            path: self.path.clone(),
            reader: Some(SeekReader::new(stream, self.separator, num_samples)),
            index: self.index.clone(),
            decoder: self.decoder,
            samples: self.samples.clone(),
            caps: self.caps,
            separator: self.separator,
            warned_multiallelic: self.warned_multiallelic,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Returns the shared index, if the file is indexed
    #[must_use]
    pub fn index(&self) -> Option<&Arc<IndexTable>> {
        self.index.as_ref()
    }

    /// Returns the duplicated identifiers and their aliases, if the file is indexed
    #[must_use]
    pub fn duplicated_markers(&self) -> Option<&DuplicateMap> {
        self.index.as_deref().map(IndexTable::duplicates)
    }

    /// Returns the sample identifiers, if known
    #[must_use]
    pub fn samples(&self) -> Option<&[String]> {
        self.samples.as_deref()
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.decoder.threshold()
    }

    /// Iterates over every record of the file, in file order
    ///
    /// Works without an index; the multiallelic flag is then always false.
    pub fn iter_genotypes(&mut self) -> Result<Genotypes<'_>> {
        self.seek_reader()?.rewind()?;
        Ok(Genotypes {
            reader: self,
            row: 0,
            done: false,
        })
    }

    /// Iterates over the variants of the index, without decoding genotypes
    pub fn iter_variants(&mut self) -> Result<Variants<'_>> {
        let index = self.require_index("variant iteration")?;
        Ok(Variants {
            reader: self,
            index,
            row: 0,
        })
    }

    fn seek_reader(&mut self) -> Result<&mut SeekReader<Box<dyn ByteStream>>> {
        self.reader.as_mut().ok_or_else(|| ReadError::Closed.into())
    }

    fn require_index(&self, operation: &'static str) -> Result<Arc<IndexTable>> {
        self.index
            .clone()
            .ok_or_else(|| ReadError::unsupported(operation, NOT_INDEXED).into())
    }

    fn require_location(&self, operation: &'static str) -> Result<Arc<IndexTable>> {
        let index = self.require_index(operation)?;
        if !index.has_location() {
            return Err(ReadError::unsupported(operation, NO_LOCATION).into());
        }
        Ok(index)
    }

    /// Decodes the record of an index entry
    fn read_entry(&mut self, entry: &IndexEntry, has_location: bool) -> Result<GenotypeRecord> {
        let Some(raw) = self.seek_reader()?.read_at(entry.seek)? else {
            return Err(out_of_sync(entry, END_OF_FILE));
        };
        check_sync(entry, &raw.name)?;
        let multiallelic = self.multiallelic_flag(Some(entry), has_location);
        let mut record = self.to_record(raw, multiallelic)?;
        record.variant.name.clone_from(&entry.name);
        Ok(record)
    }

    /// Decodes the next record of a sequential scan, matching it to the `row`-th index entry
    fn read_row(&mut self, row: usize) -> Result<Option<GenotypeRecord>> {
        let index = self.index.clone();
        let offset = self.seek_reader()?.position()?;
        let Some(raw) = self.seek_reader()?.read_next()? else {
            // index rows left over mean the file was truncated
            return match index.as_deref().and_then(|index| index.entries().get(row)) {
                Some(entry) => Err(out_of_sync(entry, END_OF_FILE)),
                None => Ok(None),
            };
        };

        let Some(index) = index else {
            let multiallelic = self.multiallelic_flag(None, false);
            return self.to_record(raw, multiallelic).map(Some);
        };
        let Some(entry) = index.entries().get(row) else {
            return Err(ReadError::IndexOutOfSync {
                expected: END_OF_FILE.to_string(),
                found: raw.name,
                offset,
            }
            .into());
        };
        check_sync(entry, &raw.name)?;
        let multiallelic = self.multiallelic_flag(Some(entry), index.has_location());
        let mut record = self.to_record(raw, multiallelic)?;
        record.variant.name.clone_from(&entry.name);
        Ok(Some(record))
    }

    fn to_record(&self, raw: RawRecord, multiallelic: bool) -> Result<GenotypeRecord> {
        let dosages = self.decoder.decode(&raw.probs)?;
        let variant = Variant::new(raw.name, raw.chrom, raw.pos)
            .with_alleles([raw.reference.as_str(), raw.coded.as_str()]);
        Ok(GenotypeRecord {
            variant,
            dosages,
            reference: raw.reference,
            coded: raw.coded,
            multiallelic,
        })
    }

    /// Takes the multiallelic flag from the index, or warns once that it is unavailable
    fn multiallelic_flag(&mut self, entry: Option<&IndexEntry>, has_location: bool) -> bool {
        match entry {
            Some(entry) if has_location => entry.multiallelic,
            _ => {
                if !self.warned_multiallelic {
                    warn!("Multiallelic variants are not detected on unindexed files.");
                    self.warned_multiallelic = true;
                }
                false
            }
        }
    }
}

impl GenotypeReader for Impute2Reader {
    fn get_variant_genotypes(&mut self, variant: &Variant) -> Result<Vec<GenotypeRecord>> {
        let index = self.require_location("variant lookup")?;
        let entries: Vec<&IndexEntry> = index
            .at_locus(Locus::new(variant.chrom, variant.pos))
            .collect();

        match entries.as_slice() {
            [] => Ok(Vec::new()),
            [entry] => {
                let record = self.read_entry(entry, true)?;
                match &variant.alleles {
                    // the file does not have the requested alleles
                    Some(alleles) if !record.variant.has_alleles(alleles) => Ok(Vec::new()),
                    _ => Ok(vec![record]),
                }
            }
            site => {
                let mut out = Vec::with_capacity(site.len());
                for entry in site {
                    let record = self.read_entry(entry, true)?;
                    let keep = match (&variant.alleles, &record.variant.alleles) {
                        (None, _) => true,
                        (Some(requested), Some(found)) => found.is_subset(requested),
                        (Some(_), None) => false,
                    };
                    if keep {
                        out.push(record);
                    }
                }
                Ok(out)
            }
        }
    }

    fn get_variant_by_name(&mut self, name: &str) -> Result<Vec<GenotypeRecord>> {
        let index = self.require_index("lookup by name")?;
        if let Some(entry) = index.get(name) {
            return Ok(vec![self.read_entry(entry, index.has_location())?]);
        }
        if let Some(aliases) = index.duplicates().get(name) {
            let mut out = Vec::with_capacity(aliases.len());
            for alias in aliases {
                out.extend(self.get_variant_by_name(alias)?);
            }
            return Ok(out);
        }
        warn!("Variant {name} was not found");
        Ok(Vec::new())
    }

    fn get_variants_in_region(
        &mut self,
        chrom: Chromosome,
        start: u64,
        end: u64,
    ) -> Result<Vec<GenotypeRecord>> {
        let index = self.require_location("region query")?;
        let mut out = Vec::new();
        for entry in index.in_region(chrom, start, end) {
            out.push(self.read_entry(entry, true)?);
        }
        Ok(out)
    }

    fn num_samples(&self) -> Option<usize> {
        self.samples.as_ref().map(Vec::len)
    }

    fn num_variants(&self) -> Option<usize> {
        self.index.as_ref().map(|index| index.len())
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

/// Checks that the record found at an entry's offset is the one the entry describes
fn check_sync(entry: &IndexEntry, found: &str) -> Result<()> {
    if entry.name == found || is_alias_of(&entry.name, found) {
        Ok(())
    } else {
        Err(out_of_sync(entry, found))
    }
}

fn out_of_sync(entry: &IndexEntry, found: &str) -> Error {
    ReadError::IndexOutOfSync {
        expected: entry.name.clone(),
        found: found.to_string(),
        offset: entry.seek,
    }
    .into()
}

/// Iterator over every record of a file, see [`Impute2Reader::iter_genotypes`]
pub struct Genotypes<'a> {
    reader: &'a mut Impute2Reader,
    row: usize,
    done: bool,
}
impl Iterator for Genotypes<'_> {
    type Item = Result<GenotypeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.reader.read_row(self.row).transpose();
        match result {
            Some(Ok(_)) => self.row += 1,
            // errors end the scan
            Some(Err(_)) | None => self.done = true,
        }
        result
    }
}

/// Iterator over the variants of an index, see [`Impute2Reader::iter_variants`]
pub struct Variants<'a> {
    reader: &'a mut Impute2Reader,
    index: Arc<IndexTable>,
    row: usize,
}
impl Iterator for Variants<'_> {
    type Item = Result<Variant>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.index.entries().get(self.row)?;
        self.row += 1;
        let result = self
            .reader
            .seek_reader()
            .and_then(|reader| reader.read_variant_at(entry.seek))
            .and_then(|variant| variant.ok_or_else(|| out_of_sync(entry, END_OF_FILE)))
            .and_then(|mut variant| {
                check_sync(entry, &variant.name)?;
                variant.name.clone_from(&entry.name);
                Ok(variant)
            });
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.index.len() - self.row;
        (remaining, Some(remaining))
    }
}
