//! # genoseek
//!
//! Indexed random-access reading of IMPUTE2 genotype probability files.
//!
//! An IMPUTE2 file stores one variant per line: chromosome, identifier,
//! position, both alleles, then one probability triple per sample. genoseek
//! scans a file once to build a side-car index of record offsets, caches it
//! next to the data file, and uses it to decode single records by identifier,
//! by variant or by region. Probabilities are returned as dosages of the coded
//! allele, with unconfident calls masked as `NaN`.
//!
//! Plain text files are always supported; BGZF-compressed files require the
//! `bgzf` feature (see [`Capabilities`]).
//!
//! ```rust,no_run
//! use genoseek::{Chromosome, GenotypeReader, ReaderBuilder};
//!
//! let mut reader = ReaderBuilder::default().build_index(true).open("chr22.impute2.gz")?;
//! let chrom: Chromosome = "22".parse()?;
//! for record in reader.get_variants_in_region(chrom, 16_000_000, 16_100_000)? {
//!     println!("{}\t{}", record.variant.name, record.num_missing());
//! }
//! # Ok::<(), genoseek::Error>(())
//! ```

mod core;
pub mod dosage;
pub mod error;
pub mod index;
pub mod reader;
pub mod seek;
pub mod stream;

pub use core::{Alleles, Chromosome, GenotypeRecord, Variant};
pub use dosage::{DosageDecoder, DEFAULT_PROBABILITY_THRESHOLD};
pub use error::{Error, Result};
pub use index::{ColumnSpec, DuplicateMap, IndexTable};
pub use reader::{GenotypeReader, Impute2Reader, ReaderBuilder};
pub use stream::Capabilities;

/// Leading bytes of every side-car index file
pub const INDEX_MAGIC: &[u8] = b"GENOSEEK INDEX FILE";
/// Suffix appended to the data file path to locate its side-car index
pub const INDEX_SUFFIX: &str = ".idx";
/// zstd level of the index payload (0 selects the zstd default)
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 0;
