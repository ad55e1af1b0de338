mod chrom;
mod variant;

pub use chrom::Chromosome;
pub use variant::{Alleles, GenotypeRecord, Variant};
