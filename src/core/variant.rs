use super::Chromosome;

/// A canonical set of alleles
///
/// Alleles are upper-cased, sorted and de-duplicated on construction, so two
/// sets built from the same alleles compare equal whatever order they were
/// discovered in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Alleles(Vec<String>);

impl Alleles {
    pub fn new<I, S>(alleles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner: Vec<String> = alleles
            .into_iter()
            .map(|a| a.as_ref().to_ascii_uppercase())
            .collect();
        inner.sort_unstable();
        inner.dedup();
        Self(inner)
    }

    /// Checks that every allele of `self` is also in `other`
    #[must_use]
    pub fn is_subset(&self, other: &Alleles) -> bool {
        // both are sorted, so a binary search per allele is enough
        self.0.iter().all(|a| other.0.binary_search(a).is_ok())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A genomic variant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    /// Identifier (e.g. an rsID, or a `:dupN` alias)
    pub name: String,
    pub chrom: Chromosome,
    /// 1-based position
    pub pos: u64,
    /// Canonical alleles, if known
    pub alleles: Option<Alleles>,
}

impl Variant {
    pub fn new<S: Into<String>>(name: S, chrom: Chromosome, pos: u64) -> Self {
        Self {
            name: name.into(),
            chrom,
            pos,
            alleles: None,
        }
    }

    /// Sets the alleles of the variant
    #[must_use]
    pub fn with_alleles<I, S>(mut self, alleles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.alleles = Some(Alleles::new(alleles));
        self
    }

    /// Checks if the variant carries the same canonical alleles as the provided set
    #[must_use]
    pub fn has_alleles(&self, alleles: &Alleles) -> bool {
        self.alleles.as_ref() == Some(alleles)
    }
}

/// The genotypes of one variant across all samples
///
/// Dosages are expressed as the expected number of `coded` alleles, with
/// `NaN` marking a missing (unconfident) call.
#[derive(Clone, Debug)]
pub struct GenotypeRecord {
    pub variant: Variant,
    pub dosages: Vec<f64>,
    pub reference: String,
    pub coded: String,
    pub multiallelic: bool,
}

impl GenotypeRecord {
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.dosages.len()
    }

    /// Number of samples with a missing call
    #[must_use]
    pub fn num_missing(&self) -> usize {
        self.dosages.iter().filter(|d| d.is_nan()).count()
    }
}

/// Records are compared by value with `NaN` dosages considered equal to each other
impl PartialEq for GenotypeRecord {
    fn eq(&self, other: &Self) -> bool {
        self.variant == other.variant
            && self.reference == other.reference
            && self.coded == other.coded
            && self.multiallelic == other.multiallelic
            && self.dosages.len() == other.dosages.len()
            && self
                .dosages
                .iter()
                .zip(&other.dosages)
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}
