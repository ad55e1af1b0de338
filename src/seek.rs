use crate::core::{Chromosome, Variant};
use crate::error::{ReadError, Result};
use crate::stream::ByteStream;

/// Number of fixed fields preceding the probabilities on a data line
const FIXED_FIELDS: usize = 5;

/// Default field separator of IMPUTE2 files
pub const DEFAULT_SEPARATOR: u8 = b' ';

/// A data line decoded into its fields
///
/// `<chrom> <name> <pos> <reference> <coded> <p_hom_ref> <p_het> <p_hom_coded> ...`
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    pub chrom: Chromosome,
    pub name: String,
    pub pos: u64,
    pub reference: String,
    pub coded: String,
    /// Flat sequence of per-sample probability triples
    pub probs: Vec<f64>,
}
impl RawRecord {
    /// Parses a single data line (without its line terminator)
    ///
    /// Fields are split on every occurrence of `separator`, the same way the
    /// index builder splits them.
    ///
    /// * `line_number` - 1-based line number for error messages, 0 if unknown
    pub fn parse(line: &str, separator: u8, line_number: usize) -> Result<Self> {
        let mut fields = line.split(char::from(separator));
        let (chrom, name, pos, reference, coded) = parse_fixed(&mut fields, line_number)?;

        let probs = fields
            .map(|field| {
                field.parse::<f64>().map_err(|_| {
                    ReadError::malformed(line_number, format!("invalid probability: {field:?}"))
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if probs.len() % 3 != 0 {
            return Err(ReadError::malformed(
                line_number,
                format!(
                    "{} probabilities after the {FIXED_FIELDS} fixed fields is not a multiple of 3",
                    probs.len()
                ),
            )
            .into());
        }

        Ok(Self {
            chrom,
            name,
            pos,
            reference,
            coded,
            probs,
        })
    }

    /// Returns the number of samples on the line
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.probs.len() / 3
    }
}

type FixedFields = (Chromosome, String, u64, String, String);

/// Parses the fixed fields of a line: chromosome, name, position and both alleles
fn parse_fixed<'a, I>(fields: &mut I, line_number: usize) -> Result<FixedFields>
where
    I: Iterator<Item = &'a str>,
{
    let mut next = |what: &str| {
        fields
            .next()
            .ok_or_else(|| ReadError::malformed(line_number, format!("missing {what}")))
    };
    let chrom = next("chromosome")?.parse::<Chromosome>()?;
    let name = next("name")?.to_string();
    let pos_field = next("position")?;
    let pos = pos_field.parse::<u64>().map_err(|_| {
        ReadError::malformed(line_number, format!("invalid position: {pos_field:?}"))
    })?;
    let reference = next("reference allele")?.to_string();
    let coded = next("coded allele")?.to_string();
    Ok((chrom, name, pos, reference, coded))
}

/// Reads single records from a stream, either at an arbitrary position or sequentially
///
/// The reader owns the only cursor of its stream: every call repositions or
/// advances that cursor, so a handle must not be shared between concurrent readers.
pub struct SeekReader<S: ByteStream> {
    inner: S,
    /// Field separator
    separator: u8,
    /// Reusable line buffer
    line: String,
    /// Lines consumed since the last rewind (sequential mode)
    line_number: usize,
    /// Expected number of samples on every line, if known
    num_samples: Option<usize>,
}
impl<S: ByteStream> SeekReader<S> {
    pub fn new(inner: S, separator: u8, num_samples: Option<usize>) -> Self {
        Self {
            inner,
            separator,
            line: String::new(),
            line_number: 0,
            num_samples,
        }
    }

    /// Decodes the record starting at stream position `offset`
    ///
    /// Returns `None` if the stream ends at `offset`.
    pub fn read_at(&mut self, offset: u64) -> Result<Option<RawRecord>> {
        if !self.fill_at(offset)? {
            return Ok(None);
        }
        self.decode(0).map(Some)
    }

    /// Decodes only the variant of the record at `offset`, leaving the probabilities unparsed
    ///
    /// Returns `None` if the stream ends at `offset`.
    pub fn read_variant_at(&mut self, offset: u64) -> Result<Option<Variant>> {
        if !self.fill_at(offset)? {
            return Ok(None);
        }
        let mut fields = self
            .line
            .trim_end_matches(['\n', '\r'])
            .split(char::from(self.separator));
        let (chrom, name, pos, reference, coded) = parse_fixed(&mut fields, 0)?;
        Ok(Some(Variant::new(name, chrom, pos).with_alleles([reference, coded])))
    }

    /// Repositions the stream at its first record
    pub fn rewind(&mut self) -> Result<()> {
        self.inner.seek_to(0)?;
        self.line_number = 0;
        Ok(())
    }

    /// Decodes the next record, skipping blank lines, or returns `None` at the end of the stream
    pub fn read_next(&mut self) -> Result<Option<RawRecord>> {
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            if !self.line.trim_end_matches(['\n', '\r']).is_empty() {
                return self.decode(self.line_number).map(Some);
            }
        }
    }

    /// Returns the current stream position
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.position()?)
    }

    /// Reads the line at `offset` into the buffer, false at the end of the stream
    fn fill_at(&mut self, offset: u64) -> Result<bool> {
        self.inner.seek_to(offset)?;
        self.line.clear();
        Ok(self.inner.read_line(&mut self.line)? > 0)
    }

    fn decode(&self, line_number: usize) -> Result<RawRecord> {
        let line = self.line.trim_end_matches(['\n', '\r']);
        let record = RawRecord::parse(line, self.separator, line_number)?;
        if let Some(expected) = self.num_samples {
            let found = record.num_samples();
            if found != expected {
                return Err(ReadError::SampleCountMismatch {
                    name: record.name,
                    expected,
                    found,
                }
                .into());
            }
        }
        Ok(record)
    }

    /// Releases the stream
    pub fn into_inner(self) -> S {
        self.inner
    }
}
