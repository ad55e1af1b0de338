//! Genotype probabilities to dosage conversion
//!
//! Each sample carries three probabilities: homozygous reference, heterozygous
//! and homozygous coded. The dosage is the expected number of coded alleles,
//! `2 * p_hom_coded + p_het`, within [0, 2].

use crate::error::{ConfigError, ReadError, Result};

/// The default calling threshold
pub const DEFAULT_PROBABILITY_THRESHOLD: f64 = 0.9;

/// Converts probability triples into dosages under a calling threshold
///
/// With a threshold `t > 0`, a sample whose three probabilities are all below
/// `t` is not confidently called and its dosage is `NaN`. With `t == 0` the
/// expected dosage is always returned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DosageDecoder {
    threshold: f64,
}
impl Default for DosageDecoder {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_PROBABILITY_THRESHOLD,
        }
    }
}
impl DosageDecoder {
    /// Creates a decoder, failing if the threshold is not within [0, 1]
    pub fn new(threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold).into());
        }
        Ok(Self { threshold })
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decodes a flat sequence of probability triples into one dosage per sample
    pub fn decode(&self, probs: &[f64]) -> Result<Vec<f64>> {
        let mut dosages = Vec::with_capacity(probs.len() / 3);
        self.decode_into(probs, &mut dosages)?;
        Ok(dosages)
    }

    /// Decodes into a reusable buffer (cleared first)
    pub fn decode_into(&self, probs: &[f64], dosages: &mut Vec<f64>) -> Result<()> {
        if probs.len() % 3 != 0 {
            return Err(ReadError::malformed(
                0,
                format!("{} probabilities is not a multiple of 3", probs.len()),
            )
            .into());
        }
        dosages.clear();
        dosages.extend(probs.chunks_exact(3).map(|triple| self.dosage(triple)));
        Ok(())
    }

    #[inline]
    fn dosage(&self, triple: &[f64]) -> f64 {
        if self.threshold > 0.0 && triple.iter().all(|&p| p < self.threshold) {
            return f64::NAN;
        }
        2.0 * triple[2] + triple[1]
    }
}
