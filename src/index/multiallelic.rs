use std::collections::HashMap;

use super::{IndexEntry, Locus};

/// Flags every entry sharing its locus with another entry as multiallelic
///
/// Entries without a locus are never multiallelic. Returns the number of
/// flagged entries.
pub(crate) fn group_multiallelic(entries: &mut [IndexEntry]) -> usize {
    let mut counts: HashMap<Locus, usize> = HashMap::with_capacity(entries.len());
    for locus in entries.iter().filter_map(|e| e.locus) {
        *counts.entry(locus).or_insert(0) += 1;
    }

    let mut flagged = 0;
    for entry in entries.iter_mut() {
        entry.multiallelic = entry.locus.is_some_and(|l| counts[&l] > 1);
        flagged += usize::from(entry.multiallelic);
    }
    flagged
}

/// Maps each locus to its rows, in file order
pub(crate) fn locus_map(entries: &[IndexEntry]) -> HashMap<Locus, Vec<usize>> {
    let mut map: HashMap<Locus, Vec<usize>> = HashMap::new();
    for (row, entry) in entries.iter().enumerate() {
        if let Some(locus) = entry.locus {
            map.entry(locus).or_default().push(row);
        }
    }
    map
}
