use std::collections::HashMap;

use log::warn;

use super::IndexEntry;

/// Mapping from a duplicated identifier to the aliases given to its occurrences
///
/// Aliases are listed in file order, and originals are iterated in the order of
/// their first occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DuplicateMap {
    originals: Vec<String>,
    aliases: HashMap<String, Vec<String>>,
}
impl DuplicateMap {
    /// Returns the aliases of a duplicated identifier
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.aliases.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Returns the number of duplicated identifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Iterates over (original, aliases) in order of first occurrence
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.originals
            .iter()
            .map(|name| (name.as_str(), self.aliases[name].as_slice()))
    }
}

/// Renames every occurrence of a repeated identifier to `<name>:dup<N>`
///
/// N counts the occurrences of that identifier in file order, starting at 1, and
/// the first occurrence is renamed as well.
pub(crate) fn resolve_duplicates(entries: &mut [IndexEntry]) -> DuplicateMap {
    // (count, row of first occurrence) per identifier
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::with_capacity(entries.len());
    for (row, entry) in entries.iter().enumerate() {
        counts.entry(entry.name.as_str()).or_insert((0, row)).0 += 1;
    }

    let mut duplicated: Vec<(usize, &str, usize)> = counts
        .iter()
        .filter(|(_, (count, _))| *count > 1)
        .map(|(name, (count, first))| (*first, *name, *count))
        .collect();
    if duplicated.is_empty() {
        return DuplicateMap::default();
    }
    duplicated.sort_unstable();

    warn!("Duplicated markers found");
    for (_, name, count) in &duplicated {
        warn!("  - {name}: {count} times");
    }
    warn!("Appending ':dupX' to the duplicated markers according to their location in the file");

    let originals: Vec<String> = duplicated.iter().map(|(_, name, _)| (*name).to_string()).collect();
    let mut aliases: HashMap<String, Vec<String>> = duplicated
        .iter()
        .map(|(_, name, count)| ((*name).to_string(), Vec::with_capacity(*count)))
        .collect();
    for entry in entries.iter_mut() {
        if let Some(list) = aliases.get_mut(&entry.name) {
            let alias = format!("{}:dup{}", entry.name, list.len() + 1);
            list.push(alias.clone());
            entry.name = alias;
        }
    }

    DuplicateMap { originals, aliases }
}

/// Checks if `alias` is an alias generated for `original`
pub(crate) fn is_alias_of(alias: &str, original: &str) -> bool {
    alias
        .strip_prefix(original)
        .and_then(|rest| rest.strip_prefix(":dup"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::table::tests::entry;

    fn names(entries: &[IndexEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_no_duplicates() {
        let mut entries = vec![entry("rs1", 1, 1, 0), entry("rs2", 1, 2, 10)];
        let map = resolve_duplicates(&mut entries);
        assert!(map.is_empty());
        assert_eq!(names(&entries), ["rs1", "rs2"]);
    }

    #[test]
    fn test_every_occurrence_is_renamed() {
        let mut entries = vec![
            entry("rs1", 1, 1, 0),
            entry("rs2", 1, 2, 10),
            entry("rs1", 1, 3, 20),
            entry("rs1", 1, 4, 30),
        ];
        let map = resolve_duplicates(&mut entries);
        assert_eq!(names(&entries), ["rs1:dup1", "rs2", "rs1:dup2", "rs1:dup3"]);
        assert_eq!(
            map.get("rs1").unwrap(),
            ["rs1:dup1", "rs1:dup2", "rs1:dup3"]
        );
        assert!(!map.contains("rs2"));
    }

    #[test]
    fn test_first_occurrence_order() {
        let mut entries = vec![
            entry("b", 1, 1, 0),
            entry("a", 1, 2, 10),
            entry("a", 1, 3, 20),
            entry("b", 1, 4, 30),
        ];
        let map = resolve_duplicates(&mut entries);
        let originals: Vec<_> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(originals, ["b", "a"]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_is_alias_of() {
        assert!(is_alias_of("rs1:dup2", "rs1"));
        assert!(is_alias_of("rs1:dup12", "rs1"));
        assert!(!is_alias_of("rs1", "rs1"));
        assert!(!is_alias_of("rs10:dup1", "rs1"));
        assert!(!is_alias_of("rs1:dup", "rs1"));
        assert!(!is_alias_of("rs1:dupx", "rs1"));
    }
}
