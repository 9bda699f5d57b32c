// Character translation between the editing representation and the device alphabet
use std::collections::BTreeMap;

use super::error::PanelError;

/// Bidirectional single-character substitution table.
///
/// `forward` maps app characters to device characters; `reverse` is its
/// literal inverse. When two sources share a target the reverse entry is the
/// last one registered, see [`TranslationMap::collisions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationMap {
    forward: BTreeMap<char, char>,
    reverse: BTreeMap<char, char>,
}

impl TranslationMap {
    /// Build wholesale from server pairs, in the order given
    pub fn from_pairs(pairs: impl IntoIterator<Item = (char, char)>) -> Self {
        let mut map = Self::default();
        for (source, target) in pairs {
            map.forward.insert(source, target);
            map.reverse.insert(target, source);
        }
        map
    }

    pub fn forward(&self, c: char) -> char {
        self.forward.get(&c).copied().unwrap_or(c)
    }

    pub fn reverse(&self, c: char) -> char {
        self.reverse.get(&c).copied().unwrap_or(c)
    }

    pub fn has_forward(&self, c: char) -> bool {
        self.forward.contains_key(&c)
    }

    pub fn has_reverse(&self, c: char) -> bool {
        self.reverse.contains_key(&c)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.forward.iter().map(|(s, t)| (*s, *t))
    }

    /// Targets reached from more than one source; reverse lookup is ambiguous for these
    pub fn collisions(&self) -> Vec<(char, Vec<char>)> {
        let mut by_target: BTreeMap<char, Vec<char>> = BTreeMap::new();
        for (source, target) in &self.forward {
            by_target.entry(*target).or_default().push(*source);
        }
        by_target
            .into_iter()
            .filter(|(_, sources)| sources.len() > 1)
            .collect()
    }

    /// Add or replace an entry from user input. Both sides must be exactly one
    /// character, and a target may only be claimed by one source.
    pub fn insert(&mut self, source: &str, target: &str) -> Result<(), PanelError> {
        let source = single_char(source, "source")?;
        let target = single_char(target, "target")?;

        if let Some(existing) = self.reverse.get(&target).copied() {
            if existing != source && self.forward.get(&existing) == Some(&target) {
                return Err(PanelError::Validation(format!(
                    "'{}' is already the translation of '{}'",
                    target, existing
                )));
            }
        }

        if let Some(previous) = self.forward.insert(source, target) {
            if self.reverse.get(&previous) == Some(&source) {
                self.reverse.remove(&previous);
            }
        }
        self.reverse.insert(target, source);
        Ok(())
    }

    pub fn remove(&mut self, source: char) -> Option<char> {
        let target = self.forward.remove(&source)?;
        if self.reverse.get(&target) == Some(&source) {
            self.reverse.remove(&target);
            // fall back to another source still mapping here, if any
            if let Some((other, _)) = self.forward.iter().find(|(_, t)| **t == target) {
                self.reverse.insert(target, *other);
            }
        }
        Some(target)
    }
}

fn single_char(value: &str, side: &str) -> Result<char, PanelError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        (None, _) => Err(PanelError::Validation(format!("{} character is required", side))),
        _ => Err(PanelError::Validation(format!(
            "{} must be a single character, got {:?}",
            side, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_unmapped() {
        let map = TranslationMap::from_pairs([('°', 'd')]);
        assert_eq!(map.forward('A'), 'A');
        assert_eq!(map.reverse('A'), 'A');
        assert!(!map.has_forward('A'));
        assert!(map.has_reverse('d'));
    }

    #[test]
    fn test_round_trip_for_injective_map() {
        let map = TranslationMap::from_pairs([('°', 'd'), ('@', '~'), ('♥', '*')]);
        assert!(map.collisions().is_empty());
        for (source, _) in map.iter() {
            assert_eq!(map.reverse(map.forward(source)), source);
        }
    }

    #[test]
    fn test_non_injective_map_is_flagged() {
        let map = TranslationMap::from_pairs([('a', 'x'), ('b', 'x')]);
        assert_eq!(map.collisions(), vec![('x', vec!['a', 'b'])]);
        // last registered wins the reverse slot
        assert_eq!(map.reverse('x'), 'b');
        assert_ne!(map.reverse(map.forward('a')), 'a');
    }

    #[test]
    fn test_insert_rejects_bad_entries() {
        let mut map = TranslationMap::default();
        assert!(matches!(map.insert("", "x"), Err(PanelError::Validation(_))));
        assert!(matches!(map.insert("ab", "x"), Err(PanelError::Validation(_))));
        assert!(matches!(map.insert("a", "xy"), Err(PanelError::Validation(_))));

        map.insert("a", "x").unwrap();
        assert!(matches!(map.insert("b", "x"), Err(PanelError::Validation(_))));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_insert_replaces_existing_source() {
        let mut map = TranslationMap::default();
        map.insert("a", "x").unwrap();
        map.insert("a", "y").unwrap();
        assert_eq!(map.forward('a'), 'y');
        assert!(!map.has_reverse('x'));
        assert_eq!(map.reverse('y'), 'a');
    }

    #[test]
    fn test_remove_restores_remaining_reverse_entry() {
        let mut map = TranslationMap::from_pairs([('a', 'x'), ('b', 'x')]);
        assert_eq!(map.remove('b'), Some('x'));
        assert_eq!(map.reverse('x'), 'a');
        assert_eq!(map.remove('z'), None);
    }
}
