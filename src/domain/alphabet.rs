// Alphabet domain model - characters the display hardware can render
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: BTreeSet<char>,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::from_chars(std::iter::empty())
    }
}

impl Alphabet {
    /// Space is always renderable, whether or not the device lists it
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let mut chars: BTreeSet<char> = chars.into_iter().collect();
        chars.insert(' ');
        Self { chars }
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_is_always_present() {
        let alphabet = Alphabet::from_chars("ABC".chars());
        assert!(alphabet.contains(' '));
        assert!(alphabet.contains('B'));
        assert!(!alphabet.contains('b'));
        assert_eq!(alphabet.len(), 4);
        assert!(Alphabet::default().contains(' '));
    }
}
