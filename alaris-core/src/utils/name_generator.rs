//! Made-up, vaguely language-neutral names built from weighted random
//! syllables. Used when the config leaves the nickname empty.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SYLLABLES: [usize; 5] = [1, 2, 3, 4, 5];
const SYLLABLES_CHANCE: [u32; 5] = [150, 500, 80, 10, 1];
const CONSONANTS: [usize; 5] = [0, 1, 2, 3, 4];
const CONSONANTS_CHANCE: [u32; 5] = [80, 350, 25, 5, 1];
const VOWELS: [usize; 3] = [1, 2, 3];
const VOWELS_CHANCE: [u32; 3] = [180, 25, 1];

const VOWEL: [char; 6] = ['a', 'e', 'i', 'o', 'u', 'y'];
const VOWEL_CHANCE: [u32; 6] = [10, 12, 10, 10, 8, 2];
const CONSONANT: [char; 21] = [
    'b', 'c', 'd', 'f', 'g', 'h', 'j', 'k', 'l', 'm', 'n', 'p', 'q', 'r', 's', 't', 'v', 'w', 'x',
    'y', 'z',
];
const CONSONANT_CHANCE: [u32; 21] = [
    10, 10, 10, 10, 10, 10, 10, 10, 12, 12, 12, 10, 5, 12, 12, 12, 8, 8, 3, 4, 3,
];

pub struct NameGenerator {
    rng: StdRng,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator {
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }

    /// Deterministic generator, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// A new name, capitalized, different on (almost) every call.
    pub fn make_name(&mut self) -> String {
        let count = SYLLABLES[self.index_select(&SYLLABLES_CHANCE)];
        let mut name = String::new();
        for _ in 0..count {
            self.push_syllable(&mut name);
        }

        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => name,
        }
    }

    fn push_syllable(&mut self, out: &mut String) {
        self.push_consonants(out);
        let vowels = VOWELS[self.index_select(&VOWELS_CHANCE)];
        for _ in 0..vowels {
            out.push(VOWEL[self.index_select(&VOWEL_CHANCE)]);
        }
        self.push_consonants(out);
    }

    fn push_consonants(&mut self, out: &mut String) {
        let consonants = CONSONANTS[self.index_select(&CONSONANTS_CHANCE)];
        for _ in 0..consonants {
            out.push(CONSONANT[self.index_select(&CONSONANT_CHANCE)]);
        }
    }

    /// Picks an index with probability proportional to its weight.
    fn index_select(&mut self, weights: &[u32]) -> usize {
        let total: u32 = weights.iter().sum();
        let chosen = self.rng.random_range(0..total);
        let mut so_far = 0;
        for (i, w) in weights.iter().enumerate() {
            so_far += w;
            if so_far > chosen {
                return i;
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_capitalized_letters() {
        let mut generator = NameGenerator::with_seed(42);
        for _ in 0..200 {
            let name = generator.make_name();
            assert!(!name.is_empty());
            let first = name.chars().next().unwrap();
            assert!(first.is_ascii_uppercase(), "{name}");
            assert!(name.chars().skip(1).all(|c| c.is_ascii_lowercase()), "{name}");
        }
    }

    #[test]
    fn same_seed_same_names() {
        let mut a = NameGenerator::with_seed(7);
        let mut b = NameGenerator::with_seed(7);
        for _ in 0..10 {
            assert_eq!(a.make_name(), b.make_name());
        }
    }

    #[test]
    fn weighted_selection_respects_zero_weights() {
        let mut generator = NameGenerator::with_seed(1);
        for _ in 0..100 {
            assert_eq!(generator.index_select(&[0, 5, 0]), 1);
        }
    }
}
