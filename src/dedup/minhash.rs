/*! Shingling and MinHash signatures.

Documents are turned into sets of word n-grams (shingles), hashed with xxHash64.
A [MinHasher] then keeps, for each of its `num_perm` permutations
`h(x) = (a * x + b) mod (2^61 - 1)`, the minimum over the shingle set.

The fraction of equal slots of two signatures estimates the Jaccard similarity
of the shingle sets.
Permutation coefficients are drawn from a seeded RNG: the same seed always gives
the same signatures, across runs and processes.
!*/
use std::{collections::HashSet, hash::Hasher};

use rand::{rngs::StdRng, Rng, SeedableRng};
use twox_hash::XxHash64;
use unicode_segmentation::UnicodeSegmentation;

const MERSENNE_PRIME: u64 = (1 << 61) - 1;
const TOKEN_SEPARATOR: u8 = 0x1f;

/// Lowercased words of a text.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.unicode_words().map(str::to_lowercase)
}

/// Word n-gram shingling.
#[derive(Debug, Clone)]
pub struct Shingler {
    size: usize,
    seed: u64,
}

impl Shingler {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            seed: 0,
        }
    }

    /// Hashed shingles of the text.
    ///
    /// Texts shorter than the shingle size yield a single shingle made of every token.
    pub fn shingles(&self, text: &str) -> HashSet<u64> {
        let tokens: Vec<String> = tokens(text).collect();
        if tokens.is_empty() {
            return HashSet::new();
        }

        let window = self.size.min(tokens.len());
        tokens
            .windows(window)
            .map(|shingle| {
                let mut hasher = XxHash64::with_seed(self.seed);
                for token in shingle {
                    hasher.write(token.as_bytes());
                    hasher.write_u8(TOKEN_SEPARATOR);
                }
                hasher.finish()
            })
            .collect()
    }
}

/// Fixed-length MinHash signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u64>);

impl Signature {
    pub fn new(values: Vec<u64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Estimated Jaccard similarity (fraction of equal slots).
    ///
    /// Signatures of different lengths have a null similarity.
    pub fn jaccard(&self, other: &Signature) -> f64 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let equal = self
            .0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a == b)
            .count();
        equal as f64 / self.0.len() as f64
    }
}

#[derive(Debug, Clone)]
pub struct MinHasher {
    coefficients: Vec<(u64, u64)>,
}

impl MinHasher {
    pub fn new(num_perm: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let coefficients = (0..num_perm)
            .map(|_| {
                (
                    rng.gen_range(1..MERSENNE_PRIME),
                    rng.gen_range(0..MERSENNE_PRIME),
                )
            })
            .collect();
        Self { coefficients }
    }

    pub fn num_perm(&self) -> usize {
        self.coefficients.len()
    }

    /// Signature of a shingle set, `None` if the set is empty.
    pub fn signature(&self, shingles: &HashSet<u64>) -> Option<Signature> {
        if shingles.is_empty() {
            return None;
        }

        let mut mins = vec![u64::MAX; self.coefficients.len()];
        for shingle in shingles {
            let x = (*shingle % MERSENNE_PRIME) as u128;
            for (min, (a, b)) in mins.iter_mut().zip(self.coefficients.iter()) {
                let h = ((*a as u128 * x + *b as u128) % MERSENNE_PRIME as u128) as u64;
                if h < *min {
                    *min = h;
                }
            }
        }

        Some(Signature(mins))
    }
}
