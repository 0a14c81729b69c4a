//! Answer string generation.

use crate::config::{CaptchaError, Result};
use rand::Rng;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Draws a lowercase answer whose length is uniform in
/// `[min_length, max_length]` and whose letters are uniform over `a-z`.
///
/// # Errors
///
/// Returns `InvalidConfig` if `min_length` is zero or exceeds `max_length`.
pub fn random_answer<R: Rng + ?Sized>(
    rng: &mut R,
    min_length: usize,
    max_length: usize,
) -> Result<String> {
    if min_length == 0 || min_length > max_length {
        return Err(CaptchaError::InvalidConfig(format!(
            "answer length range {min_length}..={max_length} is empty"
        )));
    }

    let length = rng.random_range(min_length..=max_length);
    Ok((0..length)
        .map(|_| char::from(LETTERS[rng.random_range(0..LETTERS.len())]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_length_and_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let answer = random_answer(&mut rng, 6, 10).unwrap();
            assert!((6..=10).contains(&answer.len()));
            assert!(answer.bytes().all(|b| b.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_fixed_length() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            assert_eq!(random_answer(&mut rng, 6, 6).unwrap().len(), 6);
        }
    }

    #[test]
    fn test_every_length_reachable() {
        let mut rng = StdRng::seed_from_u64(3);
        let lengths: HashSet<usize> = (0..1000)
            .map(|_| random_answer(&mut rng, 2, 5).unwrap().len())
            .collect();
        assert_eq!(lengths, HashSet::from([2, 3, 4, 5]));
    }

    #[test]
    fn test_every_letter_reachable() {
        let mut rng = StdRng::seed_from_u64(5);
        let letters: HashSet<char> = (0..200)
            .flat_map(|_| random_answer(&mut rng, 10, 10).unwrap().chars().collect::<Vec<_>>())
            .collect();
        assert_eq!(letters.len(), 26);
    }

    #[test]
    fn test_invalid_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            random_answer(&mut rng, 5, 4),
            Err(CaptchaError::InvalidConfig(_))
        ));
        assert!(matches!(
            random_answer(&mut rng, 0, 4),
            Err(CaptchaError::InvalidConfig(_))
        ));
    }
}
