//! Random digit sequences and answer checking.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DigitError
// ---------------------------------------------------------------------------

/// Errors raised by digit generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigitError {
    /// A sequence of fewer than one digit was requested.
    ///
    /// The session engine never asks for fewer than three digits, so seeing
    /// this at runtime means a caller broke the contract.
    #[error("digit length must be at least 1 (got {0})")]
    InvalidLength(usize),
}

// ---------------------------------------------------------------------------
// DigitSource
// ---------------------------------------------------------------------------

/// Produces the digit sequence for each round.
///
/// Object-safe so the engine can hold a `Box<dyn DigitSource>` and tests can
/// substitute a scripted source.
pub trait DigitSource: Send {
    /// Return `length` decimal digits.
    ///
    /// # Errors
    ///
    /// [`DigitError::InvalidLength`] when `length < 1`.
    fn generate(&mut self, length: usize) -> Result<String, DigitError>;
}

// Compile-time assertion: Box<dyn DigitSource> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn DigitSource>) {}
};

// ---------------------------------------------------------------------------
// RandomDigits
// ---------------------------------------------------------------------------

/// Independent, uniformly distributed digits `0`–`9` (repeats allowed).
pub struct RandomDigits {
    rng: StdRng,
}

impl RandomDigits {
    /// Seeded from the operating system's entropy source.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic source — the same seed always yields the same rounds.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomDigits {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RandomDigits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomDigits").finish_non_exhaustive()
    }
}

impl DigitSource for RandomDigits {
    fn generate(&mut self, length: usize) -> Result<String, DigitError> {
        random_digits(&mut self.rng, length)
    }
}

fn random_digits<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Result<String, DigitError> {
    if length < 1 {
        return Err(DigitError::InvalidLength(length));
    }
    Ok((0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect())
}

/// Generate `length` random digits using the thread-local RNG.
///
/// ```
/// use digit_span::digits::generate_digits;
///
/// let digits = generate_digits(6).unwrap();
/// assert_eq!(digits.len(), 6);
/// assert!(digits.chars().all(|c| c.is_ascii_digit()));
/// assert!(generate_digits(0).is_err());
/// ```
pub fn generate_digits(length: usize) -> Result<String, DigitError> {
    random_digits(&mut rand::rng(), length)
}

// ---------------------------------------------------------------------------
// Answer helpers
// ---------------------------------------------------------------------------

/// `true` iff `answer` and `expected` are identical digit strings.
///
/// No partial credit: a missing, extra or transposed digit fails.
pub fn validate_answer(answer: &str, expected: &str) -> bool {
    answer == expected
}

/// Keep only the ASCII decimal digits of `raw`.
///
/// Applied to keyboard and recogniser input before comparison.  The result
/// is a fixed point: sanitising twice is the same as sanitising once.
///
/// ```
/// use digit_span::digits::sanitize_input;
///
/// assert_eq!(sanitize_input("4-8 2?"), "482");
/// assert_eq!(sanitize_input("abc"), "");
/// ```
pub fn sanitize_input(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

// ---------------------------------------------------------------------------
// ScriptedDigits  (test-only)
// ---------------------------------------------------------------------------

/// Test double that hands out pre-configured sequences in order.
///
/// Falls back to zeros once the script runs out.
#[cfg(test)]
pub struct ScriptedDigits {
    script: std::collections::VecDeque<String>,
}

#[cfg(test)]
impl ScriptedDigits {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
impl DigitSource for ScriptedDigits {
    fn generate(&mut self, length: usize) -> Result<String, DigitError> {
        if length < 1 {
            return Err(DigitError::InvalidLength(length));
        }
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| "0".repeat(length)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- generate ---

    #[test]
    fn generate_returns_exact_length_of_digits() {
        let mut source = RandomDigits::seeded(1);
        for n in 1..=20 {
            let digits = source.generate(n).unwrap();
            assert_eq!(digits.chars().count(), n);
            assert!(digits.chars().all(|c| c.is_ascii_digit()), "{digits}");
        }
    }

    #[test]
    fn generate_zero_is_invalid_length() {
        let mut source = RandomDigits::seeded(1);
        assert_eq!(source.generate(0), Err(DigitError::InvalidLength(0)));
        assert_eq!(generate_digits(0), Err(DigitError::InvalidLength(0)));
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RandomDigits::seeded(42);
        let mut b = RandomDigits::seeded(42);
        assert_eq!(a.generate(12).unwrap(), b.generate(12).unwrap());
    }

    #[test]
    fn every_digit_eventually_appears() {
        let mut source = RandomDigits::seeded(9);
        let long = source.generate(2_000).unwrap();
        for d in '0'..='9' {
            assert!(long.contains(d), "digit {d} never generated");
        }
    }

    // ---- validate ---

    #[test]
    fn validate_exact_match() {
        assert!(validate_answer("482", "482"));
    }

    #[test]
    fn validate_rejects_transposition_and_length_mismatch() {
        assert!(!validate_answer("428", "482"));
        assert!(!validate_answer("48", "482"));
        assert!(!validate_answer("4820", "482"));
        assert!(!validate_answer("", "482"));
    }

    // ---- sanitize ---

    #[test]
    fn sanitize_strips_non_digits() {
        assert_eq!(sanitize_input(" 1a2-b3 "), "123");
        assert_eq!(sanitize_input("５７"), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["", "abc", "0 1 2", "9x8y7", "４2"] {
            let once = sanitize_input(raw);
            assert_eq!(sanitize_input(&once), once);
            assert!(once.chars().all(|c| c.is_ascii_digit()));
        }
    }

    // ---- ScriptedDigits ---

    #[test]
    fn scripted_digits_replays_then_pads_with_zeros() {
        let mut source = ScriptedDigits::new(["482"]);
        assert_eq!(source.generate(3).unwrap(), "482");
        assert_eq!(source.generate(4).unwrap(), "0000");
    }
}
