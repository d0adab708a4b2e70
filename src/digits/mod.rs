//! Digit sequences — generation, validation and input normalisation.
//!
//! * [`DigitSource`] — trait the session engine draws new sequences from.
//! * [`RandomDigits`] — uniform random source (seedable for tests).
//! * [`validate_answer`] — exact, character-for-character comparison.
//! * [`sanitize_input`] — strips everything that is not `0`–`9`.
//! * [`extract_spoken_digits`] — maps spoken numerals in a transcript
//!   (Chinese numerals, English digit words) to ASCII digits.
//!
//! # Quick start
//!
//! ```
//! use digit_span::digits::{sanitize_input, validate_answer, DigitSource, RandomDigits};
//!
//! let mut source = RandomDigits::seeded(7);
//! let digits = source.generate(5).unwrap();
//! assert_eq!(digits.len(), 5);
//!
//! let typed = sanitize_input(&format!(" {digits} "));
//! assert!(validate_answer(&typed, &digits));
//! ```

pub mod generator;
pub mod spoken;

pub use generator::{
    generate_digits, sanitize_input, validate_answer, DigitError, DigitSource, RandomDigits,
};
pub use spoken::extract_spoken_digits;

#[cfg(test)]
pub use generator::ScriptedDigits;
