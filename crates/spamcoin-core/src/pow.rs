//! Difficulty check.
//!
//! Difficulty is the number of literal `'0'` characters a hex digest must start
//! with. This is a simplification of a numeric target comparison: each extra
//! digit multiplies the expected work by 16 rather than by any finer factor.

/// Number of leading `'0'` characters in a hex digest.
pub fn count_leading_zero_digits(hash: &str) -> u32 {
    let mut total = 0u32;
    for c in hash.chars() {
        if c != '0' {
            break;
        }
        total += 1;
    }
    total
}

/// `true` when `hash` starts with at least `difficulty` zero digits.
/// A difficulty of zero accepts every hash.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    count_leading_zero_digits(hash) >= difficulty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_zero_digits_examples() {
        assert_eq!(count_leading_zero_digits(""), 0);
        assert_eq!(count_leading_zero_digits("abc"), 0);
        assert_eq!(count_leading_zero_digits("0abc"), 1);
        assert_eq!(count_leading_zero_digits("000f00"), 3);
        assert_eq!(count_leading_zero_digits(&"0".repeat(64)), 64);
    }

    #[test]
    fn difficulty_is_a_lower_bound() {
        assert!(meets_difficulty("00ab", 0));
        assert!(meets_difficulty("00ab", 1));
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("00ab", 3));
        assert!(meets_difficulty("ffff", 0));
        assert!(!meets_difficulty("ffff", 1));
    }
}
