//! Initial password generation.

use std::fmt::Write as _;

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use roll_core::{Identifier, RollError, RollResult};

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

/// One character from each class is guaranteed, so shorter is impossible.
pub const MIN_RANDOM_LENGTH: usize = 4;

/// How an initial password is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordMode {
    /// Upper, lower, digit and symbol characters, shuffled.
    RandomSecure,
    /// `{identifier}{delimiter}{random hex}`, memorable for staff.
    IdentifierSuffixed,
}

impl PasswordMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "random" | "random_secure" => Some(Self::RandomSecure),
            "suffixed" | "identifier_suffixed" => Some(Self::IdentifierSuffixed),
            _ => None,
        }
    }
}

/// Random password with at least one character of every class.
pub fn random_secure<R: Rng + ?Sized>(rng: &mut R, length: usize) -> RollResult<String> {
    if length < MIN_RANDOM_LENGTH {
        return Err(RollError::invalid_config(
            "credentials.password_length",
            format!("must be at least {MIN_RANDOM_LENGTH}"),
        ));
    }

    let classes = [UPPER, LOWER, DIGITS, SYMBOLS];
    let union: Vec<u8> = classes.concat();

    let mut chars: Vec<u8> = Vec::with_capacity(length);
    for class in classes {
        chars.extend(class.choose(rng));
    }
    while chars.len() < length {
        chars.extend(union.choose(rng));
    }
    chars.shuffle(rng);

    // Every byte comes from the ASCII tables above.
    Ok(chars.into_iter().map(char::from).collect())
}

/// `identifier` + `delimiter` + `suffix_bytes` of OS randomness as hex.
pub fn identifier_suffixed(identifier: &Identifier, delimiter: char, suffix_bytes: usize) -> String {
    let mut bytes = vec![0u8; suffix_bytes];
    OsRng.fill_bytes(&mut bytes);

    let mut out = String::with_capacity(identifier.as_str().len() + 1 + suffix_bytes * 2);
    out.push_str(identifier.as_str());
    out.push(delimiter);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn has_every_class(pw: &str) -> bool {
        pw.bytes().any(|b| UPPER.contains(&b))
            && pw.bytes().any(|b| LOWER.contains(&b))
            && pw.bytes().any(|b| DIGITS.contains(&b))
            && pw.bytes().any(|b| SYMBOLS.contains(&b))
    }

    #[test]
    fn random_passwords_cover_all_classes() {
        let mut rng = StdRng::seed_from_u64(7);
        for length in MIN_RANDOM_LENGTH..=16 {
            for _ in 0..50 {
                let pw = random_secure(&mut rng, length).unwrap();
                assert_eq!(pw.len(), length);
                assert!(has_every_class(&pw), "{pw} misses a class");
            }
        }
    }

    #[test]
    fn class_order_is_not_fixed() {
        let mut rng = StdRng::seed_from_u64(11);
        let first_is_upper = (0..200)
            .map(|_| random_secure(&mut rng, 4).unwrap())
            .filter(|pw| pw.as_bytes().first().is_some_and(|b| UPPER.contains(b)))
            .count();
        assert!(first_is_upper < 200);
    }

    #[test]
    fn too_short_is_refused() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(random_secure(&mut rng, 3).is_err());
    }

    #[test]
    fn suffixed_password_keeps_identifier() {
        let id: Identifier = "SCH001-TCH-2024-004".parse().unwrap();
        let pw = identifier_suffixed(&id, '@', 3);

        let (head, tail) = pw.split_once('@').unwrap();
        assert_eq!(head, "SCH001-TCH-2024-004");
        assert_eq!(tail.len(), 6);
        assert!(tail.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn modes_parse_from_config_strings() {
        assert_eq!(PasswordMode::parse("Random"), Some(PasswordMode::RandomSecure));
        assert_eq!(PasswordMode::parse("suffixed"), Some(PasswordMode::IdentifierSuffixed));
        assert_eq!(PasswordMode::parse("plain"), None);
    }
}
