//! Login name derivation.

use roll_core::{Identifier, RecordStore, RollError, RollResult};
use tracing::debug;

/// `{prefix}{identifier without separators}`, lower-cased, cut to `max_len`.
///
/// Truncation drops trailing characters; the prefix always survives as
/// long as it is shorter than `max_len`.
pub fn username_for(identifier: &Identifier, role_prefix: &str, max_len: usize) -> String {
    role_prefix
        .chars()
        .chain(identifier.as_str().chars().filter(|c| c.is_ascii_alphanumeric()))
        .map(|c| c.to_ascii_lowercase())
        .take(max_len)
        .collect()
}

/// `base` with a numeric suffix, shortening `base` so the result fits.
pub fn with_suffix(base: &str, n: u32, prefix_len: usize, max_len: usize) -> String {
    let suffix = n.to_string();
    let keep = max_len.saturating_sub(suffix.len()).max(prefix_len);
    let mut out: String = base.chars().take(keep).collect();
    out.push_str(&suffix);
    out
}

/// First free name among `base`, `base1`, `base2` … `base{cap}`.
pub async fn claim<S>(
    store: &S,
    base: &str,
    prefix_len: usize,
    max_len: usize,
    cap: u32,
) -> RollResult<String>
where
    S: RecordStore + ?Sized,
{
    if !store.username_exists(base).await? {
        return Ok(base.to_string());
    }

    for n in 1..=cap {
        let candidate = with_suffix(base, n, prefix_len, max_len);
        if !store.username_exists(&candidate).await? {
            debug!(base, username = %candidate, "disambiguated username");
            return Ok(candidate);
        }
    }

    Err(RollError::UsernameExhausted {
        base: base.to_string(),
        cap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    #[test]
    fn strips_separators_and_lowercases() {
        assert_eq!(
            username_for(&id("SCH001-STU-202507-0003"), "stu", 30),
            "stusch001stu2025070003"
        );
    }

    #[test]
    fn long_usernames_keep_the_prefix() {
        let name = username_for(&id("GREENVALLEYACADEMY-TCH-2024-001"), "tch", 30);
        assert_eq!(name.len(), 30);
        assert!(name.starts_with("tch"));
        assert_eq!(name, "tchgreenvalleyacademytch202400");
    }

    #[test]
    fn suffix_shortens_a_full_length_base() {
        let base = "tchgreenvalleyacademytch202400";
        assert_eq!(with_suffix(base, 1, 3, 30), "tchgreenvalleyacademytch202401");
        assert_eq!(with_suffix(base, 12, 3, 30).len(), 30);
        assert_eq!(with_suffix("parsch1par2024001", 2, 3, 30), "parsch1par20240012");
    }
}
