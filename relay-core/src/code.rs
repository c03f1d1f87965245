use rand::Rng;

/// Characters allowed in game codes: uppercase alphanumeric with the
/// easily-confused 0, O, I, 1 and L removed.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 6;

/// Generate a shareable 6-character game code.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH
        && code
            .bytes()
            .all(|b| CODE_ALPHABET.contains(&b.to_ascii_uppercase()))
}

/// Codes are normalized on every lookup so players can type them loosely.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(is_valid_code(&code));
        }
    }

    #[test]
    fn codes_rarely_collide() {
        let codes: std::collections::HashSet<String> =
            (0..1000).map(|_| generate_code()).collect();
        assert!(codes.len() > 990);
    }

    #[test]
    fn validity_rejects_confusable_and_malformed_codes() {
        assert!(is_valid_code("ABC234"));
        assert!(is_valid_code("abc234")); // case-insensitive
        assert!(!is_valid_code("ABC23")); // too short
        assert!(!is_valid_code("ABC2345")); // too long
        assert!(!is_valid_code("ABC10O")); // confusable characters
        assert!(!is_valid_code("ABC23!"));
    }

    #[test]
    fn normalize_uppercases_and_trims() {
        assert_eq!(normalize_code("  abc234 "), "ABC234");
        assert_eq!(normalize_code("XyZ789"), "XYZ789");
    }
}
