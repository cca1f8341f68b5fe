//! Integration tests for probe names.
//!
//! Tests Identifier encoding, decoding, comparison and validation.

use varprobe::identifier::{CHARACTERS_PER_CHUNK, MAX_LENGTH, NUMBER_OF_CHUNKS};
use varprobe::{Identifier, NameError};

// =============================================================================
// Empty Identifier Tests
// =============================================================================

#[test]
fn test_default_is_empty() {
    let id = Identifier::default();
    assert!(id.is_empty());
    assert_eq!(id.decode(), "");
    assert_eq!(id, Identifier::EMPTY);
    assert_eq!(Identifier::encode(""), Identifier::EMPTY);
}

#[test]
fn test_non_empty() {
    let id = Identifier::encode("123");
    assert!(!id.is_empty());
    assert_eq!(id.decode(), "123");
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_decode_restores_valid_names() {
    let names = [
        "a",
        "rpm",
        "motor.current_a",
        "123456789",
        "1234567890",
        "with spaces and ~!@#$%^&*()",
        "abcdefghijklmnopqrstuvwxyz0123456789",
    ];
    for name in names {
        assert!(Identifier::is_valid(name), "{name}");
        assert_eq!(Identifier::encode(name).decode(), name);
    }
}

#[test]
fn test_long_name_truncated() {
    let long = "0123456789012345678901234567890123456789";
    let id = Identifier::encode(long);
    assert_eq!(id.decode(), &long[..MAX_LENGTH]);
}

#[test]
fn test_display_matches_decode() {
    let id = Identifier::encode("ctl_error");
    assert_eq!(format!("{}", id), "ctl_error");
    assert_eq!(format!("{:?}", id), "Identifier(\"ctl_error\")");
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_reference_blocks() {
    assert_eq!(NUMBER_OF_CHUNKS, 4);
    assert_eq!(CHARACTERS_PER_CHUNK, 9);

    // The name is fed in again after each terminator instead of zero padding.
    let id = Identifier::encode("123456789");
    assert_eq!(id.chunks()[0], 4139051819874441521);
    assert_eq!(id.chunks()[1], 4066426843206293632);
    assert_eq!(id.chunks()[2], 3993801866538139705);
    assert_eq!(id.chunks()[3], 3921176889869212856);
}

#[test]
fn test_short_name_fills_every_block() {
    let id = Identifier::encode("ab");
    for chunk in id.chunks() {
        assert_eq!(*chunk, 55595732456976737);
    }
}

#[test]
fn test_from_chunks_round_trip() {
    let id = Identifier::encode("sensor");
    assert_eq!(Identifier::from_chunks(*id.chunks()), id);
}

#[test]
fn test_const_encoding() {
    const NAME: Identifier = Identifier::encode("const_name");
    assert_eq!(NAME.decode(), "const_name");
}

// =============================================================================
// Equality Tests
// =============================================================================

#[test]
fn test_equality() {
    assert_eq!(Identifier::default(), Identifier::default());
    assert_eq!(Identifier::encode("123"), Identifier::encode("123"));
    assert_ne!(Identifier::encode("123"), Identifier::encode("123456"));
    assert_ne!(Identifier::encode("123"), Identifier::default());
    assert_eq!(Identifier::encode("abc"), "abc");
}

#[test]
fn test_distinct_names_distinct_encodings() {
    let names = [
        "a", "b", "aa", "ab", "ba", "a ", " a", "abc", "abcabc", "abcabcabc",
        "x123456789", "x12345678", "123456789x", "123456789y",
        "abcdefghijklmnopqrstuvwxyz012345678", "abcdefghijklmnopqrstuvwxyz0123456789",
        "bbcdefghijklmnopqrstuvwxyz0123456789",
    ];
    for (i, a) in names.iter().enumerate() {
        for (j, b) in names.iter().enumerate() {
            assert_eq!(
                Identifier::encode(a) == Identifier::encode(b),
                i == j,
                "{a:?} vs {b:?}"
            );
        }
    }
}

#[test]
fn test_differs_only_in_last_character() {
    let a = "abcdefghijklmnopqrstuvwxyz012345678A";
    let b = "abcdefghijklmnopqrstuvwxyz012345678B";
    assert_ne!(Identifier::encode(a), Identifier::encode(b));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_is_valid() {
    assert!(!Identifier::is_valid(""));
    assert!(Identifier::is_valid("0"));
    assert!(!Identifier::is_valid("\u{80}"));
    assert!(!Identifier::is_valid("caf\u{e9}"));
    assert!(Identifier::is_valid(&"x".repeat(MAX_LENGTH)));
    assert!(!Identifier::is_valid(&"x".repeat(MAX_LENGTH + 1)));
}

#[test]
fn test_parse_errors() {
    assert_eq!(Identifier::parse(""), Err(NameError::Empty));
    assert_eq!(
        Identifier::parse("ab\u{e9}"),
        Err(NameError::NonAscii { position: 2 })
    );
    assert_eq!(
        "y".repeat(40).parse::<Identifier>(),
        Err(NameError::TooLong { length: 40 })
    );
    assert_eq!(Identifier::parse("ok"), Ok(Identifier::encode("ok")));
}

#[test]
fn test_name_error_display() {
    let msg = format!("{}", NameError::TooLong { length: 40 });
    assert!(msg.contains("40"));
    assert!(msg.contains("36"));
    assert!(format!("{}", NameError::Empty).contains("empty"));
}
