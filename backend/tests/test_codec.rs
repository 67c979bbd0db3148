//! Tests for the text codec adapter

use host_bridge_core_rs::codec::{decode, decode_value, encode, encode_value, Encoding};
use host_bridge_core_rs::models::HostObject;
use host_bridge_core_rs::{BridgeConfig, CallContext, ErrorKind, Owned};

fn bytes_of(value: &Owned) -> Vec<u8> {
    match value.object() {
        HostObject::Bytes(bytes) => bytes.clone(),
        other => panic!("expected bytes, got {}", other.type_name()),
    }
}

// ========================================================================
// Encoding names
// ========================================================================

#[test]
fn test_encoding_names_resolve() {
    assert_eq!(Encoding::parse("utf-8").unwrap(), Encoding::Utf8);
    assert_eq!(Encoding::parse("ASCII").unwrap(), Encoding::Ascii);
    assert_eq!(Encoding::parse("iso-8859-1").unwrap(), Encoding::Latin1);
    assert_eq!(Encoding::parse("utf_16_be").unwrap(), Encoding::Utf16Be);
    assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::Latin1);
    assert_eq!(Encoding::Utf16Le.to_string(), "utf-16-le");
}

#[test]
fn test_unknown_encoding_is_lookup_error() {
    let err = Encoding::parse("ebcdic-42").unwrap_err();
    assert!(err.matches(&ErrorKind::Lookup));
    assert_eq!(err.message(), "unknown encoding: ebcdic-42");
}

// ========================================================================
// Strict conversion
// ========================================================================

const ALL_ENCODINGS: [Encoding; 5] = [
    Encoding::Utf8,
    Encoding::Ascii,
    Encoding::Latin1,
    Encoding::Utf16Le,
    Encoding::Utf16Be,
];

#[test]
fn test_empty_maps_to_empty() {
    for encoding in ALL_ENCODINGS {
        assert!(encode("", encoding).unwrap().is_empty(), "{}", encoding);
        assert_eq!(decode(b"", encoding).unwrap(), "", "{}", encoding);
    }
}

#[test]
fn test_round_trip_across_encodings() {
    let long = "A".repeat(10_000);
    let samples = ["", "ASCII text 123", "café", long.as_str()];

    for encoding in ALL_ENCODINGS {
        for text in samples {
            let representable = encoding != Encoding::Ascii || text.is_ascii();
            if !representable {
                assert!(encode(text, encoding).is_err());
                continue;
            }
            let bytes = encode(text, encoding).unwrap();
            assert_eq!(decode(&bytes, encoding).unwrap(), text, "{} round trip", encoding);
        }
    }
}

#[test]
fn test_encoded_lengths() {
    let long = "A".repeat(10_000);
    assert_eq!(encode(&long, Encoding::Utf8).unwrap().len(), 10_000);
    assert_eq!(encode(&long, Encoding::Latin1).unwrap().len(), 10_000);
    assert_eq!(encode(&long, Encoding::Utf16Le).unwrap().len(), 20_000);
    assert_eq!(encode("café", Encoding::Utf8).unwrap().len(), 5);
    assert_eq!(encode("café", Encoding::Latin1).unwrap().len(), 4);
}

#[test]
fn test_utf8_passes_through() {
    let text = "Hello, 世界";
    let bytes = encode(text, Encoding::Utf8).unwrap();
    assert_eq!(bytes, text.as_bytes());
    assert_eq!(decode(&bytes, Encoding::Utf8).unwrap(), text);
}

#[test]
fn test_ascii_rejects_non_ascii() {
    let err = encode("naïve", Encoding::Ascii).unwrap_err();
    assert!(err.matches(&ErrorKind::Encoding));
    assert!(err.message().contains("position 2"), "{}", err.message());
    assert!(err.message().contains("ordinal not in range(128)"));

    let err = decode(b"ok\x80", Encoding::Ascii).unwrap_err();
    assert!(err.matches(&ErrorKind::Encoding));
    assert!(err.message().contains("0x80"));
}

#[test]
fn test_latin1_covers_one_byte_range_only() {
    assert_eq!(encode("ÿ", Encoding::Latin1).unwrap(), vec![0xff]);
    let err = encode("€", Encoding::Latin1).unwrap_err();
    assert!(err.matches(&ErrorKind::Encoding));
    assert!(err.message().contains("ordinal not in range(256)"));

    let every_byte: Vec<u8> = (0..=255).collect();
    let text = decode(&every_byte, Encoding::Latin1).unwrap();
    assert_eq!(text.chars().count(), 256);
}

#[test]
fn test_malformed_utf8_is_rejected_not_replaced() {
    let err = decode(b"caf\xc3", Encoding::Utf8).unwrap_err();
    assert!(err.matches(&ErrorKind::Encoding));
    assert!(err.message().contains("unexpected end of data"));

    let err = decode(b"\xfe", Encoding::Utf8).unwrap_err();
    assert!(err.message().contains("invalid start byte"));
}

#[test]
fn test_utf16_byte_order() {
    assert_eq!(encode("A", Encoding::Utf16Le).unwrap(), vec![0x41, 0x00]);
    assert_eq!(encode("A", Encoding::Utf16Be).unwrap(), vec![0x00, 0x41]);
    assert_eq!(decode(&[0x00, 0x41], Encoding::Utf16Be).unwrap(), "A");
}

#[test]
fn test_utf16_odd_length_is_truncated_data() {
    let err = decode(&[0x41, 0x00, 0x42], Encoding::Utf16Le).unwrap_err();
    assert!(err.message().contains("truncated data"));
    assert!(err.message().contains("position 2"));
}

// ========================================================================
// Host values
// ========================================================================

#[test]
fn test_encode_value_uses_context_default() {
    let ctx = CallContext::new();
    let encoded = encode_value(&ctx, &Owned::from("héllo"), None).unwrap();
    assert_eq!(bytes_of(&encoded), "héllo".as_bytes());
}

#[test]
fn test_configured_default_encoding() {
    let config = BridgeConfig {
        default_encoding: "latin-1".to_string(),
        ..BridgeConfig::default()
    };
    let ctx = CallContext::with_config(config).unwrap();
    assert_eq!(ctx.default_encoding(), Encoding::Latin1);

    let encoded = encode_value(&ctx, &Owned::from("café"), None).unwrap();
    assert_eq!(bytes_of(&encoded), b"caf\xe9");

    let decoded = decode_value(&ctx, &encoded, None).unwrap();
    assert_eq!(decoded.extract::<String>().unwrap(), "café");
}

#[test]
fn test_explicit_encoding_overrides_default() {
    let ctx = CallContext::new();
    let encoded = encode_value(&ctx, &Owned::from("hi"), Some("utf-16-be")).unwrap();
    assert_eq!(bytes_of(&encoded), vec![0x00, b'h', 0x00, b'i']);
}

#[test]
fn test_unknown_encoding_name_on_value() {
    let ctx = CallContext::new();
    let err = decode_value(&ctx, &Owned::bytes(b"x".to_vec()), Some("nope")).unwrap_err();
    assert!(err.matches(&ErrorKind::Lookup));
}

#[test]
fn test_wrong_value_shape_is_type_error() {
    let ctx = CallContext::new();
    let err = encode_value(&ctx, &Owned::bytes(b"raw".to_vec()), None).unwrap_err();
    assert!(err.matches(&ErrorKind::Type));
    assert_eq!(err.message(), "expected str, got bytes");

    let err = decode_value(&ctx, &Owned::from(12), None).unwrap_err();
    assert!(err.matches(&ErrorKind::Type));
    assert_eq!(err.message(), "expected bytes, got int");
}
