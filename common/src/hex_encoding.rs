// Addresses and hashes are stored and compared as normalized lowercase
// `0x`-prefixed hex strings everywhere in this pipeline. Every
// boundary that receives bytes or a foreign hex representation funnels
// through here so two differently-cased copies of the same address
// never end up looking like two different rows.

/// Normalize any `0x`-prefixed or bare hex string to lowercase, `0x`-prefixed.
pub fn normalize_hex(input: &str) -> String {
    let trimmed = input.strip_prefix("0x").unwrap_or(input);
    format!("0x{}", trimmed.to_ascii_lowercase())
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn hex_to_bytes(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(trimmed)
}

/// The 4-byte function selector a `method` classification is derived
/// from — the first 4 bytes of calldata, hex-encoded with `0x` prefix.
/// Returns `None` for empty calldata (plain value transfer).
pub fn method_selector(data: &[u8]) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    Some(bytes_to_hex(&data[..4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_hex_lowercases_and_prefixes() {
        assert_eq!(normalize_hex("0xABCDEF"), "0xabcdef");
        assert_eq!(normalize_hex("ABCDEF"), "0xabcdef");
    }

    #[test]
    fn method_selector_needs_four_bytes() {
        assert_eq!(method_selector(&[0xa9, 0x05, 0x9c, 0xbb]), Some("0xa9059cbb".to_string()));
        assert_eq!(method_selector(&[0xa9, 0x05]), None);
        assert_eq!(method_selector(&[]), None);
    }

    #[test]
    fn hex_to_bytes_roundtrips_with_bytes_to_hex() {
        let original = vec![0xde, 0xad, 0xbe, 0xef];
        let encoded = bytes_to_hex(&original);
        assert_eq!(hex_to_bytes(&encoded).unwrap(), original);
    }
}
