// Compiled-in fallback table mapping a log's 32-byte event signature
// (topics[0]) to a human name, used when the external ABI-resolution
// interface is unreachable or doesn't know the
// contract. Covers the handful of standards common enough to be worth
// hard-coding: ERC-20, ERC-721, ownership, access control, pausable.

/// `(signature, event_name)` pairs, signatures lowercase `0x`-prefixed.
pub const STATIC_SIGNATURES: &[(&str, &str)] = &[
    (
        "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
        "Transfer",
    ),
    (
        "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925",
        "Approval",
    ),
    (
        "0x17307eab39ab6107e8899845ad3d59bd9653f200f220920489ca2b5937696c31",
        "ApprovalForAll",
    ),
    (
        "0x8be0079c531659141344cd1fd0a4f28419497f9722a3daafe3b4186f6b6457e0",
        "OwnershipTransferred",
    ),
    (
        "0x2f8788117e7eff1d82e926ec794901d17c78024a50270940304540a733656f0d",
        "RoleGranted",
    ),
    (
        "0xf6391f5c32d9c69d2a47ea670b442974b53935d1edc7fd64eb21e047a839171b",
        "RoleRevoked",
    ),
    (
        "0x62e78cea01bee320cd4e420270b5ea74000d11b0c9f74754ebdbfc544b05a258",
        "Paused",
    ),
    (
        "0x5db9ee0a495bf2e6ff9c91a7834c1ba4fdd244a5e8aa4e537bd38aeae4b073aa",
        "Unpaused",
    ),
];

/// Name used when neither the ABI service nor the static table resolves
/// a signature.
pub const UNKNOWN_EVENT_NAME: &str = "Unknown";

/// Resolve a topic0 signature against the static table, case-insensitively.
pub fn resolve_static(signature: &str) -> Option<&'static str> {
    let normalized = crate::hex_encoding::normalize_hex(signature);
    STATIC_SIGNATURES
        .iter()
        .find(|(sig, _)| *sig == normalized)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_erc20_transfer() {
        assert_eq!(
            resolve_static("0xDDF252AD1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"),
            Some("Transfer")
        );
    }

    #[test]
    fn unresolved_signature_is_none() {
        assert_eq!(resolve_static("0xdeadbeef"), None);
    }
}
