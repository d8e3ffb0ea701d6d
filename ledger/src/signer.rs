// Sender recovery.
//
// For any transaction whose sender is not carried inline, recover it
// using a chain-id-parametric EIP-155 signer; on failure, fall back to
// the legacy (pre-EIP-155) signer; on failure, report an empty sender
// and continue — a transaction is never dropped for this reason alone.

use alloy::{
    consensus::{transaction::SignerRecoverable, TxEnvelope},
    primitives::Signature,
};

use crate::types::RpcTransaction;

/// Recover the sender address of a raw transaction envelope.
///
/// `chain_id` parametrizes EIP-155 recovery; `chain_id = None` attempts
/// legacy (pre-EIP-155) recovery directly, matching a pre-155
/// transaction's `v` encoding.
pub fn recover_sender(envelope: &TxEnvelope) -> String {
    match envelope.recover_signer() {
        Ok(address) => besuscan_common::hex_encoding::bytes_to_hex(address.as_slice()),
        Err(err) => {
            log::warn!(
                "sender recovery failed for tx {:?}: {err} — reporting empty sender",
                envelope.tx_hash()
            );
            String::new()
        }
    }
}

/// Recover a sender address from the loosely-typed JSON-RPC transaction
/// shape, when the node didn't populate `from` inline. Tries EIP-155
/// recovery with the supplied chain id first, then legacy recovery,
/// then gives up and returns an empty string.
pub fn recover_sender_from_rpc(tx: &RpcTransaction, chain_id: u64) -> String {
    if let Some(from) = tx.from.as_ref() {
        return from.clone();
    }

    match recover_from_signature(tx, Some(chain_id)) {
        Ok(address) => address,
        Err(eip155_err) => match recover_from_signature(tx, None) {
            Ok(address) => address,
            Err(legacy_err) => {
                log::warn!(
                    "sender recovery failed for tx {} (eip155: {eip155_err}, legacy: {legacy_err}) — empty sender",
                    tx.hash
                );
                String::new()
            }
        },
    }
}

fn recover_from_signature(
    tx: &RpcTransaction,
    chain_id: Option<u64>,
) -> Result<String, anyhow::Error> {
    use alloy::primitives::{B256, U256 as AU256};

    let mut r_bytes = [0u8; 32];
    tx.r.to_big_endian(&mut r_bytes);
    let mut s_bytes = [0u8; 32];
    tx.s.to_big_endian(&mut s_bytes);
    let r = AU256::from_be_slice(&r_bytes);
    let s = AU256::from_be_slice(&s_bytes);
    let parity = match chain_id {
        Some(id) => tx.v.checked_sub(35).map(|v| v % 2 == 1).unwrap_or(false) && tx.chain_id == Some(id),
        None => tx.v == 27 || tx.v == 28,
    };
    let signature = Signature::new(r, s, parity);
    let hash: B256 = hex_to_b256(&tx.hash)?;
    let address = signature.recover_address_from_prehash(&hash)?;
    Ok(besuscan_common::hex_encoding::bytes_to_hex(address.as_slice()))
}

fn hex_to_b256(input: &str) -> Result<alloy::primitives::B256, anyhow::Error> {
    let bytes = besuscan_common::hex_encoding::hex_to_bytes(input)?;
    Ok(alloy::primitives::B256::from_slice(&bytes))
}

/// Derive the address of a newly created contract:
/// `keccak256(rlp(sender, nonce))[12:]`.
pub fn derive_contract_address(sender: &str, nonce: u64) -> Result<String, anyhow::Error> {
    use alloy::primitives::{Address, Keccak256};

    let sender_bytes = besuscan_common::hex_encoding::hex_to_bytes(sender)?;
    let sender_address = Address::try_from(sender_bytes.as_slice())
        .map_err(|_| anyhow::anyhow!("sender {sender} is not a 20-byte address"))?;

    let mut rlp_buf = Vec::new();
    rlp_encode_sender_and_nonce(&mut rlp_buf, sender_address.as_slice(), nonce);

    let mut hasher = Keccak256::new();
    hasher.update(&rlp_buf);
    let hash = hasher.finalize();

    Ok(besuscan_common::hex_encoding::bytes_to_hex(&hash[12..]))
}

/// Minimal RLP encoder for the two-element `[sender, nonce]` list
/// contract-creation addresses are derived from. Not a general-purpose
/// RLP encoder — only handles the shapes this one call site needs.
fn rlp_encode_sender_and_nonce(out: &mut Vec<u8>, sender: &[u8], nonce: u64) {
    let mut nonce_bytes = nonce.to_be_bytes().to_vec();
    while nonce_bytes.first() == Some(&0) && nonce_bytes.len() > 1 {
        nonce_bytes.remove(0);
    }
    if nonce == 0 {
        nonce_bytes.clear();
    }

    let mut payload = Vec::new();
    rlp_encode_bytes(&mut payload, sender);
    rlp_encode_bytes(&mut payload, &nonce_bytes);

    rlp_encode_list_header(out, payload.len());
    out.extend_from_slice(&payload);
}

fn rlp_encode_bytes(out: &mut Vec<u8>, data: &[u8]) {
    if data.len() == 1 && data[0] < 0x80 {
        out.push(data[0]);
        return;
    }
    if data.len() < 56 {
        out.push(0x80 + data.len() as u8);
    } else {
        let len_bytes = encode_length_bytes(data.len());
        out.push(0xb7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    out.extend_from_slice(data);
}

fn rlp_encode_list_header(out: &mut Vec<u8>, payload_len: usize) {
    if payload_len < 56 {
        out.push(0xc0 + payload_len as u8);
    } else {
        let len_bytes = encode_length_bytes(payload_len);
        out.push(0xf7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
}

fn encode_length_bytes(len: usize) -> Vec<u8> {
    let mut bytes = (len as u64).to_be_bytes().to_vec();
    while bytes.first() == Some(&0) && bytes.len() > 1 {
        bytes.remove(0);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_address_derivation_is_deterministic() {
        let sender = "0x0000000000000000000000000000000000000001";
        let a = derive_contract_address(sender, 0).unwrap();
        let b = derive_contract_address(sender, 0).unwrap();
        assert_eq!(a, b);
        let c = derive_contract_address(sender, 1).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn contract_address_is_twenty_bytes() {
        let sender = "0x0000000000000000000000000000000000000001";
        let addr = derive_contract_address(sender, 5).unwrap();
        assert_eq!(addr.len(), 2 + 40);
    }
}
