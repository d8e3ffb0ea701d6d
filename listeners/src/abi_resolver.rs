// External ABI-resolution interface : `GET
// {API_BASE_URL}/smart-contracts/{address}/abi`. On timeout or miss the
// caller falls back to the compiled-in static signature table.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AbiResponse {
    success: bool,
    data: Option<AbiResponseData>,
}

#[derive(Debug, Deserialize)]
struct AbiResponseData {
    #[allow(dead_code)]
    address: String,
    abi: serde_json::Value,
}

pub struct AbiResolver {
    client: reqwest::Client,
    api_base_url: Option<String>,
}

impl AbiResolver {
    pub fn new(api_base_url: Option<String>, timeout: std::time::Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, api_base_url }
    }

    /// Fetches the ABI for `contract_address`, if a resolution backend is
    /// configured and reachable. Returns `None` on missing config,
    /// non-2xx response, timeout, or malformed body.
    pub async fn resolve_abi(&self, contract_address: &str) -> Option<serde_json::Value> {
        let base = self.api_base_url.as_ref()?;
        let url = format!("{base}/smart-contracts/{contract_address}/abi");

        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                log::warn!("ABI resolution request to {url} failed: {err}");
                return None;
            }
        };

        if !response.status().is_success() {
            return None;
        }

        match response.json::<AbiResponse>().await {
            Ok(body) if body.success => body.data.map(|d| d.abi),
            Ok(_) => None,
            Err(err) => {
                log::warn!("ABI resolution response from {url} was malformed: {err}");
                None
            }
        }
    }

    /// Resolves an event's display name from a decoded ABI entry list by
    /// matching `event_signature` against a precomputed keccak256 topic
    /// ABI resolution does not compute the hash itself —
    /// the static table already knows the mapping for the standards it
    /// covers, so this is only consulted when that table misses and a
    /// caller has a full ABI to cross-reference by name.
    pub fn find_event_name(abi: &serde_json::Value, event_signature_topic: &str) -> Option<String> {
        let entries = abi.as_array()?;
        for entry in entries {
            if entry.get("type").and_then(|v| v.as_str()) != Some("event") {
                continue;
            }
            if let Some(sig_hash) = entry.get("signatureHash").and_then(|v| v.as_str()) {
                if sig_hash.eq_ignore_ascii_case(event_signature_topic) {
                    return entry.get("name").and_then(|v| v.as_str()).map(String::from);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_resolver_returns_none() {
        let resolver = AbiResolver::new(None, std::time::Duration::from_secs(1));
        assert!(resolver.resolve_abi("0xcontract").await.is_none());
    }

    #[test]
    fn find_event_name_matches_case_insensitively() {
        let abi = serde_json::json!([
            {"type": "event", "name": "Transfer", "signatureHash": "0xABCD"},
        ]);
        assert_eq!(
            AbiResolver::find_event_name(&abi, "0xabcd"),
            Some("Transfer".to_string())
        );
        assert_eq!(AbiResolver::find_event_name(&abi, "0xffff"), None);
    }
}
