//! Chain collaborator boundary.
//!
//! The Solana RPC client is an external collaborator: its answer to
//! "signature X moved Y lamports to the house wallet" is consumed as a
//! trusted fact. This module owns the trait the rest of the crate programs
//! against, a JSON-RPC implementation, and a scriptable in-memory double for
//! tests.

use crate::config::ChainConfig;
use crate::errors::{CasinoError, CasinoResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// A deposit transfer the chain has confirmed.
#[derive(Debug, Clone)]
pub struct VerifiedDeposit {
    pub signature: String,
    pub from_address: String,
    pub amount: u64,
}

/// Terminal state of a broadcast transfer as seen by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    Confirmed,
    NotFound,
    Failed,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Resolve a deposit signature into the lamports it moved to the house
    /// wallet. Errors are retryable (`ExternalVerification`).
    async fn verify_deposit(&self, signature: &str) -> CasinoResult<VerifiedDeposit>;

    /// Hand a withdrawal to the treasury signer for broadcast; returns the
    /// chain signature.
    async fn broadcast_withdrawal(&self, destination: &str, amount: u64) -> CasinoResult<String>;

    /// Ask the chain whether a broadcast signature landed.
    async fn confirm(&self, signature: &str) -> CasinoResult<ChainStatus>;
}

/// JSON-RPC chain client. Deposit verification talks to the Solana RPC node;
/// withdrawal broadcast goes through the treasury signer service that holds
/// the hot wallet key.
pub struct RpcChainClient {
    http: reqwest::Client,
    rpc_url: String,
    treasury_url: String,
    house_wallet: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
}

impl RpcChainClient {
    pub fn new(config: &ChainConfig) -> CasinoResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.rpc_timeout_secs))
            .build()
            .map_err(|e| CasinoError::ExternalVerification(e.to_string()))?;
        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            treasury_url: config.treasury_url.clone(),
            house_wallet: config.house_wallet.clone(),
        })
    }

    async fn rpc_call(&self, method: &str, params: serde_json::Value) -> CasinoResult<serde_json::Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let envelope: RpcEnvelope = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CasinoError::ExternalVerification(format!("rpc send: {}", e)))?
            .json()
            .await
            .map_err(|e| CasinoError::ExternalVerification(format!("rpc decode: {}", e)))?;

        if let Some(error) = envelope.error {
            return Err(CasinoError::ExternalVerification(format!(
                "rpc error: {}",
                error
            )));
        }
        envelope
            .result
            .ok_or_else(|| CasinoError::ExternalVerification("rpc returned no result".into()))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn verify_deposit(&self, signature: &str) -> CasinoResult<VerifiedDeposit> {
        let result = self
            .rpc_call(
                "getTransaction",
                json!([signature, { "encoding": "jsonParsed", "commitment": "confirmed" }]),
            )
            .await?;
        if result.is_null() {
            return Err(CasinoError::ExternalVerification(format!(
                "transaction {} not found",
                signature
            )));
        }
        if result.pointer("/meta/err").map_or(false, |e| !e.is_null()) {
            return Err(CasinoError::ExternalVerification(format!(
                "transaction {} failed on chain",
                signature
            )));
        }

        // Scan parsed system transfers for lamports landing on the house
        // wallet. The RPC response is trusted; we only extract from it.
        let instructions = result
            .pointer("/transaction/message/instructions")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                CasinoError::ExternalVerification("transaction has no parsed instructions".into())
            })?;

        let mut amount: u64 = 0;
        let mut from_address = String::new();
        for instruction in instructions {
            let Some(info) = instruction.pointer("/parsed/info") else {
                continue;
            };
            let is_transfer = instruction.pointer("/parsed/type").and_then(|t| t.as_str())
                == Some("transfer");
            let to_house = info.pointer("/destination").and_then(|d| d.as_str())
                == Some(self.house_wallet.as_str());
            if is_transfer && to_house {
                amount += info.pointer("/lamports").and_then(|l| l.as_u64()).unwrap_or(0);
                if let Some(source) = info.pointer("/source").and_then(|s| s.as_str()) {
                    from_address = source.to_string();
                }
            }
        }

        if amount == 0 {
            return Err(CasinoError::ExternalVerification(format!(
                "transaction {} moved nothing to the house wallet",
                signature
            )));
        }

        Ok(VerifiedDeposit {
            signature: signature.to_string(),
            from_address,
            amount,
        })
    }

    async fn broadcast_withdrawal(&self, destination: &str, amount: u64) -> CasinoResult<String> {
        #[derive(Debug, Deserialize)]
        struct TransferResponse {
            signature: String,
        }

        let response: TransferResponse = self
            .http
            .post(format!("{}/transfer", self.treasury_url))
            .json(&json!({ "destination": destination, "lamports": amount }))
            .send()
            .await
            .map_err(|e| CasinoError::ExternalVerification(format!("treasury send: {}", e)))?
            .json()
            .await
            .map_err(|e| CasinoError::ExternalVerification(format!("treasury decode: {}", e)))?;
        Ok(response.signature)
    }

    async fn confirm(&self, signature: &str) -> CasinoResult<ChainStatus> {
        let result = self
            .rpc_call("getSignatureStatuses", json!([[signature]]))
            .await?;
        let Some(status) = result.pointer("/value/0") else {
            return Ok(ChainStatus::NotFound);
        };
        if status.is_null() {
            return Ok(ChainStatus::NotFound);
        }
        if status.pointer("/err").map_or(false, |e| !e.is_null()) {
            return Ok(ChainStatus::Failed);
        }
        let confirmed = matches!(
            status
                .pointer("/confirmationStatus")
                .and_then(|s| s.as_str()),
            Some("confirmed") | Some("finalized")
        );
        Ok(if confirmed {
            ChainStatus::Confirmed
        } else {
            ChainStatus::NotFound
        })
    }
}

/// Scriptable in-memory chain double for tests and local development.
pub mod mock {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    pub struct MockChainClient {
        deposits: DashMap<String, VerifiedDeposit>,
        statuses: DashMap<String, ChainStatus>,
        broadcast_counter: AtomicU64,
        /// When set, broadcasts fail with this message.
        pub broadcast_error: Option<String>,
        /// When set, confirmations error instead of answering.
        pub confirm_unavailable: bool,
    }

    impl MockChainClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a deposit signature the mock chain will verify.
        pub fn seed_deposit(&self, signature: &str, from: &str, amount: u64) {
            self.deposits.insert(
                signature.to_string(),
                VerifiedDeposit {
                    signature: signature.to_string(),
                    from_address: from.to_string(),
                    amount,
                },
            );
        }

        /// Force the confirmation answer for a signature.
        pub fn set_status(&self, signature: &str, status: ChainStatus) {
            self.statuses.insert(signature.to_string(), status);
        }
    }

    #[async_trait]
    impl ChainClient for MockChainClient {
        async fn verify_deposit(&self, signature: &str) -> CasinoResult<VerifiedDeposit> {
            self.deposits
                .get(signature)
                .map(|entry| entry.clone())
                .ok_or_else(|| {
                    CasinoError::ExternalVerification(format!(
                        "transaction {} not found",
                        signature
                    ))
                })
        }

        async fn broadcast_withdrawal(
            &self,
            _destination: &str,
            _amount: u64,
        ) -> CasinoResult<String> {
            if let Some(message) = &self.broadcast_error {
                return Err(CasinoError::ExternalVerification(message.clone()));
            }
            let n = self.broadcast_counter.fetch_add(1, Ordering::SeqCst);
            let signature = format!("mock-withdrawal-{}", n);
            self.statuses
                .insert(signature.clone(), ChainStatus::Confirmed);
            Ok(signature)
        }

        async fn confirm(&self, signature: &str) -> CasinoResult<ChainStatus> {
            if self.confirm_unavailable {
                return Err(CasinoError::ExternalVerification(
                    "chain unavailable".into(),
                ));
            }
            Ok(self
                .statuses
                .get(signature)
                .map(|entry| *entry)
                .unwrap_or(ChainStatus::NotFound))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockChainClient;
    use super::*;

    #[tokio::test]
    async fn test_mock_verifies_seeded_deposit() {
        let chain = MockChainClient::new();
        chain.seed_deposit("sig-1", "player-wallet", 5_000_000);
        let verified = chain.verify_deposit("sig-1").await.unwrap();
        assert_eq!(verified.amount, 5_000_000);

        let err = chain.verify_deposit("sig-unknown").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_mock_broadcast_confirms() {
        let chain = MockChainClient::new();
        let signature = chain.broadcast_withdrawal("dest", 1_000).await.unwrap();
        assert_eq!(chain.confirm(&signature).await.unwrap(), ChainStatus::Confirmed);
        assert_eq!(
            chain.confirm("never-sent").await.unwrap(),
            ChainStatus::NotFound
        );
    }
}
