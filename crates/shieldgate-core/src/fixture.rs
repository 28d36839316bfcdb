// Deterministic action source for local development and tests
//
// Always proposes the same two-step EVM plan (approve, then enter) on Sepolia,
// echoing the requested yield id.

use async_trait::async_trait;
use serde_json::json;

use crate::error::UpstreamError;
use crate::traits::{ActionPlan, ActionRequest, ActionSource, CandidateTransaction};

const NETWORK: &str = "eip155:11155111";
const CHAIN_ID: u64 = 11_155_111;
const TOKEN_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
const VAULT_ADDRESS: &str = "0x2222222222222222222222222222222222222222";
const APPROVE_DATA: &str = "0x095ea7b30000000000000000000000002222222222222222222222222222222222222222ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
const ENTER_DATA: &str =
    "0xa59f3e0c0000000000000000000000000000000000000000000000000000000000000001";

#[derive(Debug, Clone, Default)]
pub struct FixtureActionSource;

impl FixtureActionSource {
    pub fn new() -> Self {
        Self
    }
}

fn eip1559_tx(to: &str, data: &str, gas_limit: &str, nonce: u64) -> serde_json::Value {
    json!({
        "to": to,
        "data": data,
        "value": "0",
        "gasLimit": gas_limit,
        "nonce": nonce,
        "chainId": CHAIN_ID,
        "type": 2,
        "maxFeePerGas": "30000000000",
        "maxPriorityFeePerGas": "1000000000",
    })
}

#[async_trait]
impl ActionSource for FixtureActionSource {
    async fn create_action(&self, request: &ActionRequest) -> Result<ActionPlan, UpstreamError> {
        Ok(ActionPlan {
            yield_id: request.yield_id.clone(),
            transactions: vec![
                CandidateTransaction {
                    id: None,
                    step_index: 0,
                    network: NETWORK.to_string(),
                    title: "approve".to_string(),
                    unsigned_transaction: eip1559_tx(TOKEN_ADDRESS, APPROVE_DATA, "60000", 0),
                    structured_transaction: None,
                    annotated_transaction: None,
                    is_message: false,
                },
                CandidateTransaction {
                    id: None,
                    step_index: 1,
                    network: NETWORK.to_string(),
                    title: "enter".to_string(),
                    unsigned_transaction: eip1559_tx(VAULT_ADDRESS, ENTER_DATA, "120000", 1),
                    structured_transaction: None,
                    annotated_transaction: None,
                    is_message: false,
                },
            ],
        })
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
