// Shield implementations
// Decision: The shield is picked once at startup from SHIELD_MODE ("enforce" or "skip")
// Decision: Faults inside a check become failed verdicts ("Shield error: ..."), never errors

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::ShieldConfig;
use crate::traits::{Shield, ShieldInput, ShieldVerdict};

/// How unsigned transactions are validated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShieldMode {
    /// Run the policy checks (default)
    #[default]
    Enforce,
    /// Approve everything
    Skip,
}

impl std::str::FromStr for ShieldMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "enforce" => Ok(ShieldMode::Enforce),
            "skip" => Ok(ShieldMode::Skip),
            other => Err(format!(
                "unknown shield mode '{}'. Use 'enforce' or 'skip'",
                other
            )),
        }
    }
}

/// Create the shield selected by configuration
pub fn create_shield(config: &ShieldConfig) -> Arc<dyn Shield> {
    match config.mode {
        ShieldMode::Skip => {
            tracing::warn!("Shield running in skip mode: all transactions are approved");
            Arc::new(NoopShield)
        }
        ShieldMode::Enforce => Arc::new(PolicyShield::new(
            config.allowed_chain_ids.clone(),
            config.supported_yields.clone(),
        )),
    }
}

/// Shield used in skip mode
#[derive(Debug, Clone, Default)]
pub struct NoopShield;

#[async_trait]
impl Shield for NoopShield {
    async fn validate(&self, _input: ShieldInput<'_>) -> ShieldVerdict {
        ShieldVerdict::pass()
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Structural policy checks on EVM-style unsigned transactions
#[derive(Debug, Clone, Default)]
pub struct PolicyShield {
    allowed_chain_ids: Vec<u64>,
    supported_yields: Vec<String>,
}

impl PolicyShield {
    pub fn new(allowed_chain_ids: Vec<u64>, supported_yields: Vec<String>) -> Self {
        Self {
            allowed_chain_ids,
            supported_yields,
        }
    }

    /// Whether a yield may be used at all
    pub fn is_supported(&self, yield_id: &str) -> bool {
        self.supported_yields.is_empty() || self.supported_yields.iter().any(|y| y == yield_id)
    }

    /// Ok(None) passes, Ok(Some(reason)) is a violation, Err is a fault in the check itself
    fn check(&self, input: &ShieldInput<'_>) -> anyhow::Result<Option<String>> {
        if !self.is_supported(input.yield_id) {
            return Ok(Some(format!("Yield {} is not supported", input.yield_id)));
        }

        let decoded;
        let tx: &Map<String, Value> = match input.unsigned_transaction {
            Value::Object(map) => map,
            Value::String(raw) => {
                decoded = serde_json::from_str::<Value>(raw)
                    .map_err(|e| anyhow::anyhow!("failed to decode transaction: {}", e))?;
                match &decoded {
                    Value::Object(map) => map,
                    _ => return Ok(Some("Unsigned transaction is not an object".to_string())),
                }
            }
            _ => return Ok(Some("Unsigned transaction is not an object".to_string())),
        };

        match tx.get("to").and_then(Value::as_str) {
            Some(to) if is_address(to) => {}
            Some(to) => return Ok(Some(format!("Invalid target address: {}", to))),
            None => return Ok(Some("Missing target address".to_string())),
        }

        match tx.get("data").and_then(Value::as_str) {
            Some(data) if is_hex_data(data) => {}
            Some(_) => return Ok(Some("Calldata is not valid hex".to_string())),
            None => return Ok(Some("Missing calldata".to_string())),
        }

        if let Some(from) = tx.get("from") {
            let matches = from
                .as_str()
                .is_some_and(|from| from.eq_ignore_ascii_case(input.user_address));
            if !matches {
                return Ok(Some(
                    "Transaction sender does not match user address".to_string(),
                ));
            }
        }

        if let Some(value) = tx.get("value") {
            if parse_quantity(value).is_none() {
                return Ok(Some(format!("Invalid transaction value: {}", value)));
            }
        }

        if !self.allowed_chain_ids.is_empty() {
            if let Some(chain_id) = tx.get("chainId") {
                match parse_quantity(chain_id).and_then(|id| u64::try_from(id).ok()) {
                    Some(id) if self.allowed_chain_ids.contains(&id) => {}
                    Some(id) => return Ok(Some(format!("Chain {} is not allowed", id))),
                    None => return Ok(Some(format!("Invalid chain id: {}", chain_id))),
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl Shield for PolicyShield {
    async fn validate(&self, input: ShieldInput<'_>) -> ShieldVerdict {
        match self.check(&input) {
            Ok(None) => ShieldVerdict::pass(),
            Ok(Some(reason)) => {
                tracing::debug!(yield_id = %input.yield_id, reason = %reason, "Shield rejected transaction");
                ShieldVerdict::fail(reason)
            }
            Err(e) => {
                tracing::warn!(yield_id = %input.yield_id, "Shield check fault: {}", e);
                ShieldVerdict::fail(format!("Shield error: {}", e))
            }
        }
    }

    fn name(&self) -> &'static str {
        "policy"
    }
}

fn is_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_hex_data(s: &str) -> bool {
    s.strip_prefix("0x")
        .is_some_and(|hex| hex.len() % 2 == 0 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Non-negative integer as a JSON number, decimal string, or 0x hex string
fn parse_quantity(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) if !hex.is_empty() => u128::from_str_radix(hex, 16).ok(),
            Some(_) => None,
            None if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => s.parse().ok(),
            None => None,
        },
        _ => None,
    }
}
