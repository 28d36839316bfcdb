// Yield API wire types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body for POST /v1/actions/{enter|exit|manage}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldActionBody<'a> {
    pub yield_id: &'a str,
    pub address: &'a str,
    pub arguments: &'a Value,
    /// Only sent for manage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'a str>,
    /// Only sent for manage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<&'a Value>,
}

/// Action response; optional fields are defaulted by the provider
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldActionResponse {
    #[serde(default)]
    pub yield_id: Option<String>,
    #[serde(default)]
    pub transactions: Vec<YieldTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldTransaction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub step_index: Option<i32>,
    pub network: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub unsigned_transaction: Value,
    #[serde(default)]
    pub structured_transaction: Option<Value>,
    #[serde(default)]
    pub annotated_transaction: Option<Value>,
    #[serde(default)]
    pub is_message: Option<bool>,
}
