// Yield API action source
//
// YieldClient speaks the upstream REST API (yield lookup plus enter/exit/manage
// actions). YieldActionSource adapts it to the core ActionSource contract and
// normalises the returned transactions.

mod client;
mod provider;
mod types;

pub use client::YieldClient;
pub use provider::YieldActionSource;
pub use types::{YieldActionBody, YieldActionResponse, YieldTransaction};
