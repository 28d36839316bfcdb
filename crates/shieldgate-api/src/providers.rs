// Collaborator selection at startup
// Decision: The fixture and live action sources are chosen once from config,
//           never swapped at runtime

use anyhow::{Context, Result};
use shieldgate_core::{
    create_shield, ActionSource, AppConfig, FixtureActionSource, LocalSigner, Shield, Signer,
};
use shieldgate_yield::{YieldActionSource, YieldClient};
use std::sync::Arc;

pub fn create_action_source(config: &AppConfig) -> Result<Arc<dyn ActionSource>> {
    if config.use_mock_provider {
        tracing::info!("Using fixture action source");
        return Ok(Arc::new(FixtureActionSource::new()));
    }

    let client = YieldClient::new(
        &config.yield_base_url,
        config.yield_api_key.clone().unwrap_or_default(),
        config.upstream_timeout,
    )
    .context("Failed to create yield API client")?;
    tracing::info!(
        base_url = %config.yield_base_url,
        timeout_ms = config.upstream_timeout.as_millis() as u64,
        "Using yield API action source"
    );
    Ok(Arc::new(YieldActionSource::new(client)))
}

pub fn create_shield_for(config: &AppConfig) -> Arc<dyn Shield> {
    let shield = create_shield(&config.shield);
    tracing::info!(shield = shield.name(), mode = ?config.shield.mode, "Shield configured");
    shield
}

pub fn create_signer(config: &AppConfig) -> Result<Arc<dyn Signer>> {
    let signer = LocalSigner::from_config(config.signer_private_key.as_deref())
        .context("Invalid signer configuration")?;
    match signer.address() {
        Some(address) => tracing::info!(address = %address, "Local signer configured"),
        None => tracing::warn!("SIGNER_PRIVATE_KEY not set; signing requests will fail"),
    }
    Ok(Arc::new(signer))
}
