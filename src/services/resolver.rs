//! Model resolver
//!
//! Maps a logical model reference to a concrete backend binding. The
//! precedence is strict: explicit binding id, then binding key, then
//! backend model name. The first identifier present is authoritative;
//! lower-precedence identifiers are ignored even if resolution by the
//! higher one fails, so callers never silently fall back.

use crate::config::GatewayConfig;
use crate::models::api::ModelRef;
use crate::models::canonical::ModelBinding;
use crate::utils::error::{GatewayError, GatewayResult};
use std::sync::Arc;
use tracing::debug;

/// Resolves model references against the binding store
#[derive(Debug, Clone)]
pub struct ModelResolver {
    config: Arc<GatewayConfig>,
}

impl ModelResolver {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self { config }
    }

    /// Resolve a reference to its binding
    pub fn resolve(&self, reference: &ModelRef) -> GatewayResult<ModelBinding> {
        if let Some(id) = &reference.id {
            return self
                .config
                .get_by_id(id)
                .inspect(|binding| debug!("resolved id '{}' to binding '{}'", id, binding.key))
                .ok_or_else(|| GatewayError::ModelNotConfigured(id.clone()));
        }

        if let Some(key) = &reference.key {
            return self
                .config
                .get_by_key(key)
                .inspect(|binding| debug!("resolved key '{}' to binding '{}'", key, binding.id))
                .ok_or_else(|| GatewayError::ModelNotConfigured(key.clone()));
        }

        if let Some(name) = &reference.name {
            return self
                .config
                .get_by_name(name)
                .inspect(|binding| debug!("resolved name '{}' to binding '{}'", name, binding.key))
                .ok_or_else(|| GatewayError::ModelNotConfigured(name.clone()));
        }

        Err(GatewayError::InvalidRequest(
            "no model reference supplied".to_string(),
        ))
    }
}
