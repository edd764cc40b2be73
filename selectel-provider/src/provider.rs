//! Selectel Provider
//!
//! Owns one handler per resource type and routes host calls to them by
//! resource type name. All handlers that need named locks share a single
//! [`MutexKv`], so two resources touching the same datastore serialize
//! even when they are different resource types.

use std::sync::Arc;

use log::info;
use selectel_core::mutex_kv::MutexKv;
use selectel_core::provider::{OperationContext, ProviderError, ProviderResult};
use selectel_core::resource::{Resource, ResourceId, State};

use crate::api::{DbaasApi, ResellApi};
use crate::config::{Config, ConfigError};
use crate::resources::dbaas_extension::{self, ExtensionHandler};
use crate::resources::vpc_floatingip::{self, FloatingIpHandler};
use crate::resources::vpc_license::{self, LicenseHandler};

/// API clients the provider talks through
#[derive(Clone)]
pub struct Clients {
    pub dbaas: Arc<dyn DbaasApi>,
    pub resell: Arc<dyn ResellApi>,
}

pub struct SelectelProvider {
    config: Arc<Config>,
    locks: MutexKv,
    extensions: ExtensionHandler,
    floating_ips: FloatingIpHandler,
    licenses: LicenseHandler,
}

impl SelectelProvider {
    /// Validate the configuration and build the handlers
    pub fn new(mut config: Config, clients: Clients) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "configured Selectel provider for endpoint {} (region: {})",
            config.auth_url,
            config.region.as_deref().unwrap_or("unset")
        );

        let config = Arc::new(config);
        let locks = MutexKv::new();
        Ok(Self {
            extensions: ExtensionHandler::new(clients.dbaas, config.clone(), locks.clone()),
            floating_ips: FloatingIpHandler::new(clients.resell.clone(), &config),
            licenses: LicenseHandler::new(clients.resell, &config),
            config,
            locks,
        })
    }

    /// Replace the lock table, e.g. with one shared by several providers
    /// in the same process
    pub fn with_mutex_kv(mut self, locks: MutexKv) -> Self {
        self.extensions.locks = locks.clone();
        self.locks = locks;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mutex_kv(&self) -> &MutexKv {
        &self.locks
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn read_resource(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        match id.resource_type.as_str() {
            dbaas_extension::RESOURCE_TYPE => self.extensions.read(ctx, id, identifier).await,
            vpc_floatingip::RESOURCE_TYPE => self.floating_ips.read(ctx, id, identifier).await,
            vpc_license::RESOURCE_TYPE => self.licenses.read(ctx, id, identifier).await,
            _ => Err(unknown_resource_type(id)),
        }
    }

    pub async fn create_resource(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> ProviderResult<State> {
        match resource.id.resource_type.as_str() {
            dbaas_extension::RESOURCE_TYPE => self.extensions.create(ctx, resource).await,
            vpc_floatingip::RESOURCE_TYPE => self.floating_ips.create(ctx, resource).await,
            vpc_license::RESOURCE_TYPE => self.licenses.create(ctx, resource).await,
            _ => Err(unknown_resource_type(&resource.id)),
        }
    }

    pub async fn update_resource(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        if from.id != to.id {
            return Err(ProviderError::new(format!(
                "cannot update {} from the state of {}",
                to.id, from.id
            ))
            .for_resource(to.id.clone()));
        }

        match from.id.resource_type.as_str() {
            dbaas_extension::RESOURCE_TYPE => self.extensions.update(from).await,
            vpc_floatingip::RESOURCE_TYPE => self.floating_ips.update(from).await,
            vpc_license::RESOURCE_TYPE => self.licenses.update(from).await,
            _ => Err(unknown_resource_type(&from.id)),
        }
    }

    pub async fn delete_resource(
        &self,
        ctx: &OperationContext,
        state: &State,
    ) -> ProviderResult<()> {
        match state.id.resource_type.as_str() {
            dbaas_extension::RESOURCE_TYPE => self.extensions.delete(ctx, state).await,
            vpc_floatingip::RESOURCE_TYPE => self.floating_ips.delete(ctx, state).await,
            vpc_license::RESOURCE_TYPE => self.licenses.delete(ctx, state).await,
            _ => Err(unknown_resource_type(&state.id)),
        }
    }

    pub async fn import_resource(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        match id.resource_type.as_str() {
            dbaas_extension::RESOURCE_TYPE => self.extensions.import(ctx, id, identifier).await,
            vpc_floatingip::RESOURCE_TYPE => self.floating_ips.import(ctx, id, identifier).await,
            vpc_license::RESOURCE_TYPE => self.licenses.import(ctx, id, identifier).await,
            _ => Err(unknown_resource_type(id)),
        }
    }
}

fn unknown_resource_type(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}
