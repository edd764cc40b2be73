//! Selectel Provider
//!
//! Resource handlers for Selectel cloud objects, driven through the
//! [`Provider`] trait from selectel-core.
//!
//! ## Module Structure
//!
//! - `config` - Provider configuration from the environment or JSON
//! - `api` - Client traits and wire models for the vendor APIs
//! - `resources` - Resource type definitions and per-type handlers
//! - `provider` - SelectelProvider, routing calls to the handlers
//! - `messages` - Shared log and error wording

pub mod api;
pub mod config;
pub mod messages;
pub mod provider;
pub mod resources;

#[cfg(test)]
mod testing;

// Re-export main types
pub use config::{Config, ConfigError};
pub use provider::{Clients, SelectelProvider};

use selectel_core::provider::{
    BoxFuture, OperationContext, Provider, ProviderResult, ResourceType,
};
use selectel_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for SelectelProvider {
    fn name(&self) -> &'static str {
        "selectel"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let ctx = ctx.clone();
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.read_resource(&ctx, &id, &identifier).await })
    }

    fn create(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let ctx = ctx.clone();
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&ctx, &resource).await })
    }

    fn update(
        &self,
        _ctx: &OperationContext,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&from, &to).await })
    }

    fn delete(&self, ctx: &OperationContext, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let ctx = ctx.clone();
        let state = state.clone();
        Box::pin(async move { self.delete_resource(&ctx, &state).await })
    }

    fn import(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let ctx = ctx.clone();
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.import_resource(&ctx, &id, &identifier).await })
    }
}
