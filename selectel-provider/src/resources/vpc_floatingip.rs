//! selectel_vpc_floatingip_v2 - Floating IP allocated to a project

use std::sync::Arc;

use log::debug;
use selectel_core::provider::{
    OperationContext, ProviderError, ProviderResult, require_identifier,
};
use selectel_core::resource::{Resource, ResourceId, State};
use selectel_core::retry::{RetryPolicy, retry_transient};

use crate::api::{FloatingIp, FloatingIpOpts, ResellApi};
use crate::config::Config;
use crate::messages::{
    OBJECT_FLOATING_IP, err_creating_object, err_deleting_object, err_getting_object,
    err_read_from_response, msg_create, msg_delete, msg_get,
};
use crate::resources::{optional_value, required_str, servers_value};

pub const RESOURCE_TYPE: &str = "selectel_vpc_floatingip_v2";

pub struct FloatingIpHandler {
    api: Arc<dyn ResellApi>,
    retry: RetryPolicy,
}

impl FloatingIpHandler {
    pub fn new(api: Arc<dyn ResellApi>, config: &Config) -> Self {
        Self {
            api,
            retry: config.retry_policy(),
        }
    }

    pub async fn create(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let project_id = required_str(resource, "project_id")?;
        let opts = [FloatingIpOpts {
            region: required_str(resource, "region")?,
            quantity: 1,
        }];

        debug!("{}", msg_create(OBJECT_FLOATING_IP, &opts));
        let floating_ips = self
            .api
            .create_floating_ips(&project_id, &opts)
            .await
            .map_err(|e| {
                err_creating_object(OBJECT_FLOATING_IP, e).for_resource(resource.id.clone())
            })?;

        let [floating_ip] = floating_ips.as_slice() else {
            return Err(
                err_read_from_response(OBJECT_FLOATING_IP).for_resource(resource.id.clone()),
            );
        };

        self.read(ctx, &resource.id, &floating_ip.id).await
    }

    /// Returns a not-found state once the floating IP is gone
    pub async fn read(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        debug!("{}", msg_get(OBJECT_FLOATING_IP, identifier));
        let result = retry_transient(&self.retry, ctx.cancellation(), move || {
            self.api.floating_ip(identifier)
        })
        .await;

        match result {
            Ok(floating_ip) => Ok(floating_ip_state(id, floating_ip)),
            Err(e) if e.is_not_found() => Ok(State::not_found(id.clone())),
            Err(e) => Err(
                err_getting_object(OBJECT_FLOATING_IP, identifier, e).for_resource(id.clone()),
            ),
        }
    }

    pub async fn update(&self, from: &State) -> ProviderResult<State> {
        Err(ProviderError::new(
            "floating IP cannot be updated in place; every argument forces replacement",
        )
        .for_resource(from.id.clone()))
    }

    /// Deleting a floating IP that is already gone succeeds
    pub async fn delete(&self, _ctx: &OperationContext, state: &State) -> ProviderResult<()> {
        let identifier = require_identifier(state)?;

        debug!("{}", msg_delete(OBJECT_FLOATING_IP, identifier));
        match self.api.delete_floating_ip(identifier).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(
                err_deleting_object(OBJECT_FLOATING_IP, identifier, e)
                    .for_resource(state.id.clone()),
            ),
        }
    }

    pub async fn import(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let state = self.read(ctx, id, identifier).await?;
        if !state.exists {
            return Err(ProviderError::new(format!(
                "cannot import non-existent {} '{}'",
                OBJECT_FLOATING_IP, identifier
            ))
            .for_resource(id.clone()));
        }
        Ok(state)
    }
}

fn floating_ip_state(id: &ResourceId, floating_ip: FloatingIp) -> State {
    State::existing(id.clone(), Default::default())
        .with_identifier(floating_ip.id.clone())
        .with_attribute("project_id", floating_ip.project_id)
        .with_attribute("region", floating_ip.region)
        .with_attribute("floating_ip_address", floating_ip.floating_ip_address)
        .with_attribute("fixed_ip_address", optional_value(&floating_ip.fixed_ip_address))
        .with_attribute("port_id", optional_value(&floating_ip.port_id))
        .with_attribute("status", floating_ip.status)
        .with_attribute("servers", servers_value(&floating_ip.servers))
}
