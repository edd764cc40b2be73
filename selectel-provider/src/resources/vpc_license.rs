//! selectel_vpc_license_v2 - Software license bought for a project

use std::sync::Arc;

use log::debug;
use selectel_core::provider::{
    OperationContext, ProviderError, ProviderResult, require_identifier,
};
use selectel_core::resource::{Resource, ResourceId, State};
use selectel_core::retry::{RetryPolicy, retry_transient};

use crate::api::{License, LicenseOpts, ResellApi};
use crate::config::Config;
use crate::messages::{
    OBJECT_LICENSE, err_creating_object, err_deleting_object, err_getting_object,
    err_read_from_response, msg_create, msg_delete, msg_get,
};
use crate::resources::{optional_value, required_str, servers_value};

pub const RESOURCE_TYPE: &str = "selectel_vpc_license_v2";

pub struct LicenseHandler {
    api: Arc<dyn ResellApi>,
    retry: RetryPolicy,
}

impl LicenseHandler {
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
        let opts = [LicenseOpts {
            region: required_str(resource, "region")?,
            license_type: required_str(resource, "type")?,
            quantity: 1,
        }];

        debug!("{}", msg_create(OBJECT_LICENSE, &opts));
        let licenses = self
            .api
            .create_licenses(&project_id, &opts)
            .await
            .map_err(|e| {
                err_creating_object(OBJECT_LICENSE, e).for_resource(resource.id.clone())
            })?;

        let [license] = licenses.as_slice() else {
            return Err(err_read_from_response(OBJECT_LICENSE).for_resource(resource.id.clone()));
        };

        self.read(ctx, &resource.id, &license.id.to_string()).await
    }

    /// Returns a not-found state once the license is gone
    pub async fn read(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        debug!("{}", msg_get(OBJECT_LICENSE, identifier));
        let result = retry_transient(&self.retry, ctx.cancellation(), move || {
            self.api.license(identifier)
        })
        .await;

        match result {
            Ok(license) => Ok(license_state(id, license)),
            Err(e) if e.is_not_found() => Ok(State::not_found(id.clone())),
            Err(e) => {
                Err(err_getting_object(OBJECT_LICENSE, identifier, e).for_resource(id.clone()))
            }
        }
    }

    pub async fn update(&self, from: &State) -> ProviderResult<State> {
        Err(ProviderError::new(
            "license cannot be updated in place; every argument forces replacement",
        )
        .for_resource(from.id.clone()))
    }

    /// Deleting a license that is already gone succeeds
    pub async fn delete(&self, _ctx: &OperationContext, state: &State) -> ProviderResult<()> {
        let identifier = require_identifier(state)?;

        debug!("{}", msg_delete(OBJECT_LICENSE, identifier));
        match self.api.delete_license(identifier).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(err_deleting_object(OBJECT_LICENSE, identifier, e)
                .for_resource(state.id.clone())),
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
                OBJECT_LICENSE, identifier
            ))
            .for_resource(id.clone()));
        }
        Ok(state)
    }
}

fn license_state(id: &ResourceId, license: License) -> State {
    State::existing(id.clone(), Default::default())
        .with_identifier(license.id.to_string())
        .with_attribute("project_id", license.project_id)
        .with_attribute("region", license.region)
        .with_attribute("type", license.license_type)
        .with_attribute("status", license.status)
        .with_attribute("network_id", optional_value(&license.network_id))
        .with_attribute("subnet_id", optional_value(&license.subnet_id))
        .with_attribute("port_id", optional_value(&license.port_id))
        .with_attribute("servers", servers_value(&license.servers))
}
