//! selectel_dbaas_extension_v1 - PostgreSQL extension in a DBaaS datastore
//!
//! Creating or deleting an extension reconfigures the datastore, and the
//! API rejects concurrent changes to one datastore or database. Both
//! mutations therefore hold the datastore and database locks until the
//! extension has settled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use selectel_core::mutex_kv::MutexKv;
use selectel_core::provider::{
    OperationContext, ProviderError, ProviderResult, Timeouts, require_identifier,
};
use selectel_core::resource::{Resource, ResourceId, State, Value};
use selectel_core::retry::{RetryPolicy, retry_transient};
use selectel_core::waiter::{StateChangeConf, WaitError, wait_for_state};

use crate::api::{ApiError, DbaasApi, Extension, ExtensionCreateOpts};
use crate::config::Config;
use crate::messages::{
    OBJECT_EXTENSION, err_creating_object, err_deleting_object, err_getting_object, msg_create,
    msg_delete, msg_get,
};
use crate::resources::{minutes, required_str, state_str};

pub const RESOURCE_TYPE: &str = "selectel_dbaas_extension_v1";

pub const TIMEOUTS: Timeouts = Timeouts::uniform(minutes(60));

pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const PENDING_STATUSES: [&str; 2] = ["PENDING_CREATE", "PENDING_UPDATE"];

/// Delete waits on the HTTP status of a read: 200 until the object is gone
const STATUS_PRESENT: &str = "200";
const STATUS_GONE: &str = "404";

const WAIT_DELAY: Duration = Duration::from_secs(10);
const WAIT_MIN_INTERVAL: Duration = Duration::from_secs(3);

pub struct ExtensionHandler {
    api: Arc<dyn DbaasApi>,
    config: Arc<Config>,
    pub(crate) locks: MutexKv,
    retry: RetryPolicy,
}

impl ExtensionHandler {
    pub fn new(api: Arc<dyn DbaasApi>, config: Arc<Config>, locks: MutexKv) -> Self {
        let retry = config.retry_policy();
        Self {
            api,
            config,
            locks,
            retry,
        }
    }

    pub async fn create(
        &self,
        ctx: &OperationContext,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let datastore_id = required_str(resource, "datastore_id")?;
        let database_id = required_str(resource, "database_id")?;
        let opts = ExtensionCreateOpts {
            available_extension_id: required_str(resource, "available_extension_id")?,
            datastore_id: datastore_id.clone(),
            database_id: database_id.clone(),
        };

        let _locks = self.locks.lock_all([datastore_id, database_id]).await;

        debug!("{}", msg_create(OBJECT_EXTENSION, &opts));
        let extension = self.api.create_extension(&opts).await.map_err(|e| {
            err_creating_object(OBJECT_EXTENSION, e).for_resource(resource.id.clone())
        })?;

        debug!(
            "waiting for extension {} to become '{}'",
            extension.id, STATUS_ACTIVE
        );
        let timeout = ctx.timeout_or(TIMEOUTS.create);
        self.wait_for_active(ctx, &extension.id, timeout)
            .await
            .map_err(|e| {
                err_creating_object(OBJECT_EXTENSION, e).for_resource(resource.id.clone())
            })?;

        let mut state = self.read(ctx, &resource.id, &extension.id).await?;
        for key in ["project_id", "region"] {
            if let Some(value) = resource.get_str(key) {
                state.attributes.insert(key.to_string(), Value::from(value));
            }
        }
        Ok(state)
    }

    /// A missing extension is an error, not a not-found state
    pub async fn read(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        debug!("{}", msg_get(OBJECT_EXTENSION, identifier));
        let extension = self.get(ctx, identifier).await.map_err(|e| {
            err_getting_object(OBJECT_EXTENSION, identifier, e).for_resource(id.clone())
        })?;

        Ok(extension_state(id, extension))
    }

    pub async fn update(&self, from: &State) -> ProviderResult<State> {
        Err(ProviderError::new(
            "extension cannot be updated in place; every argument forces replacement",
        )
        .for_resource(from.id.clone()))
    }

    pub async fn delete(&self, ctx: &OperationContext, state: &State) -> ProviderResult<()> {
        let identifier = require_identifier(state)?;
        let datastore_id = state_str(state, "datastore_id")?;
        let database_id = state_str(state, "database_id")?;

        let _locks = self.locks.lock_all([datastore_id, database_id]).await;

        debug!("{}", msg_delete(OBJECT_EXTENSION, identifier));
        self.api.delete_extension(identifier).await.map_err(|e| {
            err_deleting_object(OBJECT_EXTENSION, identifier, e).for_resource(state.id.clone())
        })?;

        let conf = StateChangeConf::new([STATUS_PRESENT], [STATUS_GONE])
            .with_timeout(ctx.timeout_or(TIMEOUTS.delete))
            .with_delay(WAIT_DELAY)
            .with_min_interval(WAIT_MIN_INTERVAL);

        debug!("waiting for extension {} to become deleted", identifier);
        wait_for_state(&conf, ctx.cancellation(), move || async move {
            match self.get(ctx, identifier).await {
                Ok(_) => Ok(STATUS_PRESENT),
                Err(e) if e.is_not_found() => Ok(STATUS_GONE),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| {
            ProviderError::new(format!(
                "error waiting for the extension {} to become deleted: {}",
                identifier, e
            ))
            .with_cause(e)
            .for_resource(state.id.clone())
        })?;

        Ok(())
    }

    /// Adopt an extension; the provider must know which project and region
    /// the imported object lives in
    pub async fn import(
        &self,
        ctx: &OperationContext,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let (project_id, region) = self
            .config
            .import_scope()
            .map_err(|e| ProviderError::new(e.to_string()).for_resource(id.clone()))?;

        Ok(self
            .read(ctx, id, identifier)
            .await?
            .with_attribute("project_id", project_id)
            .with_attribute("region", region))
    }

    async fn wait_for_active(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        timeout: Duration,
    ) -> Result<String, WaitError<ApiError>> {
        let conf = StateChangeConf::new(
            PENDING_STATUSES.map(String::from),
            [STATUS_ACTIVE.to_string()],
        )
        .with_timeout(timeout)
        .with_delay(WAIT_DELAY)
        .with_min_interval(WAIT_MIN_INTERVAL);

        wait_for_state(&conf, ctx.cancellation(), move || async move {
            self.get(ctx, identifier)
                .await
                .map(|extension| extension.status)
        })
        .await
    }

    async fn get(&self, ctx: &OperationContext, identifier: &str) -> Result<Extension, ApiError> {
        retry_transient(&self.retry, ctx.cancellation(), move || {
            self.api.extension(identifier)
        })
        .await
    }
}

fn extension_state(id: &ResourceId, extension: Extension) -> State {
    let mut attributes = HashMap::new();
    attributes.insert(
        "available_extension_id".to_string(),
        Value::String(extension.available_extension_id),
    );
    attributes.insert("datastore_id".to_string(), Value::String(extension.datastore_id));
    attributes.insert("database_id".to_string(), Value::String(extension.database_id));
    attributes.insert("status".to_string(), Value::String(extension.status));

    State::existing(id.clone(), attributes).with_identifier(extension.id)
}
