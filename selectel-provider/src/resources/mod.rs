//! Resource type definitions and the handlers behind them
//!
//! Every handler follows the same shape: lock what needs locking, call the
//! API, wait for the object to settle, then read it back into a [`State`].

pub mod dbaas_extension;
pub mod vpc_floatingip;
pub mod vpc_license;

use std::collections::HashMap;
use std::time::Duration;

use selectel_core::provider::{ProviderError, ProviderResult, ResourceType, Timeouts};
use selectel_core::resource::{Resource, State, Value};

use crate::api::Server;

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
        }
    };
    ($name:ident, $type_name:expr, $timeouts:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn timeouts(&self) -> Timeouts {
                $timeouts
            }
        }
    };
}

define_resource_type!(
    DbaasExtensionType,
    dbaas_extension::RESOURCE_TYPE,
    dbaas_extension::TIMEOUTS
);
define_resource_type!(VpcFloatingIpType, vpc_floatingip::RESOURCE_TYPE);
define_resource_type!(VpcLicenseType, vpc_license::RESOURCE_TYPE);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(DbaasExtensionType),
        Box::new(VpcFloatingIpType),
        Box::new(VpcLicenseType),
    ]
}

/// Default timeouts of a resource type by name
pub fn timeouts_for(resource_type: &str) -> Option<Timeouts> {
    resource_types()
        .into_iter()
        .find(|t| t.name() == resource_type)
        .map(|t| t.timeouts())
}

/// A required string attribute of the desired configuration
pub(crate) fn required_str(resource: &Resource, key: &str) -> ProviderResult<String> {
    resource
        .get_str(key)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::new(format!("{} is required", key)).for_resource(resource.id.clone())
        })
}

/// A required string attribute of a known state
pub(crate) fn state_str(state: &State, key: &str) -> ProviderResult<String> {
    state.get_str(key).map(str::to_string).ok_or_else(|| {
        ProviderError::new(format!("{} is missing from state", key)).for_resource(state.id.clone())
    })
}

/// Attached servers as a list of maps
pub(crate) fn servers_value(servers: &[Server]) -> Value {
    Value::List(
        servers
            .iter()
            .map(|server| {
                let mut map = HashMap::new();
                map.insert("id".to_string(), Value::String(server.id.clone()));
                map.insert("name".to_string(), Value::String(server.name.clone()));
                map.insert("status".to_string(), Value::String(server.status.clone()));
                Value::Map(map)
            })
            .collect(),
    )
}

/// Optional string fields are stored as empty strings, like computed
/// attributes that the API left unset
pub(crate) fn optional_value(value: &Option<String>) -> Value {
    Value::String(value.clone().unwrap_or_default())
}

pub(crate) const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use selectel_core::provider::DEFAULT_OPERATION_TIMEOUT;

    #[test]
    fn test_resource_type_names() {
        let names: Vec<&str> = resource_types().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "selectel_dbaas_extension_v1",
                "selectel_vpc_floatingip_v2",
                "selectel_vpc_license_v2",
            ]
        );
    }

    #[test]
    fn test_timeouts_for() {
        assert_eq!(
            timeouts_for("selectel_dbaas_extension_v1"),
            Some(Timeouts::uniform(minutes(60)))
        );
        assert_eq!(
            timeouts_for("selectel_vpc_license_v2"),
            Some(Timeouts::uniform(DEFAULT_OPERATION_TIMEOUT))
        );
        assert_eq!(timeouts_for("selectel_mks_cluster_v1"), None);
    }

    #[test]
    fn test_required_str() {
        let resource = Resource::new("selectel_vpc_license_v2", "win")
            .with_attribute("region", "ru-2")
            .with_attribute("type", "");

        assert_eq!(required_str(&resource, "region").unwrap(), "ru-2");
        assert_eq!(
            required_str(&resource, "type").unwrap_err().to_string(),
            "[selectel_vpc_license_v2.win] type is required"
        );
    }

    #[test]
    fn test_servers_value() {
        let servers = vec![Server {
            id: "srv-1".to_string(),
            name: "web".to_string(),
            status: "ACTIVE".to_string(),
        }];

        let Value::List(items) = servers_value(&servers) else {
            panic!("Expected list");
        };
        let Value::Map(map) = &items[0] else {
            panic!("Expected map");
        };
        assert_eq!(map.get("name"), Some(&Value::String("web".to_string())));
    }
}
