//! Log messages and error constructors shared by the handlers

use selectel_core::provider::ProviderError;
use serde::Serialize;

pub const OBJECT_EXTENSION: &str = "extension";
pub const OBJECT_FLOATING_IP: &str = "floating IP";
pub const OBJECT_LICENSE: &str = "license";

pub fn msg_create(object: &str, opts: &impl Serialize) -> String {
    let opts = serde_json::to_string(opts).unwrap_or_else(|e| format!("<unserializable: {}>", e));
    format!("creating {} with options: {}", object, opts)
}

pub fn msg_get(object: &str, id: &str) -> String {
    format!("getting {} '{}'", object, id)
}

pub fn msg_delete(object: &str, id: &str) -> String {
    format!("deleting {} '{}'", object, id)
}

pub fn err_creating_object<E>(object: &str, err: E) -> ProviderError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ProviderError::new(format!("error creating {}: {}", object, err)).with_cause(err)
}

pub fn err_getting_object<E>(object: &str, id: &str, err: E) -> ProviderError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ProviderError::new(format!("error getting {} '{}': {}", object, id, err)).with_cause(err)
}

pub fn err_deleting_object<E>(object: &str, id: &str, err: E) -> ProviderError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ProviderError::new(format!("error deleting {} '{}': {}", object, id, err)).with_cause(err)
}

pub fn err_read_from_response(object: &str) -> ProviderError {
    ProviderError::new(format!("error reading {} from response", object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, FloatingIpOpts};

    #[test]
    fn test_msg_create_includes_options() {
        let opts = FloatingIpOpts {
            region: "ru-3".to_string(),
            quantity: 1,
        };
        assert_eq!(
            msg_create(OBJECT_FLOATING_IP, &opts),
            r#"creating floating IP with options: {"region":"ru-3","quantity":1}"#
        );
    }

    #[test]
    fn test_error_messages() {
        let err = err_getting_object(OBJECT_LICENSE, "42", ApiError::status(500, "boom"));
        assert_eq!(
            err.to_string(),
            "error getting license '42': request failed with status 500: boom"
        );
        assert!(err.cause.is_some());

        let err = err_read_from_response(OBJECT_FLOATING_IP);
        assert_eq!(err.to_string(), "error reading floating IP from response");
    }
}
