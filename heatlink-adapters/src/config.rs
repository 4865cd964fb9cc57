use heatlink_core::SourceDescriptor;
use heatlink_registry::AdapterError;
use serde::de::DeserializeOwned;

/// Parses a descriptor's adapter-opaque `config` blob into a typed record
/// once, at construction time — never read ad hoc at fetch time (§9).
pub fn parse_config<T: DeserializeOwned>(descriptor: &SourceDescriptor) -> Result<T, AdapterError> {
    serde_json::from_value(serde_json::Value::Object(descriptor.config.clone()))
        .map_err(|err| AdapterError::Internal(format!("invalid adapter config: {err}")))
}
