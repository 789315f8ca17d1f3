//! Storage driver loading and registration.
//!
//! Driver implementations register themselves at compile time using
//! `inventory::submit!`, keyed by their technology tag. [`load`] looks the
//! tag up and hands the factory everything it needs, bundled in a
//! [`DriverSetup`]: the pool's name and config, a logging span carrying
//! `{driver, pool}` context, the volume-ID resolution callback bound to
//! the pool's catalog identifier, and the shared volume validation rules.

pub mod interface;
pub mod mock;
pub mod volume;

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{StorageError, StorageResult};
use crate::state::DaemonState;

pub use interface::Driver;
pub use mock::MockDriver;
pub use volume::{ContentType, Volume, VolumeType};

/// Callback resolving a volume's catalog ID from its type and (possibly
/// project-prefixed) name. Bound to one pool's catalog identifier at
/// driver-load time; drivers can invoke it without any catalog access of
/// their own.
pub type VolumeIdResolver = Arc<dyn Fn(VolumeType, &str) -> StorageResult<i64> + Send + Sync>;

/// Validator applied to a single volume config value.
pub type ConfigValidator = fn(&str) -> StorageResult<()>;

/// Per-key validators for volume config, shared across drivers.
#[derive(Clone, Default)]
pub struct ValidationRules {
    rules: HashMap<&'static str, ConfigValidator>,
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, key: &'static str, validator: ConfigValidator) -> Self {
        self.rules.insert(key, validator);
        self
    }

    /// Validate every config key that has a registered rule. Keys without
    /// a rule are left to the driver.
    pub fn validate(&self, config: &HashMap<String, String>) -> StorageResult<()> {
        for (key, value) in config {
            if let Some(validator) = self.rules.get(key.as_str()) {
                validator(value).map_err(|err| {
                    StorageError::InvalidArgument(format!("config key '{key}': {err}"))
                })?;
            }
        }
        Ok(())
    }
}

/// Everything a driver factory needs to bind an instance to one pool.
pub struct DriverSetup {
    /// Shared daemon context.
    pub state: Arc<DaemonState>,
    /// Name of the pool this instance is being loaded for.
    pub pool_name: String,
    /// The pool's persisted driver configuration.
    pub config: HashMap<String, String>,
    /// Logging span carrying `{driver, pool}` fields.
    pub span: tracing::Span,
    /// Volume-ID resolution callback bound to the pool's catalog ID.
    pub vol_id_resolver: VolumeIdResolver,
    /// Shared volume config validation rules.
    pub rules: ValidationRules,
}

/// Factory function signature registered per driver technology.
pub type DriverFactoryFn = fn(DriverSetup) -> StorageResult<Box<dyn Driver>>;

/// Registration entry submitted by driver implementations via inventory.
pub struct DriverRegistration {
    pub tag: &'static str,
    pub factory: DriverFactoryFn,
}

inventory::collect!(DriverRegistration);

/// Load a driver instance for `tag`, bound to one pool.
pub fn load(
    state: Arc<DaemonState>,
    tag: &str,
    pool_name: &str,
    config: HashMap<String, String>,
    span: tracing::Span,
    vol_id_resolver: VolumeIdResolver,
    rules: ValidationRules,
) -> StorageResult<Box<dyn Driver>> {
    for registration in inventory::iter::<DriverRegistration> {
        if registration.tag == tag {
            tracing::debug!(driver = %tag, pool = %pool_name, "Loading storage driver");
            return (registration.factory)(DriverSetup {
                state,
                pool_name: pool_name.to_string(),
                config,
                span,
                vol_id_resolver,
                rules,
            });
        }
    }

    Err(StorageError::PoolLoad(format!(
        "driver '{}' is not registered. Available drivers: {:?}",
        tag,
        available_drivers()
    )))
}

/// List all registered driver technology tags.
pub fn available_drivers() -> Vec<&'static str> {
    inventory::iter::<DriverRegistration>
        .into_iter()
        .map(|r| r.tag)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::common_volume_rules;

    #[test]
    fn test_validation_rules_apply_to_known_keys() {
        let rules = common_volume_rules();

        let mut config = HashMap::new();
        config.insert("size".to_string(), "10GiB".to_string());
        config.insert("unrelated.key".to_string(), "anything".to_string());
        rules.validate(&config).unwrap();

        config.insert("size".to_string(), "lots".to_string());
        assert!(matches!(
            rules.validate(&config),
            Err(StorageError::InvalidArgument(_))
        ));
    }

}
