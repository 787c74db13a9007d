//! Configuration types and loading.

mod settings;

pub use settings::{
    CollectionConfig, ConcurrencyConfig, ConductorConfig, NotificationConfig, StatsConfig,
};
