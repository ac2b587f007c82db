//! Configuration: settings struct and file manager.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    DiscoverySettings, DispatchSettings, PathSettings, PoolSettings, ReviewSettings, Settings,
    OUTPUT_ROOT_INDIR,
};
