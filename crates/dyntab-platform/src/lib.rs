//! Platform descriptions in TOML.
//!
//! A [`PlatformConfig`] lists the tables to build and the hardware objects
//! they are built from. Applying it to a [`ConfigurationManager`]
//! (directly, or through a ready-callback) fills the repository the table
//! generators read.
//!
//! IORT nodes are named in the file. Each name is mapped to a fresh token
//! from the manager's allocator, and every reference is checked before
//! anything is written.
//!
//! [`ConfigurationManager`]: dyntab_repo::ConfigurationManager

pub mod config;
pub mod error;
pub mod populate;

pub use config::{
    DeviceHandleConfig, GenericInitiatorConfig, IdMappingConfig, ItsGroupConfig, ManagerConfig,
    NamedComponentConfig, PlatformConfig, PmcgConfig, RootComplexConfig, SmmuV1V2Config,
    SmmuV3Config, TableConfig,
};
pub use error::{PlatformError, PlatformResult};
