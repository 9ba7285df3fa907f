//! proplink — `${key}` property interpolation for launch-time configuration.
//!
//! ```text
//! config (overrides, .properties, .toml)
//!     → ConfigurationStore
//!     → interpolate::resolve (store first, EnvironmentFallback second)
//!     → settings (server / migration values read from the resolved store)
//! ```
//!
//! ```
//! use std::collections::HashMap;
//! use proplink::{ConfigurationStore, resolve};
//!
//! let mut store: ConfigurationStore = [
//!     ("data.dir", "${HOME}/qzui"),
//!     ("restx.datasource.url", "jdbc:h2:${data.dir}/db"),
//! ]
//! .into_iter()
//! .collect();
//! let env = HashMap::from([("HOME".to_string(), "/root".to_string())]);
//!
//! resolve(&mut store, &env).unwrap();
//! assert_eq!(store.get("restx.datasource.url"), Some("jdbc:h2:/root/qzui/db"));
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod interpolate;
pub mod logger;
pub mod settings;
pub mod store;

pub use env::{EnvironmentFallback, NoEnv, ProcessEnv};
pub use error::AppError;
pub use interpolate::{InterpolationError, Resolution, Resolver, resolve};
pub use store::ConfigurationStore;
