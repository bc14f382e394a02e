//! pp-sudoers core library: domain types, configuration, intent store, errors.
//!
//! - [`types`]: newtypes and the desired-state model
//! - [`config`]: [`SudoersConfig`] and its YAML loader
//! - [`store`]: YAML-backed intent and ownership store
//! - [`error`]: [`StoreError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{SudoersConfig, ValidatorConfig};
pub use error::{ConfigError, StoreError};
pub use store::FileStore;
pub use types::{AppIntent, AppName, DesiredGrant, DesiredState, IntentNode, Ownership};
