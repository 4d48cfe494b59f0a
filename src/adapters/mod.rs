//! Adapters between claims, credentials and the Kubernetes objects derived from them

pub mod claim;
pub mod credentials;
pub mod deployer;
pub mod replication_source_builder;
pub mod secret_builder;
pub mod secrets;
