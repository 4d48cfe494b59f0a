//! Resource types for the VolSync integration

mod replication_source;

pub use replication_source::*;
