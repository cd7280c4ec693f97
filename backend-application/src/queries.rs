// Application queries

pub mod manifest_queries;
pub mod operation_queries;
pub mod parcel_queries;
pub mod stats_queries;
