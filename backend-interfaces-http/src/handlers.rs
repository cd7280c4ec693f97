pub mod manifest_handlers;
pub mod ops_handlers;
pub mod parcel_handlers;
pub mod scan_handlers;
pub mod stats_handlers;
