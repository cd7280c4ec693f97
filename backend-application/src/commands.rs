// Application commands

pub mod manifest_commands;
pub mod parcel_commands;
pub mod scan_commands;
