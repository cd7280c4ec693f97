// Domain entities and API payload types

pub mod config;
pub mod manifest;
pub mod operation;
pub mod parcel;
pub mod qr_code;
pub mod station;

pub use config::*;
pub use manifest::*;
pub use operation::*;
pub use parcel::*;
pub use qr_code::*;
pub use station::*;
