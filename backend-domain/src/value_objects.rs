// Domain value objects
pub mod manifest_status;
pub mod money;
pub mod operation_type;
pub mod parcel_status;
pub mod qr_target;
pub mod weight;

pub use manifest_status::*;
pub use money::*;
pub use operation_type::*;
pub use parcel_status::*;
pub use qr_target::*;
pub use weight::*;
