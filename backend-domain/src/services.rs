// Domain services

pub mod scan_guard;
pub mod transitions;

pub use scan_guard::ScanGuard;
