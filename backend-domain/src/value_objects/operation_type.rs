use serde::{Deserialize, Serialize};

/// Kind of state-changing scan recorded in the operation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    ScanIn,
    ScanOut,
    Sort,
    Load,
    Unload,
    Transfer,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::ScanIn => "scan_in",
            OperationType::ScanOut => "scan_out",
            OperationType::Sort => "sort",
            OperationType::Load => "load",
            OperationType::Unload => "unload",
            OperationType::Transfer => "transfer",
        }
    }

    pub const ALL: [OperationType; 6] = [
        OperationType::ScanIn,
        OperationType::ScanOut,
        OperationType::Sort,
        OperationType::Load,
        OperationType::Unload,
        OperationType::Transfer,
    ];
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the code reached the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMethod {
    QrScanner,
    ManualEntry,
    Barcode,
}

impl ScanMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMethod::QrScanner => "qr_scanner",
            ScanMethod::ManualEntry => "manual_entry",
            ScanMethod::Barcode => "barcode",
        }
    }
}
