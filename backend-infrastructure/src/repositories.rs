pub mod redb_store;
pub mod station_files;

pub use redb_store::RedbWarehouseStore;
pub use station_files::FileStationDirectory;
