pub mod config_io;
pub mod file_store;
pub mod lock;
pub mod reconcile;
pub mod saver;
pub mod store;
