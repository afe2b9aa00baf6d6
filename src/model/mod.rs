pub mod task;
pub mod tag;
pub mod record;
pub mod config;

pub use task::*;
pub use tag::*;
pub use record::*;
pub use config::*;
