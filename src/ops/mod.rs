pub mod ids;
pub mod task_ops;
pub mod view;
