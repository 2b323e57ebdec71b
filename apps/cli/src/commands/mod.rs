//! 命令定义和实现

pub mod config;
pub mod controller;
pub mod pose;
pub mod query;
pub mod set;

pub use config::ConfigCommand;
pub use controller::ControllerCommand;
pub use pose::PoseCommand;
pub use query::QueryCommand;
pub use set::SetCommand;
