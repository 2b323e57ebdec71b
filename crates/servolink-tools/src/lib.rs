//! # Servolink Tools - 持久化与配置
//!
//! **依赖原则**: 只依赖 `servolink-protocol`，避免依赖 `servolink-driver`
//!
//! ## 包含模块
//!
//! - `store` - 姿态存储（内存 / JSON 文件）
//! - `config` - 控制器配置（TOML）

pub mod config;
pub mod store;

// 重新导出常用类型
pub use config::{ChannelConfig, ControllerConfig, PwmSettings, SerialSettings};
pub use store::{JsonFilePoseStore, MemoryPoseStore, PoseStore, PoseStoreError};
