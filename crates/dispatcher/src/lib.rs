//! # Dispatcher
//!
//! 操作分发模块。
//!
//! 负责：
//! - 校验路由模式与权限集
//! - 按路由模式在本节点、主节点或全部节点执行操作
//! - 超时控制与异步调度
//! - 合并广播结果

pub mod cluster;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod permissions;
pub mod registry;

pub use cluster::{InProcessCluster, StandaloneCluster};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig, DistributeOutcome};
pub use error::DispatchError;
pub use handle::AsyncHandle;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use permissions::{ensure_permitted, filter_request, StaticPermissionResolver};
pub use registry::OperationRegistry;
