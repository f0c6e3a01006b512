//! # 依赖注入具体实现
//!
//! 提供作用域注册表、组件定义注册表、实例解析器和属性解析器的实现

pub mod inflight;
pub mod property;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use inflight::{InitTracker, SlotId};
pub use property::PropertyResolver;
pub use registry::BeanRegistry;
pub use resolver::{InstanceResolver, Resolution};
pub use scope::{InstanceSlot, ScopeNode, ScopeRegistry};
