//! # DI Common
//!
//! 容器各层共享的基础类型。
//!
//! ## 核心类型
//!
//! - [`DependencyError`] - 注册与解析的错误分类
//! - [`Lifetime`] - 单例 / 工厂生命周期
//! - [`BeanKey`] - 基于 `TypeId` 的组件类型标识
//! - [`ScopeInfo`] / [`DefinitionInfo`] / [`ContainerStats`] - 容器状态快照

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
