//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义组件声明和依赖解析的核心接口。
//!
//! ## 核心接口
//!
//! - [`BeanDefinition`] - 组件定义（类型、生命周期、构造函数）
//! - [`Declaration`] / [`Module`] - 模块声明树
//! - [`BeanResolver`] - recipe 使用的解析上下文
//! - [`DiContainer`] - 已构建容器的对象安全视图

pub mod container;
pub mod definition;
pub mod module;
pub mod resolver;

pub use container::*;
pub use definition::*;
pub use module::*;
pub use resolver::*;
