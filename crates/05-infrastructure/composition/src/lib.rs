//! # 容器组合层
//!
//! 组合根：把属性源、模块声明和依赖注入实现组装成可用的容器上下文。
//!
//! ## 基本使用
//!
//! ```rust
//! use di_abstractions::{BeanDefinition, Declaration, FnModule};
//! use di_composition::Container;
//!
//! #[derive(Debug)]
//! struct Greeting(String);
//!
//! let context = Container::new()
//!     .properties([("greeting", "hello")])
//!     .build_with(FnModule::new(|| {
//!         Declaration::root().define(BeanDefinition::singleton(|resolver| {
//!             Ok(Greeting(resolver.property_as("greeting")?))
//!         }))
//!     }))
//!     .unwrap();
//!
//! assert_eq!(context.get::<Greeting>().unwrap().0, "hello");
//! ```

pub mod container;
pub mod context;
pub mod logging;
pub mod property_sources;

// 重新导出主要类型
pub use container::Container;
pub use context::BeanContext;
pub use logging::{init_logging, LoggingConfig};

// 重新导出错误类型
pub use di_common::{DependencyError, DependencyResult};
