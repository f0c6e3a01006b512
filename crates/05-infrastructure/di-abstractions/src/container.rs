//! 依赖注入容器抽象接口
//!
//! 提供依赖注入容器的核心抽象

use crate::resolver::{convert_property, downcast_instance};
use di_common::{BeanKey, ContainerStats, DefinitionInfo, DependencyResult, ScopeInfo};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// 依赖注入容器 trait
///
/// 已构建完成的容器视图，模块在 [`attach`](crate::Module::attach) 时拿到的就是它
pub trait DiContainer: Send + Sync {
    /// 在指定作用域中解析组件，返回装箱的 `Arc<T>`
    fn resolve_in(
        &self,
        key: &BeanKey,
        scope: &str,
    ) -> DependencyResult<Box<dyn Any + Send + Sync>>;

    /// 读取原始属性值
    fn property_value(&self, key: &str) -> DependencyResult<serde_json::Value>;

    /// 检查类型在作用域中是否可见
    fn is_declared_in(&self, key: &BeanKey, scope: &str) -> bool;

    /// 获取所有已注册的组件定义
    fn definitions(&self) -> Vec<DefinitionInfo>;

    /// 获取所有作用域
    fn scopes(&self) -> Vec<ScopeInfo>;

    /// 容器统计信息
    fn stats(&self) -> ContainerStats;
}

impl dyn DiContainer + '_ {
    /// 在根作用域中解析组件
    pub fn get<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_in::<T>(di_common::ROOT_SCOPE)
    }

    /// 在指定作用域中解析组件
    pub fn get_in<T>(&self, scope: &str) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        downcast_instance::<T>(self.resolve_in(&BeanKey::of::<T>(), scope)?)
    }

    /// 读取属性并转换为指定类型
    pub fn get_property_as<T: DeserializeOwned>(&self, key: &str) -> DependencyResult<T> {
        convert_property(key, self.property_value(key)?)
    }
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 声明树最大深度
    pub max_declaration_depth: usize,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 已存在的作用域被声明为另一个父级的子作用域时是否报错（否则仅记录警告）
    pub strict_scope_parents: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_declaration_depth: 64,
            max_resolution_depth: 128,
            strict_scope_parents: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_partial_settings() {
        let config: ContainerConfig =
            serde_json::from_value(serde_json::json!({ "strict_scope_parents": true })).unwrap();

        assert!(config.strict_scope_parents);
        assert_eq!(config.max_resolution_depth, 128);
        assert_eq!(config.max_declaration_depth, 64);
    }
}
