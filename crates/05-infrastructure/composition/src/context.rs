//! 容器上下文
//!
//! `Container::build` 的产物，宿主应用通过它获取实例和属性

use di_abstractions::{convert_property, downcast_instance, DiContainer};
use di_common::{
    BeanKey, ContainerStats, DefinitionInfo, DependencyError, DependencyResult, ScopeInfo,
    ROOT_SCOPE,
};
use di_impl::InstanceResolver;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 容器上下文
///
/// 克隆开销很小，所有克隆共享同一组注册表和单例缓存。
#[derive(Clone)]
pub struct BeanContext {
    resolver: Arc<InstanceResolver>,
}

impl BeanContext {
    pub(crate) fn new(resolver: InstanceResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// 在根作用域中解析组件
    pub fn get<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_in::<T>(ROOT_SCOPE)
    }

    /// 在指定作用域中解析组件
    pub fn get_in<T>(&self, scope: &str) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        downcast_instance::<T>(self.resolver.resolve(&BeanKey::of::<T>(), scope)?)
    }

    /// 读取属性
    pub fn get_property(&self, key: &str) -> DependencyResult<serde_json::Value> {
        self.resolver.properties().get(key)
    }

    /// 读取属性并转换为指定类型
    pub fn get_property_as<T: DeserializeOwned>(&self, key: &str) -> DependencyResult<T> {
        convert_property(key, self.get_property(key)?)
    }

    /// 类型是否在根作用域可见
    pub fn is_declared<T: ?Sized + 'static>(&self) -> bool {
        self.is_declared_in::<T>(ROOT_SCOPE)
    }

    /// 类型是否在指定作用域可见（包括从父作用域继承）
    pub fn is_declared_in<T: ?Sized + 'static>(&self, scope: &str) -> bool {
        self.visible(&BeanKey::of::<T>(), scope)
    }

    fn visible(&self, key: &BeanKey, scope: &str) -> bool {
        self.resolver
            .scopes()
            .get(scope)
            .is_some_and(|node| self.resolver.registry().find(key, &node).is_some())
    }

    /// 获取所有已注册的组件定义
    pub fn definitions(&self) -> Vec<DefinitionInfo> {
        self.resolver.registry().definitions()
    }

    /// 获取所有作用域
    pub fn scopes(&self) -> Vec<ScopeInfo> {
        self.resolver.scopes().infos()
    }

    /// 获取单个作用域
    pub fn scope(&self, name: &str) -> DependencyResult<ScopeInfo> {
        self.resolver
            .scopes()
            .get(name)
            .map(|node| node.info())
            .ok_or_else(|| DependencyError::ScopeNotFound {
                scope: name.to_string(),
            })
    }

    /// 容器统计信息
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            scopes: self.resolver.scopes().len(),
            definitions: self.resolver.registry().len(),
            properties: self.resolver.properties().len(),
            cached_singletons: self.resolver.scopes().cached_instances(),
        }
    }

    /// 转换为对象安全的容器视图
    pub fn as_container(&self) -> Arc<dyn DiContainer> {
        Arc::new(self.clone())
    }
}

impl DiContainer for BeanContext {
    fn resolve_in(
        &self,
        key: &BeanKey,
        scope: &str,
    ) -> DependencyResult<Box<dyn Any + Send + Sync>> {
        self.resolver.resolve(key, scope)
    }

    fn property_value(&self, key: &str) -> DependencyResult<serde_json::Value> {
        self.get_property(key)
    }

    fn is_declared_in(&self, key: &BeanKey, scope: &str) -> bool {
        self.visible(key, scope)
    }

    fn definitions(&self) -> Vec<DefinitionInfo> {
        self.resolver.registry().definitions()
    }

    fn scopes(&self) -> Vec<ScopeInfo> {
        self.resolver.scopes().infos()
    }

    fn stats(&self) -> ContainerStats {
        BeanContext::stats(self)
    }
}

impl fmt::Debug for BeanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanContext")
            .field("stats", &BeanContext::stats(self))
            .finish()
    }
}
