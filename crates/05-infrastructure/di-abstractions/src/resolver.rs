//! 组件解析器抽象接口
//!
//! recipe 通过 [`BeanResolver`] 请求自身的依赖和属性

use di_common::{BeanKey, DependencyError, DependencyResult};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::sync::Arc;

/// 解析上下文 trait
///
/// 每次顶层解析都会创建一个新的上下文，上下文内维护当前的构造链，
/// 所以 recipe 递归请求依赖时可以检测循环依赖。
pub trait BeanResolver {
    /// 按类型标识解析，返回装箱的 `Arc<T>`
    fn resolve_key(&mut self, key: &BeanKey) -> DependencyResult<Box<dyn Any + Send + Sync>>;

    /// 读取原始属性值
    fn property_value(&self, key: &str) -> DependencyResult<serde_json::Value>;

    /// 当前解析所在的作用域名称
    fn scope_name(&self) -> &str;
}

impl dyn BeanResolver + '_ {
    /// 解析指定类型的组件
    pub fn get<T>(&mut self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let boxed = self.resolve_key(&BeanKey::of::<T>())?;
        downcast_instance::<T>(boxed)
    }

    /// 读取属性
    pub fn property(&self, key: &str) -> DependencyResult<serde_json::Value> {
        self.property_value(key)
    }

    /// 读取属性并转换为指定类型
    pub fn property_as<T: DeserializeOwned>(&self, key: &str) -> DependencyResult<T> {
        convert_property(key, self.property_value(key)?)
    }
}

/// 把装箱的 `Arc<T>` 还原为具体类型
pub fn downcast_instance<T>(boxed: Box<dyn Any + Send + Sync>) -> DependencyResult<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    boxed
        .downcast::<Arc<T>>()
        .map(|typed| *typed)
        .map_err(|_| DependencyError::InstanceTypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
        })
}

/// 属性值类型转换
pub fn convert_property<T: DeserializeOwned>(
    key: &str,
    value: serde_json::Value,
) -> DependencyResult<T> {
    serde_json::from_value(value).map_err(|source| DependencyError::PropertyTypeMismatch {
        key: key.to_string(),
        expected: std::any::type_name::<T>().to_string(),
        source,
    })
}
