//! 属性解析器
//!
//! 扁平的键值存储，为 recipe 提供配置参数

use di_abstractions::convert_property;
use di_common::{DependencyError, DependencyResult};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// 属性解析器
#[derive(Debug, Default)]
pub struct PropertyResolver {
    values: RwLock<HashMap<String, Value>>,
}

impl PropertyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 批量合并属性，同名键后写覆盖先写
    pub fn add_all<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut values = self.values.write();
        let mut added = 0usize;
        for (key, value) in entries {
            values.insert(key.into(), value.into());
            added += 1;
        }
        debug!("合并属性: {} 项, 当前共 {} 项", added, values.len());
    }

    /// 读取属性
    pub fn get(&self, key: &str) -> DependencyResult<Value> {
        self.values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| DependencyError::PropertyNotFound {
                key: key.to_string(),
            })
    }

    /// 读取属性并转换为指定类型
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> DependencyResult<T> {
        convert_property(key, self.get(key)?)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// 所有属性键（已排序）
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}
