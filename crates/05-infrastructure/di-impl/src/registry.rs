//! 组件定义注册表
//!
//! 按 (类型, 作用域) 存储定义。查找从请求作用域开始沿父链向上，
//! 子作用域的定义对父作用域和兄弟作用域不可见。

use crate::scope::ScopeNode;
use di_abstractions::BeanDefinition;
use di_common::{BeanKey, DefinitionInfo, DependencyError, DependencyResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct RegistryState {
    /// 作用域名称 -> (类型 -> 定义)，别名与主类型指向同一个定义
    by_scope: HashMap<String, HashMap<BeanKey, Arc<BeanDefinition>>>,
    /// 按声明顺序记录
    declared: Vec<(String, Arc<BeanDefinition>)>,
}

/// 组件定义注册表
#[derive(Debug, Default)]
pub struct BeanRegistry {
    state: RwLock<RegistryState>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在作用域中注册定义
    ///
    /// 主类型或任一别名已在同一作用域中声明时返回 `DuplicateDefinition`，此时注册表不变。
    pub fn declare(
        &self,
        definition: BeanDefinition,
        scope: &ScopeNode,
    ) -> DependencyResult<Arc<BeanDefinition>> {
        let mut state = self.state.write();
        let entries = state.by_scope.entry(scope.name().to_string()).or_default();

        if let Some(duplicate) = definition
            .provided_keys()
            .find(|key| entries.contains_key(*key))
        {
            return Err(DependencyError::DuplicateDefinition {
                type_name: duplicate.type_name().to_string(),
                scope: scope.name().to_string(),
            });
        }

        let definition = Arc::new(definition);
        for key in definition.provided_keys() {
            entries.insert(*key, definition.clone());
        }
        state
            .declared
            .push((scope.name().to_string(), definition.clone()));

        debug!(
            "声明组件: {} ({}) @ {}",
            definition.key(),
            definition.lifetime(),
            scope.name()
        );
        Ok(definition)
    }

    /// 查找从 `scope` 可见的定义，返回定义及其所属作用域
    pub fn find(
        &self,
        key: &BeanKey,
        scope: &Arc<ScopeNode>,
    ) -> Option<(Arc<BeanDefinition>, Arc<ScopeNode>)> {
        let state = self.state.read();
        let mut current = Some(scope.clone());
        while let Some(node) = current {
            if let Some(definition) = state
                .by_scope
                .get(node.name())
                .and_then(|entries| entries.get(key))
            {
                return Some((definition.clone(), node));
            }
            current = node.parent();
        }
        None
    }

    /// 是否在该作用域自身中声明（不查找父作用域）
    pub fn is_declared(&self, key: &BeanKey, scope: &str) -> bool {
        self.state
            .read()
            .by_scope
            .get(scope)
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// 所有定义的描述信息（按声明顺序）
    pub fn definitions(&self) -> Vec<DefinitionInfo> {
        self.state
            .read()
            .declared
            .iter()
            .map(|(scope, definition)| definition.info(scope.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().declared.is_empty()
    }
}
