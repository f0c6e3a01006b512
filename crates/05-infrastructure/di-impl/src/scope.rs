//! 作用域注册表
//!
//! 作用域构成一棵树：子节点通过弱引用指向父节点，注册表持有所有节点的强引用。
//! 每个作用域拥有自己的单例缓存，缓存槽位使用 `OnceCell`，保证并发首次解析时
//! recipe 至多执行一次。

use crate::inflight::InitTracker;
use di_abstractions::Instance;
use di_common::{BeanKey, DependencyError, DependencyResult, ScopeInfo, ROOT_SCOPE};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// 单例缓存槽位
pub type InstanceSlot = Arc<OnceCell<Instance>>;

/// 作用域节点
#[derive(Debug)]
pub struct ScopeNode {
    id: uuid::Uuid,
    name: String,
    parent: Option<Weak<ScopeNode>>,
    children: RwLock<Vec<String>>,
    created_at: chrono::DateTime<chrono::Utc>,
    instances: DashMap<TypeId, InstanceSlot>,
}

impl ScopeNode {
    fn new(name: impl Into<String>, parent: Option<&Arc<ScopeNode>>) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            parent: parent.map(Arc::downgrade),
            children: RwLock::new(Vec::new()),
            created_at: chrono::Utc::now(),
            instances: DashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn parent(&self) -> Option<Arc<ScopeNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// 获取（必要时创建）单例缓存槽位
    ///
    /// 返回槽位的克隆，调用方初始化槽位时不持有 map 的锁。
    pub fn instance_slot(&self, key: &BeanKey) -> InstanceSlot {
        self.instances.entry(key.id()).or_default().value().clone()
    }

    /// 已构造完成的单例数量
    pub fn cached_instances(&self) -> usize {
        self.instances
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub fn info(&self) -> ScopeInfo {
        ScopeInfo {
            id: self.id,
            name: self.name.clone(),
            parent: self.parent().map(|parent| parent.name.clone()),
            children: self.children.read().clone(),
            created_at: self.created_at,
            cached_instances: self.cached_instances(),
        }
    }
}

/// 作用域注册表
#[derive(Debug)]
pub struct ScopeRegistry {
    root: Arc<ScopeNode>,
    scopes: RwLock<HashMap<String, Arc<ScopeNode>>>,
    strict_parents: bool,
    inits: InitTracker,
}

impl ScopeRegistry {
    /// 创建只包含根作用域的注册表
    pub fn new() -> Self {
        let root = ScopeNode::new(ROOT_SCOPE, None);
        let mut scopes = HashMap::new();
        scopes.insert(ROOT_SCOPE.to_string(), root.clone());
        Self {
            root,
            scopes: RwLock::new(scopes),
            strict_parents: false,
            inits: InitTracker::new(),
        }
    }

    /// 父级冲突时报错而不是记录警告
    pub fn with_strict_parents(mut self, strict: bool) -> Self {
        self.strict_parents = strict;
        self
    }

    pub fn root(&self) -> Arc<ScopeNode> {
        self.root.clone()
    }

    /// 所有作用域共用的单例初始化跟踪器
    pub fn inits(&self) -> &InitTracker {
        &self.inits
    }

    pub fn get(&self, name: &str) -> Option<Arc<ScopeNode>> {
        self.scopes.read().get(name).cloned()
    }

    /// 查找或创建作用域
    ///
    /// `name` 为 `None` 表示根作用域；`parent` 为 `None` 时新作用域挂在根作用域下。
    /// 不存在的父作用域会作为根作用域的子节点被立即创建。
    pub fn find_or_create_scope(
        &self,
        name: Option<&str>,
        parent: Option<&str>,
    ) -> DependencyResult<Arc<ScopeNode>> {
        let name = name.unwrap_or(ROOT_SCOPE);

        if let Some(existing) = self.get(name) {
            self.check_existing_parent(&existing, parent)?;
            return Ok(existing);
        }

        let parent_name = parent.unwrap_or(ROOT_SCOPE);
        if parent_name == name {
            return Err(DependencyError::ScopeCycle {
                scope: name.to_string(),
                parent: parent_name.to_string(),
            });
        }

        let mut scopes = self.scopes.write();
        if let Some(existing) = scopes.get(name).cloned() {
            drop(scopes);
            self.check_existing_parent(&existing, parent)?;
            return Ok(existing);
        }

        let parent_node = match scopes.get(parent_name) {
            Some(node) => node.clone(),
            None => {
                let node = ScopeNode::new(parent_name, Some(&self.root));
                self.root.children.write().push(parent_name.to_string());
                scopes.insert(parent_name.to_string(), node.clone());
                debug!("创建父作用域: {} -> {}", parent_name, ROOT_SCOPE);
                node
            }
        };

        let node = ScopeNode::new(name, Some(&parent_node));
        parent_node.children.write().push(name.to_string());
        scopes.insert(name.to_string(), node.clone());
        debug!("创建作用域: {} -> {}", name, parent_name);
        Ok(node)
    }

    /// 已存在的作用域再次被引用时，校验请求的父级
    fn check_existing_parent(
        &self,
        existing: &Arc<ScopeNode>,
        requested: Option<&str>,
    ) -> DependencyResult<()> {
        let Some(requested) = requested else {
            return Ok(());
        };

        let current = existing.parent();
        if current.as_ref().map(|parent| parent.name()) == Some(requested) {
            return Ok(());
        }

        if self
            .ancestors_of(requested)
            .iter()
            .any(|ancestor| ancestor.name() == existing.name())
        {
            return Err(DependencyError::ScopeCycle {
                scope: existing.name().to_string(),
                parent: requested.to_string(),
            });
        }

        let current_name = current
            .as_ref()
            .map_or("<none>", |parent| parent.name())
            .to_string();
        if self.strict_parents {
            return Err(DependencyError::ScopeParentConflict {
                scope: existing.name().to_string(),
                existing: current_name,
                requested: requested.to_string(),
            });
        }

        warn!(
            "作用域 {} 已链接到 {}, 忽略新的父作用域 {}",
            existing.name(),
            current_name,
            requested
        );
        Ok(())
    }

    /// 祖先链（自身在前，根作用域在后）；作用域不存在时为空
    pub fn ancestors_of(&self, name: &str) -> Vec<Arc<ScopeNode>> {
        let mut chain = Vec::new();
        let mut current = self.get(name);
        while let Some(node) = current {
            current = node.parent();
            chain.push(node);
        }
        chain
    }

    /// 所有作用域名称（已排序）
    pub fn scope_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn infos(&self) -> Vec<ScopeInfo> {
        let mut infos: Vec<ScopeInfo> = self.scopes.read().values().map(|node| node.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.scopes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.read().is_empty()
    }

    /// 所有作用域中已缓存的单例总数
    pub fn cached_instances(&self) -> usize {
        self.scopes
            .read()
            .values()
            .map(|node| node.cached_instances())
            .sum()
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(chain: &[Arc<ScopeNode>]) -> Vec<&str> {
        chain.iter().map(|node| node.name()).collect()
    }

    #[test]
    fn test_root_always_exists() {
        let registry = ScopeRegistry::new();
        let root = registry.find_or_create_scope(None, None).unwrap();

        assert!(root.is_root());
        assert!(Arc::ptr_eq(&root, &registry.root()));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(
            &registry.find_or_create_scope(Some(ROOT_SCOPE), None).unwrap(),
            &root
        ));
    }

    #[test]
    fn test_find_or_create_reuses_scope() {
        let registry = ScopeRegistry::new();
        let first = registry.find_or_create_scope(Some("session"), None).unwrap();
        let second = registry.find_or_create_scope(Some("session"), None).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.parent().unwrap().name(), ROOT_SCOPE);
        assert_eq!(registry.root().info().children, vec!["session".to_string()]);
    }

    #[test]
    fn test_missing_parent_created_eagerly() {
        let registry = ScopeRegistry::new();
        registry
            .find_or_create_scope(Some("request"), Some("session"))
            .unwrap();

        assert_eq!(
            names(&registry.ancestors_of("request")),
            vec!["request", "session", ROOT_SCOPE]
        );
        assert_eq!(registry.scope_names(), vec!["request", "root", "session"]);
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let registry = ScopeRegistry::new();
        assert!(matches!(
            registry.find_or_create_scope(Some("loop"), Some("loop")),
            Err(DependencyError::ScopeCycle { .. })
        ));
        assert!(registry.get("loop").is_none());
    }

    #[test]
    fn test_relinking_under_descendant_is_cycle() {
        let registry = ScopeRegistry::new();
        registry.find_or_create_scope(Some("a"), None).unwrap();
        registry.find_or_create_scope(Some("b"), Some("a")).unwrap();

        assert!(matches!(
            registry.find_or_create_scope(Some("a"), Some("b")),
            Err(DependencyError::ScopeCycle { .. })
        ));
        assert!(matches!(
            registry.find_or_create_scope(None, Some("b")),
            Err(DependencyError::ScopeCycle { .. })
        ));
    }

    #[test]
    fn test_conflicting_parent_keeps_first_link() {
        let registry = ScopeRegistry::new();
        registry.find_or_create_scope(Some("x"), None).unwrap();
        registry.find_or_create_scope(Some("y"), None).unwrap();
        registry.find_or_create_scope(Some("child"), Some("x")).unwrap();

        let child = registry.find_or_create_scope(Some("child"), Some("y")).unwrap();
        assert_eq!(child.parent().unwrap().name(), "x");
    }

    #[test]
    fn test_conflicting_parent_rejected_in_strict_mode() {
        let registry = ScopeRegistry::new().with_strict_parents(true);
        registry.find_or_create_scope(Some("child"), Some("x")).unwrap();

        match registry.find_or_create_scope(Some("child"), Some("y")) {
            Err(DependencyError::ScopeParentConflict {
                scope,
                existing,
                requested,
            }) => {
                assert_eq!(scope, "child");
                assert_eq!(existing, "x");
                assert_eq!(requested, "y");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_instance_slot_shared() {
        let registry = ScopeRegistry::new();
        let root = registry.root();
        let key = BeanKey::of::<String>();

        let slot = root.instance_slot(&key);
        assert_eq!(root.cached_instances(), 0);
        slot.set(Arc::new("cached".to_string()) as Instance).unwrap();

        assert!(root.instance_slot(&key).get().is_some());
        assert_eq!(registry.cached_instances(), 1);
        assert_eq!(root.info().cached_instances, 1);
    }
}
