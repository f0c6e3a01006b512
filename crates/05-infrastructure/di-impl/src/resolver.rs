//! 实例解析器
//!
//! 给定类型和请求作用域，定位定义、构造（或复用）实例。

use crate::inflight::SlotId;
use crate::property::PropertyResolver;
use crate::registry::BeanRegistry;
use crate::scope::{ScopeNode, ScopeRegistry};
use di_abstractions::{BeanDefinition, BeanResolver, Instance};
use di_common::{BeanKey, DependencyError, DependencyResult, Lifetime};
use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, trace};

/// 实例解析器
#[derive(Debug)]
pub struct InstanceResolver {
    registry: Arc<BeanRegistry>,
    scopes: Arc<ScopeRegistry>,
    properties: Arc<PropertyResolver>,
    max_depth: usize,
}

impl InstanceResolver {
    pub fn new(
        registry: Arc<BeanRegistry>,
        scopes: Arc<ScopeRegistry>,
        properties: Arc<PropertyResolver>,
        max_depth: usize,
    ) -> Self {
        Self {
            registry,
            scopes,
            properties,
            max_depth,
        }
    }

    pub fn registry(&self) -> &Arc<BeanRegistry> {
        &self.registry
    }

    pub fn scopes(&self) -> &Arc<ScopeRegistry> {
        &self.scopes
    }

    pub fn properties(&self) -> &Arc<PropertyResolver> {
        &self.properties
    }

    /// 在指定作用域中解析，返回装箱的 `Arc<T>`
    pub fn resolve(
        &self,
        key: &BeanKey,
        scope: &str,
    ) -> DependencyResult<Box<dyn Any + Send + Sync>> {
        let scope = self
            .scopes
            .get(scope)
            .ok_or_else(|| DependencyError::ScopeNotFound {
                scope: scope.to_string(),
            })?;
        Resolution::new(self, scope).resolve_key(key)
    }
}

/// 构造链中的一帧：(主类型, 所属作用域)
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    key: BeanKey,
    scope_id: uuid::Uuid,
    scope: String,
}

impl Frame {
    fn slot_id(&self) -> SlotId {
        (self.key.id(), self.scope_id)
    }
}

thread_local! {
    /// 当前线程上正在构造的组件链
    ///
    /// 同一线程上的所有解析共享这条链，recipe 经由容器句柄发起的新解析也能看到外层的构造。
    static CONSTRUCTING: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// 入栈守卫，离开作用域（包括 recipe panic）时出栈
struct FrameGuard;

impl FrameGuard {
    fn push(frame: Frame) -> Self {
        CONSTRUCTING.with(|stack| stack.borrow_mut().push(frame));
        FrameGuard
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn chain_through(frame: &Frame) -> String {
    CONSTRUCTING.with(|stack| {
        stack
            .borrow()
            .iter()
            .chain(std::iter::once(frame))
            .map(|frame| format!("{}@{}", frame.key, frame.scope))
            .collect::<Vec<_>>()
            .join(" -> ")
    })
}

/// 单次解析的上下文
///
/// recipe 请求的依赖从定义所属的作用域解析。
pub struct Resolution<'a> {
    resolver: &'a InstanceResolver,
    scope: Arc<ScopeNode>,
}

impl<'a> Resolution<'a> {
    pub fn new(resolver: &'a InstanceResolver, scope: Arc<ScopeNode>) -> Self {
        Self { resolver, scope }
    }

    fn enter(&self, frame: &Frame) -> DependencyResult<()> {
        let (cyclic, depth) = CONSTRUCTING.with(|stack| {
            let stack = stack.borrow();
            (stack.contains(frame), stack.len())
        });
        if cyclic {
            return Err(DependencyError::CircularDependency {
                dependency_chain: chain_through(frame),
            });
        }
        if depth >= self.resolver.max_depth {
            return Err(DependencyError::ResolutionTooDeep {
                type_name: frame.key.type_name().to_string(),
                max_depth: self.resolver.max_depth,
            });
        }
        Ok(())
    }

    fn construct(
        &mut self,
        frame: Frame,
        definition: &BeanDefinition,
        owner: &Arc<ScopeNode>,
    ) -> DependencyResult<Instance> {
        let _frame = FrameGuard::push(frame);
        let previous = std::mem::replace(&mut self.scope, owner.clone());
        let result = definition.create(self);
        self.scope = previous;
        result
    }
}

impl BeanResolver for Resolution<'_> {
    fn resolve_key(&mut self, key: &BeanKey) -> DependencyResult<Box<dyn Any + Send + Sync>> {
        let resolver = self.resolver;
        let (definition, owner) = resolver
            .registry
            .find(key, &self.scope)
            .ok_or_else(|| DependencyError::NoDefinitionFound {
                type_name: key.type_name().to_string(),
                scope: self.scope.name().to_string(),
            })?;
        trace!("解析组件: {} @ {} (定义于 {})", key, self.scope.name(), owner.name());

        let frame = Frame {
            key: *definition.key(),
            scope_id: owner.id(),
            scope: owner.name().to_string(),
        };

        let instance = match definition.lifetime() {
            Lifetime::Singleton => {
                let slot = owner.instance_slot(definition.key());
                match slot.get() {
                    Some(instance) => instance.clone(),
                    None => {
                        // 检查必须在进入 OnceCell 初始化之前完成，否则重入或互相等待会阻塞
                        self.enter(&frame)?;
                        let inits = resolver.scopes.inits();
                        let slot_id = frame.slot_id();
                        let _waiting = inits.wait_for(slot_id).ok_or_else(|| {
                            DependencyError::CircularDependency {
                                dependency_chain: format!("{} (等待其他线程)", chain_through(&frame)),
                            }
                        })?;
                        slot.get_or_try_init(|| {
                            let _claim = inits.claim(slot_id);
                            let instance = self.construct(frame, &definition, &owner)?;
                            debug!("创建单例: {} @ {}", definition.key(), owner.name());
                            Ok::<_, DependencyError>(instance)
                        })?
                        .clone()
                    }
                }
            }
            Lifetime::Factory => {
                self.enter(&frame)?;
                self.construct(frame, &definition, &owner)?
            }
        };

        definition
            .cast(key, &instance)
            .ok_or_else(|| DependencyError::InstanceTypeMismatch {
                expected: key.type_name().to_string(),
            })
    }

    fn property_value(&self, key: &str) -> DependencyResult<serde_json::Value> {
        self.resolver.properties.get(key)
    }

    fn scope_name(&self) -> &str {
        self.scope.name()
    }
}
