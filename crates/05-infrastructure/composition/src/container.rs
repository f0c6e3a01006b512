//! 容器构建器
//!
//! 组合根：收集属性、遍历模块声明树并把定义注册到对应作用域

use crate::context::BeanContext;
use crate::property_sources;
use di_abstractions::{ContainerConfig, Declaration, Module};
use di_common::{DependencyError, DependencyResult, ROOT_SCOPE};
use di_impl::{BeanRegistry, InstanceResolver, PropertyResolver, ScopeRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// 依赖注入容器
///
/// 属性使用建造者风格按值链式添加。`build` 只借用容器，所以同一个容器可以
/// 先构建上下文、再继续合并属性或加载更多模块，所有上下文共享同一份状态。
pub struct Container {
    config: ContainerConfig,
    scopes: Arc<ScopeRegistry>,
    registry: Arc<BeanRegistry>,
    properties: Arc<PropertyResolver>,
}

impl Container {
    /// 使用默认配置创建容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            scopes: Arc::new(ScopeRegistry::new().with_strict_parents(config.strict_scope_parents)),
            registry: Arc::new(BeanRegistry::new()),
            properties: Arc::new(PropertyResolver::new()),
            config,
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 合并属性
    pub fn properties<I, K, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.properties.add_all(entries);
        self
    }

    /// 合并配置文件中的属性
    pub fn properties_from_file<P: AsRef<Path>>(self, path: P) -> DependencyResult<Self> {
        let entries = property_sources::load_file(path)?;
        Ok(self.properties(entries))
    }

    /// 合并带前缀的环境变量
    pub fn properties_from_env(self, prefix: &str) -> DependencyResult<Self> {
        let entries = property_sources::load_env(prefix)?;
        Ok(self.properties(entries))
    }

    /// 按顺序加载模块
    ///
    /// 遇到第一个结构性错误立即返回，已注册的部分不会回滚，
    /// 失败后的容器不应继续使用。
    pub fn build(&self, modules: Vec<Box<dyn Module>>) -> DependencyResult<BeanContext> {
        info!("开始构建容器，模块数量: {}", modules.len());
        let context = self.context();

        for (index, mut module) in modules.into_iter().enumerate() {
            module.attach(context.as_container());
            let declaration = module.declarations();
            debug!(
                "注册模块 #{}: 作用域 {}",
                index,
                declaration.scope_name().unwrap_or(ROOT_SCOPE)
            );
            if let Err(e) = self.register_declarations(declaration, None, 1) {
                if e.is_structural() {
                    error!("模块 #{} 注册失败，容器不应继续使用: {}", index, e);
                }
                return Err(e);
            }
        }

        let stats = context.stats();
        info!(
            "构建容器完成: {} 个作用域, {} 个定义",
            stats.scopes, stats.definitions
        );
        Ok(context)
    }

    /// 加载单个模块
    pub fn build_with<M: Module + 'static>(&self, module: M) -> DependencyResult<BeanContext> {
        self.build(vec![Box::new(module)])
    }

    /// 不加载模块，只包含根作用域和已有状态
    pub fn build_empty(&self) -> BeanContext {
        self.context()
    }

    fn context(&self) -> BeanContext {
        BeanContext::new(InstanceResolver::new(
            self.registry.clone(),
            self.scopes.clone(),
            self.properties.clone(),
            self.config.max_resolution_depth,
        ))
    }

    /// 先序遍历：先注册本节点的定义，再进入子声明
    fn register_declarations(
        &self,
        declaration: Declaration,
        inherited_parent: Option<&str>,
        depth: usize,
    ) -> DependencyResult<()> {
        let (scope_name, parent, definitions, children) = declaration.into_parts();
        if depth > self.config.max_declaration_depth {
            return Err(DependencyError::DeclarationTooDeep {
                scope: scope_name.unwrap_or_else(|| ROOT_SCOPE.to_string()),
                max_depth: self.config.max_declaration_depth,
            });
        }

        // 根作用域没有父级，嵌套在其他作用域中的根声明不继承外层
        let parent = match scope_name.as_deref() {
            None | Some(ROOT_SCOPE) => parent.as_deref(),
            Some(_) => parent.as_deref().or(inherited_parent),
        };
        let scope = self
            .scopes
            .find_or_create_scope(scope_name.as_deref(), parent)?;

        for definition in definitions {
            self.registry.declare(definition, &scope)?;
        }

        for child in children {
            self.register_declarations(child, Some(scope.name()), depth + 1)?;
        }
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{BeanDefinition, FnModule};

    #[derive(Debug)]
    struct Marker;

    fn nested(depth: usize) -> Declaration {
        (0..depth).rev().fold(Declaration::scope(format!("level-{depth}")), |inner, level| {
            Declaration::scope(format!("level-{level}")).sub_scope(inner)
        })
    }

    #[test]
    fn test_build_empty() {
        let context = Container::new().build_empty();
        let stats = context.stats();

        assert_eq!(stats.scopes, 1);
        assert_eq!(stats.definitions, 0);
        assert_eq!(context.scopes()[0].name, ROOT_SCOPE);
    }

    #[test]
    fn test_children_inherit_enclosing_scope() {
        let container = Container::new();
        let context = container
            .build_with(FnModule::new(|| {
                Declaration::scope("session")
                    .sub_scope(Declaration::scope("request"))
                    .sub_scope(Declaration::scope("audit").with_parent(ROOT_SCOPE))
            }))
            .unwrap();

        assert_eq!(context.scope("request").unwrap().parent.as_deref(), Some("session"));
        assert_eq!(context.scope("audit").unwrap().parent.as_deref(), Some(ROOT_SCOPE));
        assert_eq!(context.scope("session").unwrap().parent.as_deref(), Some(ROOT_SCOPE));
    }

    #[test]
    fn test_nested_root_declaration() {
        let context = Container::new()
            .build_with(FnModule::new(|| {
                Declaration::scope("session")
                    .sub_scope(Declaration::root().define(BeanDefinition::singleton(|_| Ok(Marker))))
                    .sub_scope(Declaration::scope(ROOT_SCOPE))
            }))
            .unwrap();

        assert!(context.get::<Marker>().is_ok());
        assert!(context.scope(ROOT_SCOPE).unwrap().parent.is_none());
        assert_eq!(context.stats().scopes, 2);
    }

    #[test]
    fn test_declaration_depth_guard() {
        let container = Container::with_config(ContainerConfig {
            max_declaration_depth: 4,
            ..ContainerConfig::default()
        });

        assert!(container.build_with(FnModule::new(|| nested(3))).is_ok());
        assert!(matches!(
            container.build_with(FnModule::new(|| nested(4))),
            Err(DependencyError::DeclarationTooDeep { max_depth: 4, .. })
        ));
    }

    #[test]
    fn test_duplicate_aborts_build() {
        let container = Container::new();
        let module = || {
            FnModule::new(|| Declaration::root().define(BeanDefinition::singleton(|_| Ok(Marker))))
        };

        let result = container.build(vec![Box::new(module()) as Box<dyn Module>, Box::new(module())]);
        assert!(matches!(
            result,
            Err(DependencyError::DuplicateDefinition { .. })
        ));
    }
}
