//! 组件定义
//!
//! 定义描述"如何构造一个实例"：主类型、可选的别名类型、生命周期和构造函数（recipe）。

use crate::resolver::BeanResolver;
use di_common::{BeanKey, DefinitionInfo, DependencyResult, Lifetime};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 类型擦除后的组件实例，内部是主类型 `T` 本身
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 组件构造函数类型
pub type RecipeFn =
    Arc<dyn Fn(&mut dyn BeanResolver) -> DependencyResult<Instance> + Send + Sync>;

/// 把主实例转换为请求类型，输出为装箱的 `Arc<U>`
pub type CasterFn = Arc<dyn Fn(&Instance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 类型擦除的组件定义
#[derive(Clone)]
pub struct BeanDefinition {
    key: BeanKey,
    lifetime: Lifetime,
    recipe: RecipeFn,
    /// 第一个元素总是主类型
    bindings: Vec<(BeanKey, CasterFn)>,
}

impl BeanDefinition {
    /// 单例定义
    pub fn singleton<T, F>(recipe: F) -> DefinitionBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn BeanResolver) -> DependencyResult<T> + Send + Sync + 'static,
    {
        DefinitionBuilder::new(Lifetime::Singleton, recipe)
    }

    /// 工厂定义
    pub fn factory<T, F>(recipe: F) -> DefinitionBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn BeanResolver) -> DependencyResult<T> + Send + Sync + 'static,
    {
        DefinitionBuilder::new(Lifetime::Factory, recipe)
    }

    /// 主类型
    pub fn key(&self) -> &BeanKey {
        &self.key
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 别名类型（不含主类型）
    pub fn aliases(&self) -> impl Iterator<Item = &BeanKey> + '_ {
        self.bindings.iter().skip(1).map(|(key, _)| key)
    }

    /// 此定义提供的所有类型（主类型在前）
    pub fn provided_keys(&self) -> impl Iterator<Item = &BeanKey> + '_ {
        self.bindings.iter().map(|(key, _)| key)
    }

    /// 调用构造函数
    pub fn create(&self, resolver: &mut dyn BeanResolver) -> DependencyResult<Instance> {
        (self.recipe)(resolver)
    }

    /// 把主实例转换为 `key` 对应的类型
    pub fn cast(&self, key: &BeanKey, instance: &Instance) -> Option<Box<dyn Any + Send + Sync>> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == key)
            .and_then(|(_, caster)| caster(instance))
    }

    /// 生成描述信息
    pub fn info(&self, scope: impl Into<String>) -> DefinitionInfo {
        DefinitionInfo {
            key: self.key,
            aliases: self.aliases().copied().collect(),
            scope: scope.into(),
            lifetime: self.lifetime,
        }
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("aliases", &self.aliases().collect::<Vec<_>>())
            .field("recipe", &"<function>")
            .finish()
    }
}

/// 类型化的定义构建器
///
/// 通过 [`bind`](Self::bind) 为同一实例追加别名类型，例如把 `Arc<ConsoleLogger>`
/// 同时暴露为 `Arc<dyn Log>`。别名与主类型共享同一个单例。
pub struct DefinitionBuilder<T> {
    definition: BeanDefinition,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DefinitionBuilder<T>
where
    T: Send + Sync + 'static,
{
    fn new<F>(lifetime: Lifetime, recipe: F) -> Self
    where
        F: Fn(&mut dyn BeanResolver) -> DependencyResult<T> + Send + Sync + 'static,
    {
        let recipe: RecipeFn = Arc::new(move |resolver: &mut dyn BeanResolver| {
            recipe(resolver).map(|value| Arc::new(value) as Instance)
        });
        let primary: CasterFn = Arc::new(|instance: &Instance| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|typed| Box::new(typed) as Box<dyn Any + Send + Sync>)
        });

        Self {
            definition: BeanDefinition {
                key: BeanKey::of::<T>(),
                lifetime,
                recipe,
                bindings: vec![(BeanKey::of::<T>(), primary)],
            },
            _marker: PhantomData,
        }
    }

    /// 追加别名类型
    pub fn bind<U, C>(mut self, cast: C) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        C: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    {
        let caster: CasterFn = Arc::new(move |instance: &Instance| {
            instance
                .clone()
                .downcast::<T>()
                .ok()
                .map(|typed| Box::new(cast(typed)) as Box<dyn Any + Send + Sync>)
        });
        self.definition.bindings.push((BeanKey::of::<U>(), caster));
        self
    }

    pub fn build(self) -> BeanDefinition {
        self.definition
    }
}

impl<T> From<DefinitionBuilder<T>> for BeanDefinition
where
    T: Send + Sync + 'static,
{
    fn from(builder: DefinitionBuilder<T>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Debug)]
    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_builder_records_keys() {
        let definition: BeanDefinition = BeanDefinition::factory(|_| Ok(English))
            .bind(|english: Arc<English>| english as Arc<dyn Greeter>)
            .into();

        assert_eq!(*definition.key(), BeanKey::of::<English>());
        assert_eq!(definition.lifetime(), Lifetime::Factory);
        assert_eq!(
            definition.aliases().copied().collect::<Vec<_>>(),
            vec![BeanKey::of::<dyn Greeter>()]
        );
        assert_eq!(definition.provided_keys().count(), 2);

        let info = definition.info("web");
        assert_eq!(info.scope, "web");
        assert_eq!(info.aliases, vec![BeanKey::of::<dyn Greeter>()]);
    }

    #[test]
    fn test_cast_to_alias() {
        let definition = BeanDefinition::singleton(|_| Ok(English))
            .bind(|english: Arc<English>| english as Arc<dyn Greeter>)
            .build();

        let instance: Instance = Arc::new(English);
        let boxed = definition
            .cast(&BeanKey::of::<dyn Greeter>(), &instance)
            .expect("alias should cast");
        let greeter = boxed.downcast::<Arc<dyn Greeter>>().expect("boxed Arc<dyn Greeter>");
        assert_eq!(greeter.greet(), "hello");

        assert!(definition.cast(&BeanKey::of::<String>(), &instance).is_none());
    }
}
