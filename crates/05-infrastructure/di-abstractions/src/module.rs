//! 模块声明
//!
//! 模块把一组定义组织成声明树：每个节点指定一个作用域、其父作用域、
//! 本节点的定义以及嵌套的子声明。容器按先序遍历注册。

use crate::container::DiContainer;
use crate::definition::BeanDefinition;
use std::sync::Arc;

/// 声明树节点
#[derive(Debug, Clone, Default)]
pub struct Declaration {
    scope: Option<String>,
    parent: Option<String>,
    definitions: Vec<BeanDefinition>,
    children: Vec<Declaration>,
}

impl Declaration {
    /// 根作用域声明
    pub fn root() -> Self {
        Self::default()
    }

    /// 指定作用域的声明
    pub fn scope(name: impl Into<String>) -> Self {
        Self {
            scope: Some(name.into()),
            ..Self::default()
        }
    }

    /// 设置父作用域
    ///
    /// 未设置时，子声明以外层声明的作用域为父级，顶层声明以根作用域为父级。
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// 添加定义
    pub fn define(mut self, definition: impl Into<BeanDefinition>) -> Self {
        self.definitions.push(definition.into());
        self
    }

    /// 添加子声明
    pub fn sub_scope(mut self, child: Declaration) -> Self {
        self.children.push(child);
        self
    }

    pub fn scope_name(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn definitions(&self) -> &[BeanDefinition] {
        &self.definitions
    }

    pub fn children(&self) -> &[Declaration] {
        &self.children
    }

    /// 拆分为 (作用域, 父作用域, 定义, 子声明)
    pub fn into_parts(
        self,
    ) -> (
        Option<String>,
        Option<String>,
        Vec<BeanDefinition>,
        Vec<Declaration>,
    ) {
        (self.scope, self.parent, self.definitions, self.children)
    }
}

/// 模块 trait
///
/// 容器在注册前先调用 [`attach`](Module::attach)，模块可以保存容器句柄以便之后按需取用实例。
pub trait Module: Send {
    /// 绑定所属容器
    fn attach(&mut self, _container: Arc<dyn DiContainer>) {}

    /// 生成声明树
    fn declarations(&self) -> Declaration;
}

/// 由闭包生成声明的模块
pub struct FnModule<F>
where
    F: Fn() -> Declaration + Send,
{
    declare: F,
}

impl<F> FnModule<F>
where
    F: Fn() -> Declaration + Send,
{
    pub fn new(declare: F) -> Self {
        Self { declare }
    }
}

impl<F> Module for FnModule<F>
where
    F: Fn() -> Declaration + Send,
{
    fn declarations(&self) -> Declaration {
        (self.declare)()
    }
}
