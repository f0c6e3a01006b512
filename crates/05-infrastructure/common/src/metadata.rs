//! 元数据定义
//!
//! 提供组件定义的类型标识和描述信息

use crate::lifecycle::Lifetime;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 组件类型标识
///
/// 比较和哈希只依赖 `TypeId`，类型名称用于日志和错误信息。
#[derive(Debug, Clone, Copy)]
pub struct BeanKey {
    id: TypeId,
    name: &'static str,
}

impl BeanKey {
    /// 从类型获取标识
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型名称
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// 获取简短的类型名称
    ///
    /// 去掉每一段路径的模块前缀，保留 `dyn`、引用和泛型结构，
    /// 例如 `dyn app::Sink` 变为 `dyn Sink`，`Vec<alloc::string::String>` 变为 `Vec<String>`。
    pub fn short_name(&self) -> String {
        let mut short = String::with_capacity(self.name.len());
        let mut start = 0;
        for (index, c) in self.name.char_indices() {
            if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' | '+') {
                short.push_str(last_segment(&self.name[start..index]));
                short.push(c);
                start = index + c.len_utf8();
            }
        }
        short.push_str(last_segment(&self.name[start..]));
        short
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

impl PartialEq for BeanKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BeanKey {}

impl Hash for BeanKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for BeanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// 组件定义描述
#[derive(Debug, Clone)]
pub struct DefinitionInfo {
    /// 主类型
    pub key: BeanKey,
    /// 别名类型
    pub aliases: Vec<BeanKey>,
    /// 所属作用域
    pub scope: String,
    pub lifetime: Lifetime,
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 作用域数量（含根作用域）
    pub scopes: usize,
    /// 已注册定义数量
    pub definitions: usize,
    /// 属性数量
    pub properties: usize,
    /// 已缓存的单例数量
    pub cached_singletons: usize,
}
