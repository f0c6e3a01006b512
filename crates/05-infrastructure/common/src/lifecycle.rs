//! 组件生命周期管理

use serde::{Deserialize, Serialize};
use std::fmt;

/// 根作用域名称
pub const ROOT_SCOPE: &str = "root";

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    /// 单例模式 - 在拥有定义的作用域内只创建一个实例
    Singleton,
    /// 工厂模式 - 每次请求都创建新实例
    Factory,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::Singleton
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => f.write_str("singleton"),
            Self::Factory => f.write_str("factory"),
        }
    }
}

/// 作用域快照
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub id: uuid::Uuid,
    pub name: String,
    /// 父作用域名称，根作用域为 `None`
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// 已缓存的单例数量
    pub cached_instances: usize,
}

impl ScopeInfo {
    /// 是否为根作用域
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
