//! 错误类型定义

use thiserror::Error;

/// 依赖注入错误类型
///
/// 注册、作用域管理、实例解析和属性读取的所有失败都归入此类型，
/// 以便 recipe 内部可以直接使用 `?` 传播任何一种失败。
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("重复的组件定义: {type_name} 已在作用域 {scope} 中声明")]
    DuplicateDefinition { type_name: String, scope: String },

    #[error("作用域循环: {scope} 不能成为自身的祖先 (父作用域 {parent})")]
    ScopeCycle { scope: String, parent: String },

    #[error("作用域父级冲突: {scope} 已链接到 {existing}, 又被声明为 {requested} 的子作用域")]
    ScopeParentConflict {
        scope: String,
        existing: String,
        requested: String,
    },

    #[error("作用域不存在: {scope}")]
    ScopeNotFound { scope: String },

    #[error("未找到组件定义: {type_name} (请求作用域 {scope})")]
    NoDefinitionFound { type_name: String, scope: String },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("解析深度超过限制 {max_depth}: {type_name}")]
    ResolutionTooDeep { type_name: String, max_depth: usize },

    #[error("声明树深度超过限制 {max_depth}: 作用域 {scope}")]
    DeclarationTooDeep { scope: String, max_depth: usize },

    #[error("实例类型不匹配: 期望 {expected}")]
    InstanceTypeMismatch { expected: String },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("属性不存在: {key}")]
    PropertyNotFound { key: String },

    #[error("属性类型不匹配: {key}, 期望 {expected}, 原因: {source}")]
    PropertyTypeMismatch {
        key: String,
        expected: String,
        source: serde_json::Error,
    },

    #[error("属性源加载失败: {source_name}, 原因: {message}")]
    PropertySourceFailed { source_name: String, message: String },
}

impl DependencyError {
    /// 包装 recipe 中的外部错误
    pub fn creation_failed<T: ?Sized>(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ComponentCreationFailed {
            type_name: std::any::type_name::<T>().to_string(),
            source: source.into(),
        }
    }

    /// 是否为注册阶段的结构性错误
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateDefinition { .. }
                | Self::ScopeCycle { .. }
                | Self::ScopeParentConflict { .. }
                | Self::DeclarationTooDeep { .. }
        )
    }
}

/// 结果类型别名
pub type DependencyResult<T> = Result<T, DependencyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Pool;

    #[test]
    fn test_creation_failed_records_type_name() {
        let err = DependencyError::creation_failed::<Pool>("连接被拒绝");
        match &err {
            DependencyError::ComponentCreationFailed { type_name, .. } => {
                assert!(type_name.ends_with("Pool"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("连接被拒绝"));
        assert!(!err.is_structural());
    }

    #[test]
    fn test_structural_errors() {
        let err = DependencyError::DuplicateDefinition {
            type_name: "Logger".into(),
            scope: "root".into(),
        };
        assert!(err.is_structural());

        let err = DependencyError::PropertyNotFound { key: "a".into() };
        assert!(!err.is_structural());
    }
}
