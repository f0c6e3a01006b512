//! 属性源
//!
//! 通过 `config` crate 读取配置文件或环境变量，并展开为点分隔的扁平键
//! （`server.port`）。

use di_common::{DependencyError, DependencyResult};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error};

/// 从配置文件读取属性，格式由扩展名决定（toml / json / yaml）
pub fn load_file(path: impl AsRef<Path>) -> DependencyResult<Vec<(String, Value)>> {
    let path = path.as_ref();
    let source_name = path.display().to_string();
    debug!("加载属性文件: {}", source_name);

    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .map_err(|e| source_failed(&source_name, &e))?;
    collect(&source_name, settings)
}

/// 从带前缀的环境变量读取属性，`PREFIX_SERVER_PORT` 对应 `server.port`
pub fn load_env(prefix: &str) -> DependencyResult<Vec<(String, Value)>> {
    let source_name = format!("env:{prefix}");
    debug!("加载环境变量属性: {}", source_name);

    let settings = config::Config::builder()
        .add_source(
            config::Environment::with_prefix(prefix)
                .separator("_")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| source_failed(&source_name, &e))?;
    collect(&source_name, settings)
}

fn collect(source_name: &str, settings: config::Config) -> DependencyResult<Vec<(String, Value)>> {
    let tree: Value = settings
        .try_deserialize()
        .map_err(|e| source_failed(source_name, &e))?;

    let mut entries = Vec::new();
    flatten(None, tree, &mut entries);
    debug!("属性源 {} 提供 {} 项", source_name, entries.len());
    Ok(entries)
}

fn source_failed(source_name: &str, e: &config::ConfigError) -> DependencyError {
    error!("属性源加载失败: {}, {}", source_name, e);
    DependencyError::PropertySourceFailed {
        source_name: source_name.to_string(),
        message: e.to_string(),
    }
}

/// 展开嵌套对象；数组和空对象保持原值
pub fn flatten(prefix: Option<&str>, value: Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = match prefix {
                    Some(prefix) => format!("{prefix}.{key}"),
                    None => key,
                };
                flatten(Some(&path), child, out);
            }
        }
        other => {
            if let Some(prefix) = prefix {
                out.push((prefix.to_string(), other));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn sorted(mut entries: Vec<(String, Value)>) -> Vec<(String, Value)> {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    #[test]
    fn test_flatten_nested() {
        let mut out = Vec::new();
        flatten(
            None,
            json!({
                "server": { "port": 8080, "hosts": ["a", "b"] },
                "name": "demo",
                "empty": {}
            }),
            &mut out,
        );

        assert_eq!(
            sorted(out),
            vec![
                ("empty".to_string(), json!({})),
                ("name".to_string(), json!("demo")),
                ("server.hosts".to_string(), json!(["a", "b"])),
                ("server.port".to_string(), json!(8080)),
            ]
        );
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "name = \"demo\"\n\n[server]\nport = 9090").unwrap();

        let entries = sorted(load_file(file.path()).unwrap());
        assert_eq!(
            entries,
            vec![
                ("name".to_string(), json!("demo")),
                ("server.port".to_string(), json!(9090)),
            ]
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_file("/nonexistent/settings.toml"),
            Err(DependencyError::PropertySourceFailed { .. })
        ));
    }

    #[test]
    fn test_load_env() {
        std::env::set_var("LORNDIPS_DATABASE_POOL", "16");

        let entries = load_env("LORNDIPS").unwrap();
        assert!(entries.contains(&("database.pool".to_string(), json!(16))));
    }
}
