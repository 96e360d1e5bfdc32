//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ATLAS__*` 覆盖（双下划线表示嵌套，如 `ATLAS__PLANNING__MODEL=claude-3-opus`）。
//! 各阶段段落中的字段均可省略，缺省值由阶段自身决定（见 `stages::StageSettings::resolve`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::ProviderKind;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub research: StageSection,
    #[serde(default)]
    pub planning: StageSection,
    #[serde(default)]
    pub personalization: StageSection,
}

/// [app] 段：输出文件
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("itinerary.json")
}

/// [llm] 段：超时
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次调用上限（秒）；0 表示不限制
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// [research] / [planning] / [personalization] 段：后端与采样参数
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StageSection {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// 研究阶段综合调用的温度
    pub synthesis_temperature: Option<f32>,
    /// 规划阶段成本分析调用的输出上限
    pub cost_max_tokens: Option<u32>,
}

/// 从 config 目录加载配置，环境变量 ATLAS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ATLAS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("Config file {} not found, ignoring", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ATLAS")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.output, PathBuf::from("itinerary.json"));
        assert_eq!(cfg.llm.timeouts.request, 120);
        assert!(cfg.research.provider.is_none());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[app]
output = "out/georgia.json"

[llm.timeouts]
request = 5

[planning]
provider = "mock"
model = "planner-x"
max_tokens = 1000

[personalization]
provider = "gemini"
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.app.output, PathBuf::from("out/georgia.json"));
        assert_eq!(cfg.llm.timeouts.request, 5);
        assert_eq!(cfg.planning.provider, Some(ProviderKind::Mock));
        assert_eq!(cfg.planning.model.as_deref(), Some("planner-x"));
        assert_eq!(cfg.planning.max_tokens, Some(1000));
        assert_eq!(cfg.personalization.provider, Some(ProviderKind::Google));
    }
}
