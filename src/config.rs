//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，
//! 如 `HIVE__SUPERVISOR__LOOP_THRESHOLD=5`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub supervisor: SupervisorSection,
    #[serde(default)]
    pub coordination: CoordinationSection,
}

/// [app] 段：应用名
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [supervisor] 段：熔断窗口与阶段阈值
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    /// 熔断窗口：保留最近多少次调用签名
    #[serde(default = "default_recent_call_window")]
    pub recent_call_window: usize,
    /// 窗口内相同签名达到此数（含本次）即熔断
    #[serde(default = "default_loop_threshold")]
    pub loop_threshold: usize,
    /// planning -> gathering 所需的调查类调用数
    #[serde(default = "default_gathering_threshold")]
    pub gathering_threshold: u32,
    /// 无行动时建议强制行动的调查类调用数
    #[serde(default = "default_force_action_threshold")]
    pub force_action_threshold: u32,
}

fn default_recent_call_window() -> usize {
    10
}

fn default_loop_threshold() -> usize {
    3
}

fn default_gathering_threshold() -> u32 {
    3
}

fn default_force_action_threshold() -> u32 {
    8
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            recent_call_window: default_recent_call_window(),
            loop_threshold: default_loop_threshold(),
            gathering_threshold: default_gathering_threshold(),
            force_action_threshold: default_force_action_threshold(),
        }
    }
}

/// [coordination] 段：跨进程标志与完结记录的保留时长
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinationSection {
    /// 取消标志 TTL（秒），防止孤儿标志永久残留
    #[serde(default = "default_cancel_flag_ttl_secs")]
    pub cancel_flag_ttl_secs: u64,
    /// 完结会话记录保留时长（秒），0 为永久
    #[serde(default = "default_completed_session_ttl_secs")]
    pub completed_session_ttl_secs: u64,
}

fn default_cancel_flag_ttl_secs() -> u64 {
    3600
}

fn default_completed_session_ttl_secs() -> u64 {
    7 * 24 * 3600
}

impl Default for CoordinationSection {
    fn default() -> Self {
        Self {
            cancel_flag_ttl_secs: default_cancel_flag_ttl_secs(),
            completed_session_ttl_secs: default_completed_session_ttl_secs(),
        }
    }
}

impl CoordinationSection {
    pub fn cancel_flag_ttl(&self) -> Option<Duration> {
        (self.cancel_flag_ttl_secs > 0).then(|| Duration::from_secs(self.cancel_flag_ttl_secs))
    }

    pub fn completed_session_ttl(&self) -> Option<Duration> {
        (self.completed_session_ttl_secs > 0)
            .then(|| Duration::from_secs(self.completed_session_ttl_secs))
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
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
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_supervision_policy() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.supervisor.recent_call_window, 10);
        assert_eq!(cfg.supervisor.loop_threshold, 3);
        assert_eq!(cfg.supervisor.gathering_threshold, 3);
        assert!(cfg.coordination.cancel_flag_ttl().is_some());
    }

    #[test]
    fn test_zero_ttl_means_forever() {
        let section = CoordinationSection {
            cancel_flag_ttl_secs: 0,
            completed_session_ttl_secs: 0,
        };
        assert!(section.cancel_flag_ttl().is_none());
        assert!(section.completed_session_ttl().is_none());
    }
}
