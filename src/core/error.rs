//! 监管错误类型
//!
//! 调用方依据错误种类分支：Cancelled / LoopDetected 应停止推理循环，
//! ToolFailed 可换参数重试；协作方（叙述、平台会话）失败只记日志，从不进入此枚举。

use thiserror::Error;

use crate::coordination::StoreError;

/// 取消来源：本进程信号、共享存储中的取消标志、或排队的 stop 消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// 进程内 CancellationToken 已触发（如上游超时）
    LocalSignal,
    /// 协调存储中存在该会话的取消标志
    ExternalFlag,
    /// 排队消息中出现 type=stop
    StopMessage,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CancelReason::LocalSignal => "local signal",
            CancelReason::ExternalFlag => "external cancellation flag",
            CancelReason::StopMessage => "stop message",
        };
        f.write_str(s)
    }
}

/// 监管执行过程中的错误（Cancelled / LoopDetected 由监管器在真实工具执行前合成）
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Cancelled ({0})")]
    Cancelled(CancelReason),

    /// 熔断：近期窗口内相同签名的调用达到阈值，真实工具未被执行
    #[error("Loop detected for tool '{tool}': {repeats} identical calls in recent window")]
    LoopDetected { tool: String, repeats: usize },

    /// 被包裹工具自身的失败，原始错误文本原样保留并向上传播
    #[error("Tool execution failed: {0}")]
    ToolFailed(String),

    /// 协调存储读写失败（存储即监管信道，必须向上传播）
    #[error("Coordination store error: {0}")]
    Store(#[from] StoreError),
}

impl SupervisorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SupervisorError::Cancelled(_))
    }

    pub fn is_loop_detected(&self) -> bool {
        matches!(self, SupervisorError::LoopDetected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failed_preserves_original_text() {
        let err = SupervisorError::ToolFailed("404 issue not found".to_string());
        assert_eq!(err.to_string(), "Tool execution failed: 404 issue not found");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_kind_helpers() {
        assert!(SupervisorError::Cancelled(CancelReason::StopMessage).is_cancelled());
        assert!(SupervisorError::LoopDetected {
            tool: "search".to_string(),
            repeats: 3
        }
        .is_loop_detected());
    }
}
