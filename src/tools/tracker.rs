//! 执行追踪：本进程内的调用簿记与熔断窗口
//!
//! 记录已用工具、已完成的行动、以及最近 N 次调用的签名环形窗口。
//! 签名 = 工具名 + 参数的确定性序列化（serde_json 的 map 按键排序），
//! 对无参数工具退化为「检测无参调用」—— 与原始行为保持一致，不做加宽。

use std::collections::{BTreeSet, VecDeque};

use serde_json::Value;

/// 熔断窗口默认长度
pub const DEFAULT_RECENT_WINDOW: usize = 10;
/// 默认熔断阈值：窗口内相同签名达到此数（含本次）即拒绝执行
pub const DEFAULT_LOOP_THRESHOLD: usize = 3;

/// 进程内执行追踪器（绝不外部持久化）
#[derive(Debug)]
pub struct ExecutionTracker {
    tools_used: BTreeSet<String>,
    actions_performed: Vec<String>,
    recent_tool_calls: VecDeque<String>,
    window: usize,
    ended_explicitly: bool,
}

impl ExecutionTracker {
    pub fn new(window: usize) -> Self {
        Self {
            tools_used: BTreeSet::new(),
            actions_performed: Vec::new(),
            recent_tool_calls: VecDeque::new(),
            window: window.max(1),
            ended_explicitly: false,
        }
    }

    /// 调用签名：工具名 + 第一实参（args 整体）的紧凑 JSON
    pub fn call_signature(tool: &str, args: &Value) -> String {
        format!("{tool}:{args}")
    }

    /// 记录本次签名并返回窗口内的出现次数（含本次）；超窗时淘汰最旧
    pub fn observe_call(&mut self, signature: String) -> usize {
        self.recent_tool_calls.push_back(signature);
        if self.recent_tool_calls.len() > self.window {
            self.recent_tool_calls.pop_front();
        }
        let newest = self
            .recent_tool_calls
            .back()
            .cloned()
            .unwrap_or_default();
        self.recent_tool_calls
            .iter()
            .filter(|s| **s == newest)
            .count()
    }

    pub fn record_tool(&mut self, name: impl Into<String>) {
        self.tools_used.insert(name.into());
    }

    /// 记录一次已完成的改变性操作
    pub fn record_action(&mut self, description: impl Into<String>) {
        self.actions_performed.push(description.into());
    }

    /// 推理循环显式宣告结束
    pub fn mark_ended(&mut self) {
        self.ended_explicitly = true;
    }

    pub fn tools_used(&self) -> &BTreeSet<String> {
        &self.tools_used
    }

    pub fn actions_performed(&self) -> &[String] {
        &self.actions_performed
    }

    pub fn ended_explicitly(&self) -> bool {
        self.ended_explicitly
    }
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signature_is_deterministic_for_equal_args() {
        // serde_json 的对象键有序，字段书写顺序不影响签名
        let a = ExecutionTracker::call_signature("search", &json!({"q": "bug", "page": 1}));
        let b = ExecutionTracker::call_signature("search", &json!({"page": 1, "q": "bug"}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_differs_by_tool_and_args() {
        let args = json!({"q": "bug"});
        assert_ne!(
            ExecutionTracker::call_signature("search", &args),
            ExecutionTracker::call_signature("code_grep", &args)
        );
        assert_ne!(
            ExecutionTracker::call_signature("search", &json!({"q": "bug"})),
            ExecutionTracker::call_signature("search", &json!({"q": "fix"}))
        );
    }

    #[test]
    fn test_observe_counts_include_current_call() {
        let mut tracker = ExecutionTracker::default();
        let sig = ExecutionTracker::call_signature("search", &json!({"q": "x"}));
        assert_eq!(tracker.observe_call(sig.clone()), 1);
        assert_eq!(tracker.observe_call(sig.clone()), 2);
        assert_eq!(tracker.observe_call(sig), 3);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut tracker = ExecutionTracker::new(3);
        let repeated = ExecutionTracker::call_signature("search", &json!({"q": "x"}));
        tracker.observe_call(repeated.clone());
        // 两次其他调用把 repeated 挤出窗口
        tracker.observe_call(ExecutionTracker::call_signature("cat", &json!({"path": "a"})));
        tracker.observe_call(ExecutionTracker::call_signature("cat", &json!({"path": "b"})));
        assert_eq!(tracker.observe_call(repeated), 1);
    }

    #[test]
    fn test_bookkeeping_accumulates() {
        let mut tracker = ExecutionTracker::default();
        tracker.record_tool("search");
        tracker.record_tool("search");
        tracker.record_tool("code_write");
        tracker.record_action("code_write({\"path\":\"a.rs\"})");
        assert_eq!(tracker.tools_used().len(), 2);
        assert_eq!(tracker.actions_performed().len(), 1);
        assert!(!tracker.ended_explicitly());
        tracker.mark_ended();
        assert!(tracker.ended_explicitly());
    }

    #[test]
    fn test_no_arg_calls_share_a_signature() {
        // 原始行为：无意义首实参退化为「无参调用」检测
        let mut tracker = ExecutionTracker::default();
        let sig = ExecutionTracker::call_signature("ls", &Value::Null);
        tracker.observe_call(sig.clone());
        assert_eq!(tracker.observe_call(sig), 2);
    }
}
