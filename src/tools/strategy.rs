//! 执行策略阶段机
//!
//! planning → gathering → acting 的单调格，不是一般状态机：没有回退路径，
//! 也没有外部触发，唯一驱动是监管器对每次调用的分类。其存在只为给
//! 上层规划启发式一个「何时该动手」的偏置信号。

use std::collections::HashMap;

use super::catalog::ToolCategory;

/// 运行阶段；只会前进
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Planning,
    Gathering,
    Acting,
}

/// 进入 gathering 所需的调查类（search+read+analysis）调用数
pub const DEFAULT_GATHERING_THRESHOLD: u32 = 3;
/// 无任何行动时，调查类调用达到此数则建议强制行动
pub const DEFAULT_FORCE_ACTION_THRESHOLD: u32 = 8;

/// 进程内策略状态：阶段 + 各类别操作计数
#[derive(Debug)]
pub struct ExecutionStrategy {
    phase: Phase,
    tool_usage_counts: HashMap<String, u32>,
    search_operations: u32,
    read_operations: u32,
    analysis_operations: u32,
    action_operations: u32,
    has_started_actions: bool,
    should_force_action: bool,
    gathering_threshold: u32,
    force_action_threshold: u32,
}

impl ExecutionStrategy {
    pub fn new(gathering_threshold: u32, force_action_threshold: u32) -> Self {
        Self {
            phase: Phase::Planning,
            tool_usage_counts: HashMap::new(),
            search_operations: 0,
            read_operations: 0,
            analysis_operations: 0,
            action_operations: 0,
            has_started_actions: false,
            should_force_action: false,
            gathering_threshold: gathering_threshold.max(1),
            force_action_threshold,
        }
    }

    /// 登记一次调用并推进阶段（唯一的阶段驱动入口）
    pub fn record(&mut self, tool: &str, category: ToolCategory) {
        *self.tool_usage_counts.entry(tool.to_string()).or_insert(0) += 1;

        match category {
            ToolCategory::Search => self.search_operations += 1,
            ToolCategory::Read => self.read_operations += 1,
            ToolCategory::Analysis => self.analysis_operations += 1,
            ToolCategory::Action => self.action_operations += 1,
            ToolCategory::Uncategorized => {}
        }

        if category == ToolCategory::Action {
            // 行动开始后阶段不可逆地钉在 Acting
            self.has_started_actions = true;
            self.phase = Phase::Acting;
            return;
        }

        let investigation =
            self.search_operations + self.read_operations + self.analysis_operations;
        if self.phase == Phase::Planning && investigation >= self.gathering_threshold {
            self.phase = Phase::Gathering;
        }
        if !self.has_started_actions && investigation >= self.force_action_threshold {
            self.should_force_action = true;
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_started_actions(&self) -> bool {
        self.has_started_actions
    }

    /// 调查已久仍无行动时为 true；仅供上层规划偏置，不在本层卡任何调用
    pub fn should_force_action(&self) -> bool {
        self.should_force_action
    }

    pub fn usage_count(&self, tool: &str) -> u32 {
        self.tool_usage_counts.get(tool).copied().unwrap_or(0)
    }

    pub fn operation_counts(&self) -> (u32, u32, u32, u32) {
        (
            self.search_operations,
            self.read_operations,
            self.analysis_operations,
            self.action_operations,
        )
    }
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_GATHERING_THRESHOLD, DEFAULT_FORCE_ACTION_THRESHOLD)
    }
}
