//! 工具分类目录
//!
//! 每个工具归入且仅归入一个类别，注册时静态登记、包装时解析一次，
//! 不在每次调用时从名字子串重新推断。未登记的工具归为 Uncategorized，
//! 不参与任何阶段计数。

use std::collections::HashMap;

/// 工具类别：驱动阶段机与成功摘要的启发式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    /// 检索类（搜索、grep）
    Search,
    /// 读取类（读文件、看 diff、取工单）
    Read,
    /// 分析类（评审、测试检查）
    Analysis,
    /// 行动类（写文件、提交、发消息）：一旦出现，阶段锁定为 Acting
    Action,
    /// 未登记
    Uncategorized,
}

/// 分类目录：name -> category，注册一次，查询 O(1)
#[derive(Clone, Default)]
pub struct ToolCatalog {
    categories: HashMap<String, ToolCategory>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常规智能体工具箱的预置分类
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for name in ["search", "deep_search", "code_grep"] {
            catalog.register(name, ToolCategory::Search);
        }
        for name in ["cat", "ls", "code_read", "git_diff"] {
            catalog.register(name, ToolCategory::Read);
        }
        for name in ["code_review", "test_check"] {
            catalog.register(name, ToolCategory::Analysis);
        }
        for name in [
            "shell",
            "code_edit",
            "code_write",
            "test_run",
            "git_commit",
            "send",
            "create",
        ] {
            catalog.register(name, ToolCategory::Action);
        }
        catalog
    }

    pub fn register(&mut self, name: impl Into<String>, category: ToolCategory) {
        self.categories.insert(name.into(), category);
    }

    pub fn classify(&self, name: &str) -> ToolCategory {
        self.categories
            .get(name)
            .copied()
            .unwrap_or(ToolCategory::Uncategorized)
    }
}
