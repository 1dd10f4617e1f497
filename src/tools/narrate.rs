//! 调用叙述启发式
//!
//! 把工具调用翻译成面向用户的一句话：执行前的描述、成功后的摘要、
//! 失败后的分类与补救提示。失败提示是有界的 (子串, 提示) 查表，
//! 只影响呈现，绝不改变错误是否传播。

use serde_json::Value;

use super::catalog::ToolCategory;

/// 预览截断长度（字符）
pub const PREVIEW_CHARS: usize = 200;

/// 截断到 PREVIEW_CHARS 个字符，超出时追加省略号
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// 执行前描述：类别动词 + 工具名 + 参数预览
pub fn describe_call(tool: &str, category: ToolCategory, args: &Value) -> String {
    let verb = match category {
        ToolCategory::Search => "Searching with",
        ToolCategory::Read => "Reading with",
        ToolCategory::Analysis => "Analyzing with",
        ToolCategory::Action => "Executing",
        ToolCategory::Uncategorized => "Calling",
    };
    if args.is_null() {
        format!("{verb} {tool}")
    } else {
        format!("{verb} {tool}: {}", preview(&args.to_string()))
    }
}

/// 成功摘要：按类别取不同侧重
///
/// - Search：结果条数（数组本身或常见结果字段）
/// - Read：字节数与行数（字符串结果）
/// - Action：创建/更新对象的标识字段
/// - 其余：通用截断预览
pub fn success_summary(tool: &str, category: ToolCategory, output: &Value) -> String {
    match category {
        ToolCategory::Search => {
            if let Some(n) = result_count(output) {
                return format!("{tool}: {n} results");
            }
            format!("{tool}: {}", preview(&render(output)))
        }
        ToolCategory::Read => {
            if let Value::String(s) = output {
                let lines = s.lines().count();
                return format!("{tool}: read {} bytes ({lines} lines)", s.len());
            }
            format!("{tool}: {}", preview(&render(output)))
        }
        ToolCategory::Action => {
            if let Some(ident) = created_identifier(output) {
                return format!("{tool}: done ({ident})");
            }
            format!("{tool}: done, {}", preview(&render(output)))
        }
        ToolCategory::Analysis | ToolCategory::Uncategorized => {
            format!("{tool}: {}", preview(&render(output)))
        }
    }
}

/// 数组长度或常见结果字段（results / items / matches）的长度
fn result_count(output: &Value) -> Option<usize> {
    if let Value::Array(items) = output {
        return Some(items.len());
    }
    let obj = output.as_object()?;
    for field in ["results", "items", "matches"] {
        if let Some(Value::Array(items)) = obj.get(field) {
            return Some(items.len());
        }
    }
    None
}

/// 创建类结果里的标识字段（id / number / url / path）
fn created_identifier(output: &Value) -> Option<String> {
    let obj = output.as_object()?;
    for field in ["id", "number", "url", "path"] {
        match obj.get(field) {
            Some(Value::String(s)) if !s.is_empty() => return Some(format!("{field}={s}")),
            Some(Value::Number(n)) => return Some(format!("{field}={n}")),
            _ => {}
        }
    }
    None
}

fn render(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 失败分类与补救提示：有序 (子串, 种类, 提示) 查表，小写匹配，首个命中生效
const FAILURE_HINTS: &[(&str, &str, &str)] = &[
    ("not found", "not-found", "Check that the identifier or path exists before retrying."),
    ("404", "not-found", "Check that the identifier or path exists before retrying."),
    ("permission", "permission", "The agent lacks access; try a different target or report the restriction."),
    ("forbidden", "permission", "The agent lacks access; try a different target or report the restriction."),
    ("403", "permission", "The agent lacks access; try a different target or report the restriction."),
    ("rate limit", "rate-limit", "Back off before retrying this tool."),
    ("too many requests", "rate-limit", "Back off before retrying this tool."),
    ("429", "rate-limit", "Back off before retrying this tool."),
    ("conflict", "stale-content", "Re-read the current content and retry with a fresh base."),
    ("stale", "stale-content", "Re-read the current content and retry with a fresh base."),
    ("412", "stale-content", "Re-read the current content and retry with a fresh base."),
    ("timed out", "network", "Transient network issue; a retry may succeed."),
    ("timeout", "network", "Transient network issue; a retry may succeed."),
    ("connection", "network", "Transient network issue; a retry may succeed."),
    ("network", "network", "Transient network issue; a retry may succeed."),
];

/// 从错误文本得到 (种类, 提示)；未命中返回 None
pub fn classify_failure(error: &str) -> Option<(&'static str, &'static str)> {
    let lower = error.to_lowercase();
    FAILURE_HINTS
        .iter()
        .find(|(needle, _, _)| lower.contains(needle))
        .map(|(_, kind, hint)| (*kind, *hint))
}

/// 失败叙述：工具、种类、原文预览与提示拼成一句话
pub fn failure_summary(tool: &str, error: &str) -> String {
    match classify_failure(error) {
        Some((kind, hint)) => {
            format!("{tool} failed ({kind}): {}. {hint}", preview(error))
        }
        None => format!("{tool} failed: {}", preview(error)),
    }
}

/// 熔断叙述：解释为何拒绝执行并建议换路
pub fn loop_detected_summary(tool: &str, repeats: usize) -> String {
    format!(
        "Stopped repeating call to {tool}: the same arguments were used {repeats} times in a row. \
         Try a different approach or different arguments."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_summary_counts_results() {
        let out = json!([1, 2, 3]);
        assert_eq!(
            success_summary("search", ToolCategory::Search, &out),
            "search: 3 results"
        );
        let nested = json!({"results": ["a", "b"]});
        assert_eq!(
            success_summary("search", ToolCategory::Search, &nested),
            "search: 2 results"
        );
    }

    #[test]
    fn test_read_summary_reports_size() {
        let out = json!("line one\nline two");
        assert_eq!(
            success_summary("cat", ToolCategory::Read, &out),
            "cat: read 17 bytes (2 lines)"
        );
    }

    #[test]
    fn test_action_summary_surfaces_identifier() {
        let out = json!({"number": 128, "title": "fix"});
        assert_eq!(
            success_summary("create", ToolCategory::Action, &out),
            "create: done (number=128)"
        );
    }

    #[test]
    fn test_generic_summary_truncates() {
        let long = "x".repeat(300);
        let out = json!(long);
        let summary = success_summary("echo", ToolCategory::Uncategorized, &out);
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() < 220);
    }

    #[test]
    fn test_failure_classification_order() {
        assert_eq!(classify_failure("Issue Not Found").unwrap().0, "not-found");
        assert_eq!(classify_failure("HTTP 429 too many requests").unwrap().0, "rate-limit");
        assert_eq!(classify_failure("request timed out").unwrap().0, "network");
        assert!(classify_failure("something else entirely").is_none());
    }

    #[test]
    fn test_failure_summary_keeps_original_text() {
        let summary = failure_summary("send", "403 Forbidden");
        assert!(summary.contains("403 Forbidden"));
        assert!(summary.contains("permission"));
    }
}
