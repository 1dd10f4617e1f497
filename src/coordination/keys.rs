//! 协调存储键布局
//!
//! 所有跨进程可见的键集中在此定义，避免各处拼接字符串漂移。

/// 会话取消标志（存在即取消）
pub fn cancel_flag(session_id: &str) -> String {
    format!("hive:cancel:{session_id}")
}

/// 会话的排队消息队列（插话与 stop）
pub fn message_queue(session_id: &str) -> String {
    format!("hive:queue:{session_id}")
}

/// 活跃会话记录
pub fn active_session(session_id: &str) -> String {
    format!("hive:session:active:{session_id}")
}

/// 已完结会话记录
pub fn completed_session(session_id: &str) -> String {
    format!("hive:session:completed:{session_id}")
}

/// 活跃会话 ID 索引（集合）
pub fn active_index() -> String {
    "hive:sessions:active".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct_per_session() {
        assert_ne!(cancel_flag("run_a"), cancel_flag("run_b"));
        assert_ne!(active_session("run_a"), completed_session("run_a"));
        assert_ne!(message_queue("run_a"), cancel_flag("run_a"));
    }
}
