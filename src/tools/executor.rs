//! 工具调用监管器
//!
//! wrap(name, executor, ctx) 返回与真实执行器同形的 SupervisedTool，
//! 每次调用按固定顺序执行横切策略：本地取消 → 外部取消 → 熔断 →
//! 排空插话 → 阶段更新 → 叙述 → 真实执行 → 记忆落账。
//! 取消先于熔断检查（被取消的运行不得误报为死循环）；
//! 真实工具的失败在记录后原样向上抛出，绝不转成软成功。

use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::catalog::{ToolCatalog, ToolCategory};
use super::narrate;
use super::strategy::{ExecutionStrategy, Phase};
use super::tracker::ExecutionTracker;
use crate::config::SupervisorSection;
use crate::coordination::{mailbox, CoordinationStore, QueuedMessage, StoreError};
use crate::core::{CancelReason, SupervisorError};
use crate::integrations::{ActivityLogger, PlatformSession, TracingActivityLogger};
use crate::memory::{ActionRecord, MemoryRecorder, NoopRecorder};
use crate::session::{SessionFinalizer, SessionRecord, SessionStore, TerminalStatus, TranscriptTurn};

/// 工具的单向进度回调通道（监管器透传，不拦截）
pub type StatusSender = mpsc::UnboundedSender<String>;

/// 真实工具执行器：args 为 JSON，错误为原始文本
#[async_trait]
pub trait ToolExecute: Send + Sync {
    async fn execute(
        &self,
        args: Value,
        update_status: Option<&StatusSender>,
    ) -> Result<Value, String>;
}

/// 一次运行的共享上下文：标识、协调存储、协作方、追踪与策略状态
///
/// 显式构造并注入（无全局单例），builder 风格配置可选协作方。
pub struct RunContext {
    pub session_id: String,
    pub context_id: String,
    store: Arc<dyn CoordinationStore>,
    sessions: SessionStore,
    recorder: Arc<dyn MemoryRecorder>,
    activity: Arc<dyn ActivityLogger>,
    platform: Option<Arc<dyn PlatformSession>>,
    finalizer: SessionFinalizer,
    cancel_token: CancellationToken,
    tracker: Mutex<ExecutionTracker>,
    strategy: Mutex<ExecutionStrategy>,
    catalog: ToolCatalog,
    loop_threshold: usize,
}

impl RunContext {
    pub fn new(
        session_id: impl Into<String>,
        context_id: impl Into<String>,
        store: Arc<dyn CoordinationStore>,
    ) -> Self {
        let cfg = SupervisorSection::default();
        let sessions = SessionStore::new(store.clone());
        let activity: Arc<dyn ActivityLogger> = Arc::new(TracingActivityLogger);
        let finalizer = SessionFinalizer::new(sessions.clone(), store.clone(), activity.clone());
        Self {
            session_id: session_id.into(),
            context_id: context_id.into(),
            store,
            sessions,
            recorder: Arc::new(NoopRecorder),
            activity,
            platform: None,
            finalizer,
            cancel_token: CancellationToken::new(),
            tracker: Mutex::new(ExecutionTracker::new(cfg.recent_call_window)),
            strategy: Mutex::new(ExecutionStrategy::new(
                cfg.gathering_threshold,
                cfg.force_action_threshold,
            )),
            catalog: ToolCatalog::standard(),
            loop_threshold: cfg.loop_threshold,
        }
    }

    /// 应用配置中的阈值（窗口、熔断、阶段）
    pub fn with_config(mut self, cfg: &SupervisorSection) -> Self {
        self.tracker = Mutex::new(ExecutionTracker::new(cfg.recent_call_window));
        self.strategy = Mutex::new(ExecutionStrategy::new(
            cfg.gathering_threshold,
            cfg.force_action_threshold,
        ));
        self.loop_threshold = cfg.loop_threshold;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn MemoryRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_activity(mut self, activity: Arc<dyn ActivityLogger>) -> Self {
        self.activity = activity;
        self.rebuild_finalizer();
        self
    }

    pub fn with_platform(mut self, platform: Arc<dyn PlatformSession>) -> Self {
        self.platform = Some(platform);
        self.rebuild_finalizer();
        self
    }

    /// 注入本地取消信号（如上游超时的 token）
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    fn rebuild_finalizer(&mut self) {
        let finalizer = SessionFinalizer::new(
            self.sessions.clone(),
            self.store.clone(),
            self.activity.clone(),
        );
        self.finalizer = match &self.platform {
            Some(platform) => finalizer.with_platform(platform.clone()),
            None => finalizer,
        };
    }

    /// 以给定终态完结本会话（推理循环自然结束或出错时由调用方使用）
    pub async fn finalize(
        &self,
        status: TerminalStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        self.finalizer
            .finalize(&self.session_id, &self.context_id, status, error)
            .await
    }

    pub fn is_finalized(&self) -> bool {
        self.finalizer.is_finalized()
    }

    /// 当前阶段（供上层规划偏置）
    pub fn phase(&self) -> Phase {
        self.strategy.lock().unwrap().phase()
    }

    /// 调查已久仍无行动的偏置信号
    pub fn should_force_action(&self) -> bool {
        self.strategy.lock().unwrap().should_force_action()
    }

    /// 已用工具名（进程内权威副本）
    pub fn tools_used(&self) -> Vec<String> {
        self.tracker.lock().unwrap().tools_used().iter().cloned().collect()
    }

    /// 推理循环显式宣告结束
    pub fn mark_ended(&self) {
        self.tracker.lock().unwrap().mark_ended();
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

/// 包装工具：与真实执行器同形，先跑完全部横切检查再委托执行
pub struct SupervisedTool {
    name: String,
    category: ToolCategory,
    inner: Arc<dyn ToolExecute>,
    ctx: Arc<RunContext>,
}

/// 将真实执行器包进监管管线；类别在此解析一次，调用期不再查表
pub fn wrap(
    name: impl Into<String>,
    executor: Arc<dyn ToolExecute>,
    ctx: Arc<RunContext>,
) -> SupervisedTool {
    let name = name.into();
    let category = ctx.catalog.classify(&name);
    SupervisedTool {
        name,
        category,
        inner: executor,
        ctx,
    }
}

impl SupervisedTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ToolCategory {
        self.category
    }

    /// 监管执行：横切策略 + 真实调用 + 落账
    pub async fn execute(
        &self,
        args: Value,
        update_status: Option<&StatusSender>,
    ) -> Result<Value, SupervisorError> {
        let started = Instant::now();
        let ctx = &self.ctx;

        // 1. 本地取消：未做任何工作前直接失败
        if ctx.cancel_token.is_cancelled() {
            self.audit(&args, "cancelled", started);
            return Err(SupervisorError::Cancelled(CancelReason::LocalSignal));
        }

        // 2. 外部取消标志：单次往返；命中则完结并移除活跃记录
        if mailbox::is_cancel_requested(ctx.store.as_ref(), &ctx.session_id).await? {
            // 同时触发本地信号，保证本运行后续任何调用都在第 1 步被拒
            ctx.cancel_token.cancel();
            ctx.finalize(TerminalStatus::Cancelled, None).await?;
            self.audit(&args, "cancelled", started);
            return Err(SupervisorError::Cancelled(CancelReason::ExternalFlag));
        }

        // 3. 熔断：相同签名在窗口内达到阈值则拒绝执行；签名无论结局都已记录
        let signature = ExecutionTracker::call_signature(&self.name, &args);
        let repeats = ctx.tracker.lock().unwrap().observe_call(signature);
        if repeats >= ctx.loop_threshold {
            self.narrate_thought(&narrate::loop_detected_summary(&self.name, repeats))
                .await;
            self.audit(&args, "loop_detected", started);
            return Err(SupervisorError::LoopDetected {
                tool: self.name.clone(),
                repeats,
            });
        }

        // 4. 排空插话：stop 压倒同批所有普通消息；普通消息先持久化再继续
        let queued = mailbox::drain_messages(ctx.store.as_ref(), &ctx.session_id).await?;
        if !queued.is_empty() {
            if queued.iter().any(QueuedMessage::is_stop) {
                self.narrate_response("Stopping immediately: a stop request was received.")
                    .await;
                ctx.cancel_token.cancel();
                ctx.finalize(TerminalStatus::Cancelled, None).await?;
                self.audit(&args, "cancelled", started);
                return Err(SupervisorError::Cancelled(CancelReason::StopMessage));
            }
            self.splice_interjections(&queued).await?;
        }

        // 5. 阶段与用量更新
        ctx.strategy.lock().unwrap().record(&self.name, self.category);

        // 6. 执行前叙述（尽力而为）+ 会话记录标记当前工具
        self.narrate_thought(&narrate::describe_call(&self.name, self.category, &args))
            .await;
        self.update_record(|record| {
            record.current_tool = Some(self.name.clone());
        })
        .await?;

        // 7. 真实执行（update_status 原样透传）
        let result = self.inner.execute(args.clone(), update_status).await;

        match result {
            Ok(output) => {
                // 8. 成功：簿记、摘要叙述、记忆落账，结果原样返回
                {
                    let mut tracker = ctx.tracker.lock().unwrap();
                    tracker.record_tool(&self.name);
                    if self.category == ToolCategory::Action {
                        tracker.record_action(format!("{}({})", self.name, narrate::preview(&args.to_string())));
                    }
                }
                self.update_record(|record| {
                    record.tools_used.insert(self.name.clone());
                    record.current_tool = None;
                })
                .await?;
                self.narrate_thought(&narrate::success_summary(&self.name, self.category, &output))
                    .await;
                self.record_memory(ActionRecord::success(&self.name, args.clone(), output.clone()))
                    .await;
                self.audit(&args, "ok", started);
                Ok(output)
            }
            Err(raw) => {
                // 9. 失败：分类提示 + 记忆落账，原始错误原样上抛
                self.narrate_thought(&narrate::failure_summary(&self.name, &raw))
                    .await;
                self.record_memory(ActionRecord::failure(&self.name, args.clone(), raw.clone()))
                    .await;
                self.audit(&args, "error", started);
                Err(SupervisorError::ToolFailed(raw))
            }
        }
    }

    /// 将普通插话按队列顺序拼入对话并持久化（带原始时间戳）
    async fn splice_interjections(&self, queued: &[QueuedMessage]) -> Result<(), StoreError> {
        let ctx = &self.ctx;
        let Some(mut record) = ctx.sessions.load_active(&ctx.session_id).await? else {
            tracing::warn!(
                session_id = %ctx.session_id,
                "Interjections arrived but no active record exists"
            );
            return Ok(());
        };
        for message in queued {
            if let QueuedMessage::Content { content, timestamp } = message {
                record.push_turn(TranscriptTurn::user_at(content.clone(), *timestamp));
            }
        }
        ctx.sessions.save_active(&record).await
    }

    async fn update_record(
        &self,
        f: impl FnOnce(&mut SessionRecord),
    ) -> Result<(), StoreError> {
        let ctx = &self.ctx;
        if let Some(mut record) = ctx.sessions.load_active(&ctx.session_id).await? {
            f(&mut record);
            record.touch();
            ctx.sessions.save_active(&record).await?;
        }
        Ok(())
    }

    async fn narrate_thought(&self, text: &str) {
        if let Err(e) = self.ctx.activity.thought(&self.ctx.context_id, text).await {
            tracing::warn!(tool = %self.name, error = %e, "Activity narration failed");
        }
    }

    async fn narrate_response(&self, text: &str) {
        if let Err(e) = self.ctx.activity.response(&self.ctx.context_id, text).await {
            tracing::warn!(tool = %self.name, error = %e, "Activity narration failed");
        }
    }

    /// 记忆落账失败不改变调用结局，只升级日志
    async fn record_memory(&self, entry: ActionRecord) {
        if let Err(e) = self
            .ctx
            .recorder
            .record(&self.ctx.context_id, "action", entry)
            .await
        {
            tracing::error!(tool = %self.name, error = %e, "Memory record failed");
        }
    }

    /// 结构化审计日志，每次监管调用一条
    fn audit(&self, args: &Value, outcome: &str, started: Instant) {
        let audit = serde_json::json!({
            "event": "tool_audit",
            "session": self.ctx.session_id,
            "tool": self.name,
            "outcome": outcome,
            "duration_ms": started.elapsed().as_millis() as u64,
            "args_preview": narrate::preview(&args.to_string()),
        });
        tracing::info!(audit = %audit, "tool");
    }
}
