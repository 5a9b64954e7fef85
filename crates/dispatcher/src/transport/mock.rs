//! Mock worker 传输
//!
//! 用于单元测试的 mock 实现，支持按脚本注入每次投递的结局。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{ContractError, DeliveryReply, Task, WorkerChannel, WorkerConnector};
use tracing::instrument;

/// 脚本化的单次投递结局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// worker 接受 (accepted=true)
    Accept,
    /// worker 显式拒绝 (accepted=false)
    Reject,
    /// 传输层错误
    Disconnect,
    /// 永不响应（由调用方的截止时间触发超时）
    Stall,
}

/// Mock worker 配置
#[derive(Debug, Default, Clone)]
pub struct MockWorkerConfig {
    /// 拨号直接失败
    pub refuse_dial: bool,
    /// 按投递顺序消费的结局脚本；耗尽后默认 Accept
    pub outcomes: Vec<ScriptedOutcome>,
    /// 每次投递前的人为延迟（用于队列回压测试）
    pub deliver_delay: Option<Duration>,
}

#[derive(Debug)]
struct MockShared {
    refuse_dial: AtomicBool,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    deliver_delay: Option<Duration>,
    /// 拨号次数
    dials: AtomicU32,
    /// 投递次数（含 Stall）
    delivers: AtomicU32,
}

/// Mock 连接器
pub struct MockConnector {
    shared: Arc<MockShared>,
}

impl MockConnector {
    /// 创建默认 mock（全部接受）
    pub fn new() -> Self {
        Self::with_config(MockWorkerConfig::default())
    }

    /// 使用配置创建 mock
    pub fn with_config(config: MockWorkerConfig) -> Self {
        Self {
            shared: Arc::new(MockShared {
                refuse_dial: AtomicBool::new(config.refuse_dial),
                script: Mutex::new(config.outcomes.into()),
                deliver_delay: config.deliver_delay,
                dials: AtomicU32::new(0),
                delivers: AtomicU32::new(0),
            }),
        }
    }

    /// 取得观测探针；connector 被 Dispatcher 接管后仍可读取计数
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// 对已被接管的 mock 的观测与控制句柄
#[derive(Clone)]
pub struct MockProbe {
    shared: Arc<MockShared>,
}

impl MockProbe {
    /// 拨号次数
    pub fn dial_count(&self) -> u32 {
        self.shared.dials.load(Ordering::SeqCst)
    }

    /// 投递次数
    pub fn deliver_count(&self) -> u32 {
        self.shared.delivers.load(Ordering::SeqCst)
    }

    /// 切换拨号失败开关
    pub fn set_refuse_dial(&self, refuse: bool) {
        self.shared.refuse_dial.store(refuse, Ordering::SeqCst);
    }

    /// 追加结局脚本
    pub fn push_outcomes(&self, outcomes: &[ScriptedOutcome]) {
        self.shared.script.lock().unwrap().extend(outcomes.iter().copied());
    }
}

impl WorkerConnector for MockConnector {
    type Channel = MockChannel;

    #[instrument(name = "mock_dial", skip(self), fields(addr = %addr))]
    async fn dial(&self, addr: &str) -> Result<MockChannel, ContractError> {
        self.shared.dials.fetch_add(1, Ordering::SeqCst);

        if self.shared.refuse_dial.load(Ordering::SeqCst) {
            return Err(ContractError::dial(addr, "mock dial refused"));
        }

        Ok(MockChannel {
            shared: Arc::clone(&self.shared),
            peer: addr.to_string(),
        })
    }
}

/// Mock 通道
pub struct MockChannel {
    shared: Arc<MockShared>,
    peer: String,
}

impl WorkerChannel for MockChannel {
    fn peer(&self) -> &str {
        &self.peer
    }

    #[instrument(name = "mock_deliver", skip(self, _task), fields(peer = %self.peer))]
    async fn deliver(&mut self, _task: &Task) -> Result<DeliveryReply, ContractError> {
        self.shared.delivers.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.shared.deliver_delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .shared
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedOutcome::Accept);

        match outcome {
            ScriptedOutcome::Accept => Ok(DeliveryReply::accept()),
            ScriptedOutcome::Reject => Ok(DeliveryReply::reject("mock rejection")),
            ScriptedOutcome::Disconnect => {
                Err(ContractError::delivery(&self.peer, "mock transport failure"))
            }
            ScriptedOutcome::Stall => std::future::pending().await,
        }
    }
}
