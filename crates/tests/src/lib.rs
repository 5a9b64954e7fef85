//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 真实 TCP worker stub 的 e2e 测试
//! - 重试/超时行为回归

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

/// In-process TCP worker stub speaking the courier wire protocol.
///
/// 按脚本应答：Accept / Reject / Ignore（不回包，交给调用方超时）。
#[cfg(test)]
mod worker_stub {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use contracts::{DeliveryReply, WireFormat};
    use dispatcher::transport::tcp::{decode_envelope, encode_reply_frame};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[derive(Debug, Clone, Copy)]
    pub enum StubReply {
        Accept,
        Reject,
        /// Swallow the request and answer nothing
        Ignore,
    }

    pub struct WorkerStub {
        pub addr: String,
        connections: Arc<AtomicU32>,
        received: Arc<Mutex<Vec<String>>>,
    }

    impl WorkerStub {
        pub async fn start(format: WireFormat, script: Vec<StubReply>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap().to_string();
            let connections = Arc::new(AtomicU32::new(0));
            let received = Arc::new(Mutex::new(Vec::new()));
            let script = Arc::new(Mutex::new(VecDeque::from(script)));

            let conn_counter = Arc::clone(&connections);
            let received_log = Arc::clone(&received);
            tokio::spawn(async move {
                loop {
                    let Ok((socket, _)) = listener.accept().await else {
                        break;
                    };
                    conn_counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve_connection(
                        socket,
                        format,
                        Arc::clone(&script),
                        Arc::clone(&received_log),
                    ));
                }
            });

            Self {
                addr,
                connections,
                received,
            }
        }

        pub fn connection_count(&self) -> u32 {
            self.connections.load(Ordering::SeqCst)
        }

        pub fn received_task_ids(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }
    }

    async fn serve_connection(
        mut socket: TcpStream,
        format: WireFormat,
        script: Arc<Mutex<VecDeque<StubReply>>>,
        received: Arc<Mutex<Vec<String>>>,
    ) {
        loop {
            let mut len_buf = [0u8; 4];
            if socket.read_exact(&mut len_buf).await.is_err() {
                break;
            }
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut body = vec![0u8; len];
            if socket.read_exact(&mut body).await.is_err() {
                break;
            }

            let envelope = decode_envelope(&body, format).unwrap();
            received.lock().unwrap().push(envelope.task.id.clone());

            let reply = script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(StubReply::Accept);
            let frame = match reply {
                StubReply::Accept => encode_reply_frame(&DeliveryReply::accept(), format).unwrap(),
                StubReply::Reject => {
                    encode_reply_frame(&DeliveryReply::reject("stub rejection"), format).unwrap()
                }
                StubReply::Ignore => continue,
            };
            if socket.write_all(&frame).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{BackoffPolicy, RetryPolicy, Task, WireFormat};
    use dispatcher::{Dispatcher, DispatcherHandle, TcpConnector};

    use crate::worker_stub::{StubReply, WorkerStub};

    /// Retry policy with millisecond pacing so e2e runs stay fast
    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            request_timeout: Duration::from_millis(200),
            backoff: BackoffPolicy::Fixed {
                delay: Duration::from_millis(20),
            },
        }
    }

    fn tcp_dispatcher(addr: &str, format: WireFormat, policy: RetryPolicy) -> Dispatcher<TcpConnector> {
        Dispatcher::new(addr, TcpConnector::new(format), policy)
    }

    #[tokio::test]
    async fn test_e2e_accept_first_attempt() {
        let stub = WorkerStub::start(WireFormat::Json, vec![StubReply::Accept]).await;
        let mut courier = tcp_dispatcher(&stub.addr, WireFormat::Json, fast_policy(5));

        courier.submit(&Task::with_payload("t-1", "reindex", &b"shard=7"[..])).await;

        let snapshot = courier.metrics().snapshot();
        assert_eq!(snapshot.attempts, 1);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.exhausted, 0);
        assert_eq!(stub.received_task_ids(), vec!["t-1".to_string()]);
    }

    #[tokio::test]
    async fn test_e2e_reject_twice_then_accept() {
        let stub = WorkerStub::start(
            WireFormat::Json,
            vec![StubReply::Reject, StubReply::Reject, StubReply::Accept],
        )
        .await;
        let mut courier = tcp_dispatcher(&stub.addr, WireFormat::Json, fast_policy(5));

        courier.submit(&Task::new("t-1", "reindex")).await;

        let snapshot = courier.metrics().snapshot();
        assert_eq!(snapshot.attempts, 3, "terminates right after acceptance");
        assert_eq!(snapshot.rejected, 2);
        assert_eq!(snapshot.accepted, 1);
        // The same task went over the wire on every attempt
        assert_eq!(stub.received_task_ids().len(), 3);
    }

    #[tokio::test]
    async fn test_e2e_bincode_wire_format() {
        let stub = WorkerStub::start(WireFormat::Bincode, vec![StubReply::Accept]).await;
        let mut courier = tcp_dispatcher(&stub.addr, WireFormat::Bincode, fast_policy(5));

        courier
            .submit(&Task::with_payload("t-bin", "snapshot", vec![0u8, 1, 2, 255]))
            .await;

        assert_eq!(courier.metrics().accepted(), 1);
        assert_eq!(stub.received_task_ids(), vec!["t-bin".to_string()]);
    }

    #[tokio::test]
    async fn test_e2e_unreachable_worker_drops_task_without_attempts() {
        // Bind then drop so the port is very likely unoccupied
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut courier = tcp_dispatcher(&addr, WireFormat::Json, fast_policy(5));
        courier.submit(&Task::new("t-1", "reindex")).await;

        let snapshot = courier.metrics().snapshot();
        assert_eq!(snapshot.dial_failures, 1);
        assert_eq!(snapshot.attempts, 0, "dial failure short-circuits the loop");
        assert!(!courier.is_connected());
    }

    #[tokio::test]
    async fn test_e2e_channel_reused_across_submits() {
        let stub = WorkerStub::start(WireFormat::Json, Vec::new()).await;
        let mut courier = tcp_dispatcher(&stub.addr, WireFormat::Json, fast_policy(5));

        courier.submit(&Task::new("t-1", "reindex")).await;
        courier.submit(&Task::new("t-2", "snapshot")).await;

        assert_eq!(stub.connection_count(), 1, "second submit must not re-dial");
        let snapshot = courier.metrics().snapshot();
        assert_eq!(snapshot.accepted, 2);
        assert_eq!(stub.received_task_ids(), vec!["t-1".to_string(), "t-2".to_string()]);
    }

    #[tokio::test]
    async fn test_e2e_silent_worker_exhausts_with_timeouts() {
        let stub = WorkerStub::start(
            WireFormat::Json,
            vec![StubReply::Ignore, StubReply::Ignore],
        )
        .await;
        let mut courier = tcp_dispatcher(&stub.addr, WireFormat::Json, fast_policy(2));

        courier.submit(&Task::new("t-1", "reindex")).await;

        let snapshot = courier.metrics().snapshot();
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.timeouts, 2);
        assert_eq!(snapshot.exhausted, 1);
        assert_eq!(snapshot.accepted, 0);
    }

    #[tokio::test]
    async fn test_e2e_handle_drains_queue_over_tcp() {
        let stub = WorkerStub::start(WireFormat::Json, Vec::new()).await;
        let courier = tcp_dispatcher(&stub.addr, WireFormat::Json, fast_policy(5));
        let handle = DispatcherHandle::spawn(courier, 16);
        let metrics = Arc::clone(handle.metrics());

        for i in 0..4 {
            assert!(handle.try_submit(Task::new(format!("t-{i}"), "reindex")));
        }
        handle.shutdown().await;

        assert_eq!(metrics.accepted(), 4);
        assert_eq!(stub.connection_count(), 1);
        assert_eq!(stub.received_task_ids().len(), 4);
    }

    #[tokio::test]
    async fn test_e2e_config_driven_dispatch() {
        use config_loader::{ConfigFormat, ConfigLoader};

        let stub = WorkerStub::start(WireFormat::Json, Vec::new()).await;
        let content = format!(
            r#"
[worker]
addr = "{}"

[retry]
max_attempts = 2
request_timeout_secs = 1
retry_delay_secs = 1

[[tasks]]
id = "cfg-1"
name = "reindex"
payload = "shard=1"

[[tasks]]
id = "cfg-2"
name = "snapshot"
"#,
            stub.addr
        );
        let blueprint = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let mut courier = dispatcher::create_dispatcher(&blueprint);
        for task in blueprint.to_tasks() {
            courier.submit(&task).await;
        }

        assert_eq!(courier.metrics().accepted(), 2);
        assert_eq!(
            stub.received_task_ids(),
            vec!["cfg-1".to_string(), "cfg-2".to_string()]
        );
    }
}
