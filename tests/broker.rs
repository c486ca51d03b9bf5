//! Broker protocol and worker delivery over real sockets.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use traffic_control::broker::BrokerClient;
use traffic_control::lifecycle::Shutdown;
use traffic_control::worker::{Notifier, NotifyError, SignupEvent, Worker};

mod common;

fn client(addr: std::net::SocketAddr) -> BrokerClient {
    BrokerClient::new(addr.to_string(), Duration::from_secs(2))
}

#[tokio::test]
async fn push_pop_empty() {
    let shutdown = Shutdown::new();
    let addr = common::start_broker(&shutdown).await;
    let broker = client(addr);

    let payload = r#"{"email":"a@x.com","name":"A"}"#;
    broker.push(payload).await.unwrap();

    assert_eq!(broker.pop().await.unwrap().as_deref(), Some(payload));
    assert_eq!(broker.pop().await.unwrap(), None);
    shutdown.trigger();
}

async fn exchange(
    writer: &mut OwnedWriteHalf,
    lines: &mut Lines<BufReader<OwnedReadHalf>>,
    line: &str,
) -> String {
    writer.write_all(format!("{}\n", line).as_bytes()).await.unwrap();
    lines.next_line().await.unwrap().unwrap()
}

#[tokio::test]
async fn one_connection_carries_many_commands() {
    let shutdown = Shutdown::new();
    let addr = common::start_broker(&shutdown).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    assert_eq!(exchange(&mut writer, &mut lines, "first").await, "ACK");
    assert_eq!(exchange(&mut writer, &mut lines, "second").await, "ACK");
    assert_eq!(exchange(&mut writer, &mut lines, "POP").await, "first");
    assert_eq!(exchange(&mut writer, &mut lines, "POP").await, "second");
    assert_eq!(exchange(&mut writer, &mut lines, "POP").await, "EMPTY");
    shutdown.trigger();
}

#[tokio::test]
async fn concurrent_producers_lose_nothing() {
    let shutdown = Shutdown::new();
    let addr = common::start_broker(&shutdown).await;

    let mut handles = Vec::new();
    for p in 0..8 {
        let broker = client(addr);
        handles.push(tokio::spawn(async move {
            for i in 0..10 {
                broker.push(&format!("p{}-m{}", p, i)).await.unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let broker = client(addr);
    let mut popped = Vec::new();
    while let Some(payload) = broker.pop().await.unwrap() {
        popped.push(payload);
    }
    assert_eq!(popped.len(), 80);

    // per-producer order survives interleaving
    for p in 0..8 {
        let prefix = format!("p{}-", p);
        let own: Vec<&String> = popped.iter().filter(|m| m.starts_with(&prefix)).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("p{}-m{}", p, i)).collect();
        assert_eq!(own, expected.iter().collect::<Vec<_>>());
    }
    shutdown.trigger();
}

#[tokio::test]
async fn overlong_line_is_dropped_not_stored() {
    let shutdown = Shutdown::new();
    let addr = common::start_broker(&shutdown).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let oversized = format!("{}\n", "x".repeat(traffic_control::net::MAX_LINE_LENGTH + 1));
    let _ = writer.write_all(oversized.as_bytes()).await;
    let reply = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .unwrap();
    assert!(!matches!(reply, Ok(Some(_))), "oversized line must not be acknowledged");

    assert_eq!(client(addr).pop().await.unwrap(), None);
    shutdown.trigger();
}

#[derive(Clone, Default)]
struct Recorder {
    sent: Arc<Mutex<Vec<SignupEvent>>>,
}

impl Notifier for Recorder {
    async fn notify(&self, event: &SignupEvent) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[tokio::test]
async fn worker_delivers_published_signups() {
    let shutdown = Shutdown::new();
    let addr = common::start_broker(&shutdown).await;
    let producer = client(addr);

    producer.publish(&SignupEvent::new("a@x.com", "A")).await.unwrap();
    producer.push("garbage").await.unwrap();
    producer.publish(&SignupEvent::new("b@x.com", "B")).await.unwrap();

    let recorder = Recorder::default();
    let worker = Worker::new(client(addr), recorder.clone(), Duration::from_millis(10));
    let handle = tokio::spawn(worker.run(shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

    let sent = recorder.sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![SignupEvent::new("a@x.com", "A"), SignupEvent::new("b@x.com", "B")]
    );
    assert_eq!(producer.pop().await.unwrap(), None);
}
