//! Broker TCP binding.

use std::sync::Arc;

use crate::broker::protocol::{Command, Reply};
use crate::broker::queue::MessageQueue;
use crate::net::LineHandler;
use crate::observability::metrics;

/// Applies broker commands to the shared queue.
pub struct BrokerHandler<Q: MessageQueue> {
    queue: Arc<Q>,
}

impl<Q: MessageQueue> BrokerHandler<Q> {
    pub fn new(queue: Arc<Q>) -> Self {
        Self { queue }
    }

    /// Execute one command against the queue.
    pub fn execute(&self, command: Command<'_>) -> Reply {
        match command {
            Command::Pop => match self.queue.pop() {
                Some(payload) => {
                    metrics::record_broker_op("pop");
                    Reply::Message(payload)
                }
                None => Reply::Empty,
            },
            Command::Push(payload) => {
                self.queue.push(payload.to_string());
                metrics::record_broker_op("push");
                Reply::Ack
            }
        }
    }
}

impl<Q: MessageQueue> LineHandler for BrokerHandler<Q> {
    fn name(&self) -> &'static str {
        "broker"
    }

    fn handle_line(&self, line: &str) -> String {
        let reply = self.execute(Command::parse(line));
        metrics::record_queue_depth(self.queue.len());
        reply.into_line()
    }
}
