//! Message broker subsystem.
//!
//! # Data Flow
//! ```text
//! producer ──"<payload>\n"──▶ line server ─▶ BrokerHandler ─▶ queue.push ─▶ "ACK\n"
//! worker   ──"POP\n"───────▶ line server ─▶ BrokerHandler ─▶ queue.pop  ─▶ "<payload>\n" | "EMPTY\n"
//! ```
//!
//! # Design Decisions
//! - One lock for the whole queue; socket I/O happens outside it
//! - No acknowledgment after POP: a message popped by a worker that then
//!   fails is gone (at most once per pop, best effort)
//! - Storage sits behind `MessageQueue` so a bounded or sharded queue can be
//!   swapped in without touching the protocol

pub mod client;
pub mod protocol;
pub mod queue;
pub mod server;

pub use client::{BrokerClient, BrokerError};
pub use protocol::{Command, Reply};
pub use queue::{InMemoryQueue, MessageQueue};
pub use server::BrokerHandler;
