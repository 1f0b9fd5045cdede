//! Application layer use cases for the StarButtonBox server.
//!
//! Nothing here touches sockets or OS input APIs directly; those arrive as
//! trait objects from the infrastructure layer.
//!
//! - **`dispatch`** – The per-packet protocol: replies, ACK ordering, and
//!   routing work to the pool, the drag loop, or the browser port.
//! - **`execute_action`** – Replays one macro action (key, pointer button,
//!   scroll) with modifier handling and latency accounting.
//! - **`worker_pool`** – Fixed set of threads running macro executions.
//! - **`drag_loop`** – The start/stop controlled automatic drag task.
//! - **`emulate_input`** and **`ports`** – Traits implemented by the
//!   infrastructure layer.
//! - **`events`** – Status and latency events for observers.

pub mod dispatch;
pub mod drag_loop;
pub mod emulate_input;
pub mod events;
pub mod execute_action;
pub mod ports;
pub mod task;
pub mod worker_pool;

