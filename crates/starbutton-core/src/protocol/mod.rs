//! Protocol module containing the JSON packet envelope and typed payloads.
//!
//! Wire format (one UTF-8 JSON document per UDP datagram):
//! ```text
//! {"type":"MACRO_COMMAND","packetId":"42","timestamp":1718000000000,"payload":"{...}"}
//! ```
//! The `payload` field is itself a JSON document encoded as a string.

pub mod action;
pub mod packet;
pub mod payload;

pub use action::{Action, KeyAction, MouseButton, PointerAction, PressKind, PressType, ScrollAction, ScrollDirection};
pub use packet::{decode_packet, encode_packet, DecodeError, Packet, PacketId, PacketType};
pub use payload::{BrowserRequest, CaptureRequest, LoopCommand, LoopCommandRequest};
