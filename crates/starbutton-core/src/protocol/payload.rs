//! Typed payloads for the non-macro packet types.

use serde::{Deserialize, Serialize};

use crate::domain::drag::CapturePurpose;

/// `CAPTURE_MOUSE_POSITION` payload: `{"purpose":"SRC"|"DES"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub purpose: CapturePurpose,
}

/// `AUTO_DRAG_LOOP_COMMAND` payload: `{"action":"START"|"STOP"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopCommandRequest {
    pub action: LoopCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopCommand {
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "STOP")]
    Stop,
}

/// `TRIGGER_IMPORT_BROWSER` payload: `{"url":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserRequest {
    pub url: String,
}
