//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::presenter::ExportFormat;
use crate::wizard::{WizardCommand, WizardView};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    OpenSession,
    Resume {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    CloseSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Command {
        #[serde(rename = "sessionId")]
        session_id: String,
        command: WizardCommand,
    },
    Export {
        #[serde(rename = "sessionId")]
        session_id: String,
        format: ExportFormat,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View {
        #[serde(rename = "sessionId")]
        session_id: String,
        view: WizardView,
    },
    Closed {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Exported {
        format: ExportFormat,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_id: String,
    pub view: WizardView,
}

#[derive(Debug, Deserialize)]
pub struct ExportIn {
    pub format: ExportFormat,
}
#[derive(Serialize)]
pub struct ExportOut {
    pub ok: bool,
    pub format: ExportFormat,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generator: &'static str,
}
