//! Wire protocol between the server and its clients.
//!
//! One bidirectional, persistent connection per client carries tagged JSON
//! messages; the `event` field names the message purpose using the original
//! kebab-case event names.

use serde::{Deserialize, Serialize};

use crate::session::SessionStart;
use crate::show::model::{Routine, ShowState, ShowStateUpdate};

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Clock-sync round trip: carries the client's local send timestamp;
    /// the server answers with [`ServerMessage::SyncTimeReply`].
    SyncTime { client_time: u64 },
    /// Whole-state replacement candidate. Writer-only.
    UpdateState { state: ShowStateUpdate },
    /// Request the writer capability. Granted unconditionally.
    PromoteToAdmin,
    /// Start a synchronized session, optionally overriding the configured
    /// delay (milliseconds). Writer-only.
    TriggerRoutine {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay: Option<u64>,
    },
    /// Abort any in-progress session on every client. Writer-only.
    ResetRoutine,
}

/// Messages the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Answer to [`ClientMessage::SyncTime`]. Echoes the client timestamp so
    /// the receiver can match it to its recorded send time.
    SyncTimeReply { client_time: u64, server_time: u64 },
    /// Full show state. Replaces the client's local copy entirely.
    StateUpdate { state: ShowState },
    /// Live connection gauge, counting writer and readers alike.
    SpectatorCount { count: usize },
    /// Writer capability confirmed. Sent to the requester only.
    AdminGranted,
    /// Session start: the shared target time plus a routine snapshot.
    StartSequence { target_time: u64, routine: Routine },
    /// Abandon playback and return to the idle presentation. No payload.
    ResetSequence,
}

impl From<SessionStart> for ServerMessage {
    fn from(start: SessionStart) -> Self {
        ServerMessage::StartSequence {
            target_time: start.target_time,
            routine: start.routine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_original_names() {
        let json = serde_json::to_value(&ClientMessage::SyncTime { client_time: 7 }).unwrap();
        assert_eq!(json["event"], "sync-time");
        assert_eq!(json["clientTime"], 7);

        let json = serde_json::to_value(&ClientMessage::PromoteToAdmin).unwrap();
        assert_eq!(json["event"], "promote-to-admin");

        let msg: ClientMessage =
            serde_json::from_str(r#"{"event":"trigger-routine","delay":500}"#).unwrap();
        assert_eq!(msg, ClientMessage::TriggerRoutine { delay: Some(500) });

        let msg: ClientMessage = serde_json::from_str(r#"{"event":"trigger-routine"}"#).unwrap();
        assert_eq!(msg, ClientMessage::TriggerRoutine { delay: None });
    }

    #[test]
    fn server_events_use_original_names() {
        let json = serde_json::to_value(&ServerMessage::SpectatorCount { count: 2 }).unwrap();
        assert_eq!(json["event"], "spectator-count");
        assert_eq!(json["count"], 2);

        let json = serde_json::to_value(&ServerMessage::StateUpdate {
            state: ShowState::default(),
        })
        .unwrap();
        assert_eq!(json["event"], "state-update");
        assert_eq!(json["state"]["activeRoutineIndex"], 0);
        assert_eq!(json["state"]["routines"][0]["id"], "demo-routine");
    }

    #[test]
    fn start_sequence_carries_target_and_snapshot() {
        let start = SessionStart {
            target_time: 99,
            routine: Routine::new("r", "R"),
        };
        let json = serde_json::to_value(&ServerMessage::from(start)).unwrap();
        assert_eq!(json["event"], "start-sequence");
        assert_eq!(json["targetTime"], 99);
        assert_eq!(json["routine"]["id"], "r");
    }
}
