use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::user::{UserId, UserState};

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "init_user")]
    InitUser(InitUserMsg),
    #[serde(rename = "user_did_init")]
    UserDidInit(UserMsg),
    #[serde(rename = "user_did_update")]
    UserDidUpdate(UserMsg),
    #[serde(rename = "user_did_disconnect")]
    UserDidDisconnect(UserLeftMsg),
}

/// First message on every connection: the users that have announced
/// themselves so far, and the id assigned to this connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InitUserMsg {
    pub protocol_version: u32,
    pub self_id: UserId,
    pub users: BTreeMap<UserId, UserState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserMsg {
    pub user_id: UserId,
    pub user: UserState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftMsg {
    pub user_id: UserId,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "user_did_init")]
    UserDidInit(UserMsg),
    #[serde(rename = "user_did_update")]
    UserDidUpdate(UserMsg),
}

impl ClientMsg {
    pub fn user_id(&self) -> &str {
        match self {
            ClientMsg::UserDidInit(m) | ClientMsg::UserDidUpdate(m) => &m.user_id,
        }
    }
}

impl UserMsg {
    pub fn new(user_id: impl Into<UserId>, user: UserState) -> Self {
        Self {
            user_id: user_id.into(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_msg_init_user_roundtrip() {
        let mut users = BTreeMap::new();
        users.insert("B".to_string(), UserState::at(0.25, -0.5));
        let msg = ServerMsg::InitUser(InitUserMsg {
            protocol_version: PROTOCOL_VERSION,
            self_id: "A".to_string(),
            users,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"init_user\""));
        assert!(json.contains("\"protocolVersion\":1"));
        assert!(json.contains("\"selfId\":\"A\""));
        let parsed: ServerMsg = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMsg::InitUser(init) => {
                assert_eq!(init.self_id, "A");
                assert_eq!(init.users.len(), 1);
                assert_eq!(init.users["B"], UserState::at(0.25, -0.5));
            }
            _ => panic!("Expected InitUser"),
        }
    }

    #[test]
    fn server_msg_disconnect_carries_only_id() {
        let msg = ServerMsg::UserDidDisconnect(UserLeftMsg {
            user_id: "B".to_string(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"user_did_disconnect","userId":"B"}"#);
    }

    #[test]
    fn client_msg_update_wire_shape() {
        let msg = ClientMsg::UserDidUpdate(UserMsg::new("A", UserState::at(1.0, -1.0)));
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"user_did_update","userId":"A","user":{"x":1.0,"y":-1.0,"img":false}}"#
        );
        let parsed: ClientMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(parsed.user_id(), "A");
    }

    #[test]
    fn same_event_name_parses_on_both_sides() {
        let json = r#"{"type":"user_did_init","userId":"C","user":{"x":0,"y":0,"img":false}}"#;
        let as_server: ServerMsg = serde_json::from_str(json).unwrap();
        let as_client: ClientMsg = serde_json::from_str(json).unwrap();
        assert!(matches!(as_server, ServerMsg::UserDidInit(ref m) if m.user_id == "C"));
        assert!(matches!(as_client, ClientMsg::UserDidInit(ref m) if m.user_id == "C"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = r#"{"type":"chat_message","text":"hi"}"#;
        assert!(serde_json::from_str::<ClientMsg>(json).is_err());
    }

    #[test]
    fn bindings_stay_inside_the_crate() {
        let paths = [
            ServerMsg::output_path(),
            ClientMsg::output_path(),
            InitUserMsg::output_path(),
            UserMsg::output_path(),
            UserLeftMsg::output_path(),
            UserState::output_path(),
        ];
        for path in paths {
            let path = path.unwrap();
            assert!(
                path.components()
                    .all(|c| c != std::path::Component::ParentDir),
                "{} escapes the bindings directory",
                path.display()
            );
        }
    }
}
