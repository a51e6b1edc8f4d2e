use serde::{Deserialize, Serialize};

use crate::{
    models::IntervalKey,
    session::{ClockEvent, Command, UiEvent},
};

/// Messages the page side sends to the host.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostMessage {
    Navigate { url: String },
    MediaAttached {
        #[serde(default)]
        position: f64,
        #[serde(default)]
        duration: Option<f64>,
    },
    MediaDetached,
    Tick { position: f64 },
    SeekStart { position: f64 },
    SeekEnd { position: f64 },
    SetEnabled { enabled: bool },
    ProcessVideo,
    PlayInterval { start: f64, end: f64 },
    RewindToLastSkip,
    ClearCache,
    Snapshot,
}

impl HostMessage {
    /// The manager command for this message. `Snapshot` needs a reply channel
    /// and is handled by the caller.
    pub fn into_command(self) -> Option<Command> {
        let command = match self {
            HostMessage::Navigate { url } => Command::Navigate { url },
            HostMessage::MediaAttached { duration, .. } => Command::MediaAttached { duration },
            HostMessage::MediaDetached => Command::MediaDetached,
            HostMessage::Tick { position } => Command::Clock(ClockEvent::Tick { position }),
            HostMessage::SeekStart { position } => {
                Command::Clock(ClockEvent::SeekStart { position })
            }
            HostMessage::SeekEnd { position } => Command::Clock(ClockEvent::SeekEnd { position }),
            HostMessage::SetEnabled { enabled } => Command::SetEnabled(enabled),
            HostMessage::ProcessVideo => Command::ProcessVideo,
            HostMessage::PlayInterval { start, end } => {
                Command::PlayInterval(IntervalKey::new(start, end))
            }
            HostMessage::RewindToLastSkip => Command::RewindToLastSkip,
            HostMessage::ClearCache => Command::ClearCache,
            HostMessage::Snapshot => return None,
        };
        Some(command)
    }
}

/// Instructions for the media element.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerCommand {
    SetPosition { position: f64 },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum OutboundMessage {
    Player(PlayerCommand),
    Event(UiEvent),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::session::NotificationLevel;

    fn parse(value: serde_json::Value) -> HostMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn clock_messages_map_to_clock_events() {
        let command = parse(json!({"type": "seekEnd", "position": 42.5}))
            .into_command()
            .unwrap();
        assert!(matches!(
            command,
            Command::Clock(ClockEvent::SeekEnd { position }) if position == 42.5
        ));
    }

    #[test]
    fn marker_click_carries_the_interval_key() {
        let command = parse(json!({"type": "playInterval", "start": 10.0, "end": 20.0}))
            .into_command()
            .unwrap();
        assert!(matches!(
            command,
            Command::PlayInterval(key) if key == IntervalKey::new(10.0, 20.0)
        ));
    }

    #[test]
    fn media_attached_fields_are_optional() {
        assert_eq!(
            parse(json!({"type": "mediaAttached"})),
            HostMessage::MediaAttached {
                position: 0.0,
                duration: None
            }
        );
        assert!(parse(json!({"type": "snapshot"})).into_command().is_none());
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        assert!(serde_json::from_value::<HostMessage>(json!({"type": "explode"})).is_err());
    }

    #[test]
    fn outbound_messages_are_flat_objects() {
        let seek = serde_json::to_value(OutboundMessage::Player(PlayerCommand::SetPosition {
            position: 20.0,
        }))
        .unwrap();
        assert_eq!(seek, json!({"type": "setPosition", "position": 20.0}));

        let note = serde_json::to_value(OutboundMessage::Event(UiEvent::notification(
            NotificationLevel::Notice,
            "Notice",
            "No segments to skip in this video.",
        )))
        .unwrap();
        assert_eq!(
            note,
            json!({
                "type": "notification",
                "level": "notice",
                "title": "Notice",
                "message": "No segments to skip in this video."
            })
        );
    }
}
