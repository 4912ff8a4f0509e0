//! Wire messages exchanged between the main surface and the presenter console.
//!
//! Every message is a JSON object with a `"type"` discriminant:
//!
//! ```json
//! {"type":"state","index":2,"step":1,"totalSteps":3,"showBorder":false,"isFullscreen":false,"aspectRatio":"16:9"}
//! {"type":"navigate","action":"goTo","index":4}
//! {"type":"control","action":"border","value":true}
//! {"type":"ping"}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nav::NavCommand;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 2] = [AspectRatio::Landscape, AspectRatio::Portrait];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.token() == token)
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Self::Portrait)
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f32 {
        match self {
            Self::Landscape => 16.0 / 9.0,
            Self::Portrait => 9.0 / 16.0,
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Full navigation + UI-flag state, sent wholesale by the main surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub index: usize,
    pub step: usize,
    pub total_steps: usize,
    pub show_border: bool,
    pub is_fullscreen: bool,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigateAction {
    NextStep,
    PrevStep,
    NextSlide,
    PrevSlide,
    GoTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "camelCase")]
pub enum ControlAction {
    Fullscreen(bool),
    Border(bool),
    AspectRatio(AspectRatio),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChannelMessage {
    State(Snapshot),
    Navigate {
        action: NavigateAction,
        /// Only meaningful for `goTo`. Signed so that a negative target decodes
        /// and is then dropped as out of range instead of failing the frame.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<i64>,
    },
    Control(ControlAction),
    Connected,
    Disconnected,
    Ping,
    Pong,
}

impl ChannelMessage {
    pub fn navigate(command: NavCommand) -> Self {
        let (action, index) = match command {
            NavCommand::NextStep => (NavigateAction::NextStep, None),
            NavCommand::PrevStep => (NavigateAction::PrevStep, None),
            NavCommand::NextSlide => (NavigateAction::NextSlide, None),
            NavCommand::PrevSlide => (NavigateAction::PrevSlide, None),
            NavCommand::GoTo(i) => (NavigateAction::GoTo, i64::try_from(i).ok()),
        };
        Self::Navigate { action, index }
    }

    /// Translate a `navigate` message into a transition. `goTo` without a
    /// usable index yields `None`; every other action ignores `index`.
    pub fn nav_command(&self) -> Option<NavCommand> {
        let Self::Navigate { action, index } = self else {
            return None;
        };
        match action {
            NavigateAction::NextStep => Some(NavCommand::NextStep),
            NavigateAction::PrevStep => Some(NavCommand::PrevStep),
            NavigateAction::NextSlide => Some(NavCommand::NextSlide),
            NavigateAction::PrevSlide => Some(NavCommand::PrevSlide),
            NavigateAction::GoTo => index
                .and_then(|i| usize::try_from(i).ok())
                .map(NavCommand::GoTo),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::Navigate { .. } => "navigate",
            Self::Control(_) => "control",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
