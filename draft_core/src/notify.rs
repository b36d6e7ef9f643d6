use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Rejection,
}

/// User-facing message emitted by the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl DraftNotice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn rejection(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Rejection,
            message: message.into(),
        }
    }
}

impl fmt::Display for DraftNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Info => write!(f, "{}", self.message),
            NoticeLevel::Warning => write!(f, "warning: {}", self.message),
            NoticeLevel::Rejection => write!(f, "rejected: {}", self.message),
        }
    }
}

/// Channel for messages shown to every participant.
pub trait Broadcast {
    fn broadcast(&mut self, notice: DraftNotice);
}

pub type NoticeReceiver = Receiver<DraftNotice>;

/// Forwards notices to a crossbeam channel; the receiver may live on another
/// thread.
#[derive(Debug, Clone)]
pub struct ChannelBroadcast {
    sender: Sender<DraftNotice>,
}

impl ChannelBroadcast {
    pub fn new(sender: Sender<DraftNotice>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, NoticeReceiver) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }
}

impl Broadcast for ChannelBroadcast {
    fn broadcast(&mut self, notice: DraftNotice) {
        if self.sender.send(notice).is_err() {
            tracing::debug!(target: "slice_draft::draft", "notice.receiver_dropped");
        }
    }
}

/// Writes notices to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBroadcast;

impl Broadcast for LogBroadcast {
    fn broadcast(&mut self, notice: DraftNotice) {
        match notice.level {
            NoticeLevel::Info => {
                tracing::info!(target: "slice_draft::draft", text = %notice.message, "notice")
            }
            NoticeLevel::Warning | NoticeLevel::Rejection => tracing::warn!(
                target: "slice_draft::draft",
                level = ?notice.level,
                text = %notice.message,
                "notice"
            ),
        }
    }
}
