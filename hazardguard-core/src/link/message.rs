//! Wire frames

use core::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Frame kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Periodic state snapshot
    Data,
    /// Urgent snapshot that must be acknowledged
    Event,
    /// Acknowledgement carrying the replier's own snapshot
    Ack,
}

/// Application snapshot carried by every frame
///
/// `SCHEMA_VERSION` is written into the frame header; a receiver skips
/// frames whose version differs from the one it was built with.
pub trait Payload: Serialize + DeserializeOwned + Clone + Debug {
    const SCHEMA_VERSION: u16;
}

/// One datagram on the link
///
/// Compact keys keep frames inside the radio's payload limit:
///
/// ```text
/// {"v":1,"t":"event","id":42,"ts":90210,"p":{...}}
/// {"v":2,"t":"ack","id":17,"ts":90260,"r":42,"p":{...}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMessage<P> {
    #[serde(rename = "v")]
    pub version: u16,
    #[serde(rename = "t")]
    pub kind: MessageType,
    /// Strictly increasing per sender
    #[serde(rename = "id")]
    pub msg_id: u32,
    /// Sender's monotonic clock at send time
    #[serde(rename = "ts")]
    pub timestamp: Timestamp,
    /// Acknowledged `msg_id`, acks only
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u32>,
    #[serde(rename = "p")]
    pub payload: P,
}

impl<P: Payload> LinkMessage<P> {
    pub fn new(kind: MessageType, msg_id: u32, timestamp: Timestamp, payload: P) -> Self {
        Self {
            version: P::SCHEMA_VERSION,
            kind,
            msg_id,
            timestamp,
            reply_to: None,
            payload,
        }
    }

    pub fn ack(msg_id: u32, reply_to: u32, timestamp: Timestamp, payload: P) -> Self {
        Self {
            reply_to: Some(reply_to),
            ..Self::new(MessageType::Ack, msg_id, timestamp, payload)
        }
    }

    pub fn is_ack(&self) -> bool {
        self.kind == MessageType::Ack
    }
}
