//! JSON frame codec
//!
//! Frames are single JSON objects of at most [`MAX_DATAGRAM_LEN`] bytes.
//! Radios may pad datagrams with trailing NUL bytes; those are stripped
//! before decoding. The header version is checked before the payload is
//! parsed, so a peer running another schema is reported as a version
//! mismatch rather than as garbage.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::message::{LinkMessage, MessageType, Payload};
use crate::constants::MAX_DATAGRAM_LEN;
use crate::errors::CodecError;

#[derive(Deserialize)]
struct Header {
    #[serde(rename = "v")]
    version: u16,
}

pub fn encode<P: Serialize>(message: &LinkMessage<P>) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(message).map_err(|_| CodecError::Malformed)?;
    if bytes.len() > MAX_DATAGRAM_LEN {
        return Err(CodecError::TooLarge {
            len: bytes.len(),
            max: MAX_DATAGRAM_LEN,
        });
    }
    Ok(bytes)
}

pub fn decode<P: Payload>(datagram: &[u8]) -> Result<LinkMessage<P>, CodecError> {
    let bytes = strip_padding(datagram);
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    if bytes.len() > MAX_DATAGRAM_LEN {
        return Err(CodecError::TooLarge {
            len: bytes.len(),
            max: MAX_DATAGRAM_LEN,
        });
    }

    let header: Header = serde_json::from_slice(bytes).map_err(|_| CodecError::Malformed)?;
    if header.version != P::SCHEMA_VERSION {
        return Err(CodecError::VersionMismatch {
            expected: P::SCHEMA_VERSION,
            found: header.version,
        });
    }

    let message: LinkMessage<P> = serde_json::from_slice(bytes).map_err(|_| CodecError::Malformed)?;
    let reply_ok = match message.kind {
        MessageType::Ack => message.reply_to.is_some(),
        MessageType::Data | MessageType::Event => message.reply_to.is_none(),
    };
    if !reply_ok {
        return Err(CodecError::Malformed);
    }
    Ok(message)
}

fn strip_padding(datagram: &[u8]) -> &[u8] {
    let end = datagram.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    &datagram[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Probe {
        #[serde(rename = "x")]
        value: i32,
    }

    impl Payload for Probe {
        const SCHEMA_VERSION: u16 = 3;
    }

    #[test]
    fn compact_layout() {
        let msg = LinkMessage::new(MessageType::Event, 42, 90_210, Probe { value: 7 });
        let bytes = encode(&msg).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"v":3,"t":"event","id":42,"ts":90210,"p":{"x":7}}"#
        );

        let ack = LinkMessage::ack(5, 42, 90_260, Probe { value: 1 });
        let bytes = encode(&ack).unwrap();
        assert_eq!(decode::<Probe>(&bytes).unwrap(), ack);
    }

    #[test]
    fn strips_nul_padding() {
        let msg = LinkMessage::new(MessageType::Data, 1, 10, Probe { value: -4 });
        let mut bytes = encode(&msg).unwrap();
        bytes.resize(MAX_DATAGRAM_LEN, 0);
        assert_eq!(decode::<Probe>(&bytes).unwrap(), msg);
    }

    #[test]
    fn rejects_garbage_and_empty() {
        assert_eq!(decode::<Probe>(b"\0\0\0"), Err(CodecError::Empty));
        assert_eq!(decode::<Probe>(b"{\"v\":3,\"t\":"), Err(CodecError::Malformed));
        assert_eq!(decode::<Probe>(b"T:25;C:150"), Err(CodecError::Malformed));
    }

    #[test]
    fn version_checked_before_payload() {
        let frame = br#"{"v":1,"t":"data","id":1,"ts":0,"p":{"legacy":true}}"#;
        assert_eq!(
            decode::<Probe>(frame),
            Err(CodecError::VersionMismatch { expected: 3, found: 1 })
        );
    }

    #[test]
    fn ack_requires_reply_to() {
        let frame = br#"{"v":3,"t":"ack","id":9,"ts":0,"p":{"x":0}}"#;
        assert_eq!(decode::<Probe>(frame), Err(CodecError::Malformed));

        let frame = br#"{"v":3,"t":"data","id":9,"ts":0,"r":2,"p":{"x":0}}"#;
        assert_eq!(decode::<Probe>(frame), Err(CodecError::Malformed));
    }

    #[test]
    fn oversize_frame_rejected() {
        let long = alloc::vec![b' '; MAX_DATAGRAM_LEN + 1];
        assert!(matches!(decode::<Probe>(&long), Err(CodecError::TooLarge { .. })));
    }
}
