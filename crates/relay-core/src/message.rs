//! Typed fixed-size messages exchanged through mailboxes.

use crate::error::CoreError;

/// Payload capacity: one Ethernet MTU minus UDP/IP headers, so a relay
/// frame never fragments on the wire. Larger payloads are split by
/// callers.
pub const MESSAGE_CONTENT_CAP: usize = 1472;

/// Message discriminator understood by relay workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Relay,
    Test,
    FileChunk,
    Control,
    Data,
}

/// Fixed-size mailbox message: a header plus an inline content area.
/// Plain value, no flexible arrays, sized for the slot-reservation ring.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Message {
    kind: MessageType,
    content_size: u32,
    content: [u8; MESSAGE_CONTENT_CAP],
}

impl Message {
    /// Builds a message by copying `content` into the inline area.
    ///
    /// Fails with `InvalidArgument` when the payload exceeds
    /// [`MESSAGE_CONTENT_CAP`].
    pub fn new(kind: MessageType, content: &[u8]) -> Result<Self, CoreError> {
        if content.len() > MESSAGE_CONTENT_CAP {
            return Err(CoreError::InvalidArgument("message content exceeds capacity"));
        }
        let mut msg = Self {
            kind,
            content_size: content.len() as u32,
            content: [0; MESSAGE_CONTENT_CAP],
        };
        msg.content[..content.len()].copy_from_slice(content);
        Ok(msg)
    }

    #[inline]
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    #[inline]
    pub fn content_size(&self) -> usize {
        self.content_size as usize
    }

    #[inline]
    pub fn content(&self) -> &[u8] {
        &self.content[..self.content_size as usize]
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .field("content_size", &self.content_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_round_trips() {
        let msg = Message::new(MessageType::Data, &[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(msg.kind(), MessageType::Data);
        assert_eq!(msg.content_size(), 3);
        assert_eq!(msg.content(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn empty_content_is_valid() {
        let msg = Message::new(MessageType::Control, &[]).unwrap();
        assert_eq!(msg.content_size(), 0);
        assert_eq!(msg.content(), &[] as &[u8]);
    }

    #[test]
    fn full_mtu_payload_fits_exactly() {
        let payload = [0xAB; MESSAGE_CONTENT_CAP];
        let msg = Message::new(MessageType::FileChunk, &payload).unwrap();
        assert_eq!(msg.content_size(), MESSAGE_CONTENT_CAP);
        assert_eq!(msg.content(), &payload);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let payload = vec![0u8; MESSAGE_CONTENT_CAP + 1];
        assert!(matches!(
            Message::new(MessageType::Relay, &payload),
            Err(CoreError::InvalidArgument(_))
        ));
    }
}
