//! Binary messenger between the host and the embedded runtime

use std::collections::VecDeque;
use std::sync::Mutex;

use bevy::ecs::resource::Resource;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

use crate::BridgeError;

/// A message issued by the embedded runtime on a named channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformMessage {
    /// Channel name, matched exactly against registered handlers
    pub channel: String,
    /// Identifies the reply belonging to this message
    pub reply_id: u64,
    /// Encoded call
    pub payload: Vec<u8>,
}

/// The host's answer to one [`PlatformMessage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformReply {
    /// Id of the message being answered
    pub reply_id: u64,
    /// Encoded outcome; empty for not-implemented
    pub payload: Vec<u8>,
}

/// Resource holding the host ends of the messenger
#[derive(Resource)]
pub struct HostChannel {
    incoming: Receiver<PlatformMessage>,
    replies: Sender<PlatformReply>,
}

impl HostChannel {
    /// Creates the host ends and the matching embedded-side messenger
    pub fn pair() -> (Self, EmbeddedMessenger) {
        let (message_tx, message_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();
        (
            Self {
                incoming: message_rx,
                replies: reply_tx,
            },
            EmbeddedMessenger {
                outgoing: message_tx,
                replies: reply_rx,
                next_reply_id: Mutex::new(0),
                stashed: Mutex::new(VecDeque::new()),
            },
        )
    }

    /// Receive the next pending message (non-blocking)
    pub fn receive(&self) -> Option<PlatformMessage> {
        self.incoming.try_recv().ok()
    }

    /// Send a reply back to the embedded runtime
    pub fn reply(&self, reply: PlatformReply) {
        let _ = self.replies.send(reply);
    }
}

/// The embedded runtime's end of the messenger.
///
/// Disconnects once the engine attachment that created it is torn down.
pub struct EmbeddedMessenger {
    outgoing: Sender<PlatformMessage>,
    replies: Receiver<PlatformReply>,
    next_reply_id: Mutex<u64>,
    stashed: Mutex<VecDeque<PlatformReply>>,
}

impl EmbeddedMessenger {
    /// Queue a message for the host, returning the id its reply will carry
    pub fn send(&self, channel: impl Into<String>, payload: Vec<u8>) -> Result<u64, BridgeError> {
        let reply_id = {
            let mut next = self
                .next_reply_id
                .lock()
                .map_err(|_| BridgeError::Disconnected)?;
            *next += 1;
            *next
        };

        self.outgoing
            .send(PlatformMessage {
                channel: channel.into(),
                reply_id,
                payload,
            })
            .map_err(|_| BridgeError::Disconnected)?;
        Ok(reply_id)
    }

    /// Receive the next reply in arrival order (non-blocking)
    pub fn try_reply(&self) -> Result<Option<PlatformReply>, BridgeError> {
        if let Some(reply) = self
            .stashed
            .lock()
            .map_err(|_| BridgeError::Disconnected)?
            .pop_front()
        {
            return Ok(Some(reply));
        }

        match self.replies.try_recv() {
            Ok(reply) => Ok(Some(reply)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(BridgeError::Disconnected),
        }
    }

    /// Take the reply for `reply_id` if it has arrived, keeping any other
    /// replies for later (non-blocking)
    pub fn reply_for(&self, reply_id: u64) -> Result<Option<PlatformReply>, BridgeError> {
        let mut stashed = self.stashed.lock().map_err(|_| BridgeError::Disconnected)?;
        if let Some(index) = stashed.iter().position(|r| r.reply_id == reply_id) {
            return Ok(stashed.remove(index));
        }

        loop {
            match self.replies.try_recv() {
                Ok(reply) if reply.reply_id == reply_id => return Ok(Some(reply)),
                Ok(reply) => stashed.push_back(reply),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(BridgeError::Disconnected),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_arrive_in_issue_order() {
        let (host, messenger) = HostChannel::pair();
        let first = messenger.send("app.channel", b"a".to_vec()).unwrap();
        let second = messenger.send("app.channel", b"b".to_vec()).unwrap();
        assert!(first < second);

        assert_eq!(host.receive().map(|m| m.reply_id), Some(first));
        assert_eq!(host.receive().map(|m| m.reply_id), Some(second));
        assert_eq!(host.receive(), None);
    }

    #[test]
    fn reply_for_stashes_other_replies() {
        let (host, messenger) = HostChannel::pair();
        host.reply(PlatformReply { reply_id: 1, payload: b"one".to_vec() });
        host.reply(PlatformReply { reply_id: 2, payload: b"two".to_vec() });

        let two = messenger.reply_for(2).unwrap().expect("reply 2");
        assert_eq!(two.payload, b"two");
        let one = messenger.try_reply().unwrap().expect("reply 1 stashed");
        assert_eq!(one.reply_id, 1);
        assert_eq!(messenger.try_reply().unwrap(), None);
    }

    #[test]
    fn dropping_host_disconnects_messenger() {
        let (host, messenger) = HostChannel::pair();
        drop(host);
        assert!(matches!(
            messenger.send("app.channel", Vec::new()),
            Err(BridgeError::Disconnected)
        ));
        assert!(matches!(messenger.try_reply(), Err(BridgeError::Disconnected)));
    }
}
