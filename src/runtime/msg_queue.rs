use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use std::fmt;

use crate::runtime::Error;
use crate::runtime::Timestamp;
use crate::runtime::config::config;

/// Message
///
/// A decoded frame (or a frame to transmit) plus the metadata that travels
/// with it. Immutable once handed to a [`MsgQueue`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    /// Type of the message. Type `1` marks end-of-stream on transmit.
    pub msg_type: i64,
    /// Optional arg1. The frame sink stores the whitener offset here.
    pub arg1: f64,
    /// Optional arg2
    pub arg2: f64,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// Absolute time of the burst
    pub timestamp: Option<Timestamp>,
    /// Carrier frequency offset estimate
    pub cfo: Option<f64>,
    /// SNR estimate in dB
    pub snr: Option<f64>,
    /// Mean received power per symbol
    pub power_list: Vec<f64>,
    /// Secondary power list
    pub power_list2: Vec<f64>,
}

impl Message {
    /// Create message
    pub fn new(msg_type: i64, arg1: f64, arg2: f64, payload: Vec<u8>) -> Self {
        Message {
            msg_type,
            arg1,
            arg2,
            payload,
            ..Default::default()
        }
    }

    /// Create message from a string payload
    pub fn from_string(s: &str, msg_type: i64, arg1: f64, arg2: f64) -> Self {
        Self::new(msg_type, arg1, arg2, s.as_bytes().to_vec())
    }

    /// Set the timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the carrier frequency offset
    #[must_use]
    pub fn with_cfo(mut self, cfo: f64) -> Self {
        self.cfo = Some(cfo);
        self
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.payload))
    }
}

/// Message queue
///
/// FIFO of [`Message`]s between the framing blocks and the layer above.
/// Handles are cheap to clone and all refer to the same queue. A bounded
/// queue blocks the producer when full, which is an explicit admission
/// control choice; the default is unbounded.
#[derive(Clone)]
pub struct MsgQueue {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    limit: usize,
}

impl MsgQueue {
    /// Create queue holding at most `limit` messages (`0` = unbounded)
    pub fn new(limit: usize) -> Self {
        let (tx, rx) = if limit == 0 {
            crossbeam_channel::unbounded()
        } else {
            crossbeam_channel::bounded(limit)
        };
        MsgQueue { tx, rx, limit }
    }

    /// Create unbounded queue
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Insert at the tail, blocking while a bounded queue is full
    pub fn enqueue(&self, msg: Message) -> Result<(), Error> {
        self.tx.send(msg).map_err(|_| Error::QueueDisconnected)
    }

    /// Insert at the tail without blocking, handing the message back if full
    pub fn try_enqueue(&self, msg: Message) -> Result<(), Message> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(m) | TrySendError::Disconnected(m) => m,
        })
    }

    /// Remove the head, blocking until a message is available
    pub fn dequeue_blocking(&self) -> Result<Message, Error> {
        self.rx.recv().map_err(|_| Error::QueueDisconnected)
    }

    /// Remove the head if there is one
    pub fn try_dequeue(&self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Capacity limit (`0` = unbounded)
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for MsgQueue {
    fn default() -> Self {
        Self::new(config().msg_queue_limit)
    }
}

impl fmt::Debug for MsgQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsgQueue")
            .field("len", &self.len())
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo() {
        let q = MsgQueue::unbounded();
        assert!(q.is_empty());
        q.enqueue(Message::from_string("a", 0, 0.0, 0.0)).unwrap();
        q.enqueue(Message::from_string("b", 0, 0.0, 0.0)).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.dequeue_blocking().unwrap().to_string(), "a");
        assert_eq!(q.try_dequeue().unwrap().to_string(), "b");
        assert!(q.try_dequeue().is_none());
    }

    #[test]
    fn bounded_rejects_when_full() {
        let q = MsgQueue::new(1);
        q.try_enqueue(Message::default()).unwrap();
        let m = Message::new(3, 0.0, 0.0, vec![1]);
        assert_eq!(q.try_enqueue(m.clone()), Err(m));
    }

    #[test]
    fn dequeue_blocks_until_available() {
        let q = MsgQueue::new(4);
        let q2 = q.clone();
        let h = thread::spawn(move || q2.dequeue_blocking().unwrap());
        q.enqueue(Message::new(0, 5.0, 0.0, vec![1, 2, 3])).unwrap();
        let m = h.join().unwrap();
        assert_eq!(m.payload, vec![1, 2, 3]);
        assert_eq!(m.arg1, 5.0);
    }
}
