//! ## Stage Runtime
//!
//! The pieces a block needs to talk to whatever scheduler drives it: the
//! [`Kernel`] contract, typed stream ports with absolute item counters and
//! tags, the message queue that decoded frames are handed to, and a
//! [`Mocker`] that runs a single block without a scheduler.
use thiserror::Error;

mod block_meta;
pub mod config;
mod kernel;
mod logging;
pub mod mocker;
mod msg_queue;
pub mod stream_io;
mod tag;
mod work_io;

pub use block_meta::BlockMeta;
pub use kernel::Kernel;
pub use kernel::KernelInterface;
pub use mocker::Mocker;
pub use msg_queue::Message;
pub use msg_queue::MsgQueue;
pub use stream_io::StreamInput;
pub use stream_io::StreamOutput;
pub use tag::ItemTag;
pub use tag::Tag;
pub use tag::Timestamp;
pub use tag::most_recent;
pub use work_io::WorkIo;

/// Initialize logging.
///
/// Safe to call more than once.
pub fn init() {
    logging::init();
}

/// Runtime errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Stream port does not exist
    #[error("Block {0} has no stream port {1}")]
    InvalidStreamPort(String, usize),
    /// Stream port has a different item type
    #[error("Stream port {1} of block {0} has a different item type")]
    InvalidItemType(String, usize),
    /// Data is not a multiple of the vector length
    #[error("Data length {0} is not a multiple of the vector length {1}")]
    VectorLength(usize, usize),
    /// All handles of a message queue are gone
    #[error("Message queue disconnected")]
    QueueDisconnected,
    /// Kernel returned an error
    #[error("Error in kernel: {0}")]
    KernelError(String),
}
