//! Common imports for writing and testing blocks.
pub use anyhow::Result;
pub use num_complex::Complex32;

pub use crate::runtime::BlockMeta;
pub use crate::runtime::ItemTag;
pub use crate::runtime::Kernel;
pub use crate::runtime::KernelInterface;
pub use crate::runtime::Message;
pub use crate::runtime::Mocker;
pub use crate::runtime::MsgQueue;
pub use crate::runtime::StreamInput;
pub use crate::runtime::StreamOutput;
pub use crate::runtime::Tag;
pub use crate::runtime::Timestamp;
pub use crate::runtime::WorkIo;
