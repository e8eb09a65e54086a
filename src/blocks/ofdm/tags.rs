//! Tag keys and tag handling policies of the OFDM blocks.
//!
//! | Key | Value | Producer | Consumer |
//! |---|---|---|---|
//! | [`RX_TIME`] | [`Tag::NamedTime`](crate::runtime::Tag::NamedTime) | radio front end | [OfdmSampler](super::OfdmSampler) |
//! | [`SYNC_CFO`] | [`Tag::NamedF64`](crate::runtime::Tag::NamedF64) | synchronizer | sampler, frame sink |
//! | [`SYNC_TIME`] | [`Tag::NamedTime`](crate::runtime::Tag::NamedTime) | sampler | frame sink, preamble inserter |
//! | [`TX_TIME`] | [`Tag::NamedTime`](crate::runtime::Tag::NamedTime) | mapper, preamble inserter | radio front end |
//! | [`TX_SOB`] | [`Tag::Flag`](crate::runtime::Tag::Flag) | preamble inserter | radio front end |
//! | [`TX_EOB`] | [`Tag::Flag`](crate::runtime::Tag::Flag) | cyclic prefixer | radio front end |

/// Start of burst
pub const TX_SOB: &str = "tx_sob";
/// End of burst
pub const TX_EOB: &str = "tx_eob";
/// Transmit time of the burst
pub const TX_TIME: &str = "tx_time";
/// Receive time of the sample
pub const RX_TIME: &str = "rx_time";
/// Time of the first sample of a detected burst
pub const SYNC_TIME: &str = "sync_time";
/// Carrier frequency offset of a detected burst
pub const SYNC_CFO: &str = "sync_cfo";

/// What the sampler does with an [`RX_TIME`] tag that is not on the first
/// sample of the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeTagPolicy {
    /// Anchor the time at the index of the tag.
    #[default]
    Rebase,
    /// Log and ignore the tag.
    Drop,
    /// Fail the block with [`OfdmError::TimeTagOffset`](super::OfdmError::TimeTagOffset).
    Strict,
}

/// What the frame sink does when a burst arrives without sync metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingTagPolicy {
    /// Log and keep the values of the previous burst.
    #[default]
    Warn,
    /// Log and ignore the burst.
    DropBurst,
}
