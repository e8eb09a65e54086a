//! OFDM burst framing.
//!
//! Receive chain: [OfdmSampler] cuts symbols out of the sample stream,
//! [OfdmFrameSink] demodulates them into [Message](crate::runtime::Message)s.
//! Transmit chain: [OfdmMapper] turns messages into symbols,
//! [OfdmInsertPreamble] puts the known preamble in front of each burst and
//! [OfdmCyclicPrefixer] prepends the cyclic prefix.
//!
//! Burst timing and frequency offset travel between the blocks as stream
//! tags, see [`tags`].
use thiserror::Error;

mod constellation;
pub use constellation::Constellation;

mod cyclic_prefixer;
pub use cyclic_prefixer::OfdmCyclicPrefixer;

mod demapper;
pub use demapper::Demapper;
pub use demapper::SymbolStats;

mod frame_sink;
pub use frame_sink::FrameSinkBuilder;
pub use frame_sink::OfdmFrameSink;

mod header;
pub use header::FrameHeader;
pub use header::HEADER_BYTES;
pub use header::MAX_PAYLOAD_LEN;

mod insert_preamble;
pub use insert_preamble::OfdmInsertPreamble;

mod mapper;
pub use mapper::OfdmMapper;

mod sampler;
pub use sampler::OfdmSampler;
pub use sampler::SamplerBuilder;

mod subcarrier_map;
pub use subcarrier_map::SubcarrierMap;

pub mod tags;
pub use tags::MissingTagPolicy;
pub use tags::TimeTagPolicy;

/// OFDM framing error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OfdmError {
    /// A preamble symbol does not have `fft_length` samples
    #[error("preamble symbol {index} has {len} samples, expected {expected}")]
    PreambleLength {
        /// Symbol index in the preamble
        index: usize,
        /// Actual length
        len: usize,
        /// FFT length
        expected: usize,
    },
    /// Points and values of a constellation differ in length
    #[error("constellation has {points} points but {values} values")]
    ConstellationMismatch {
        /// Number of points
        points: usize,
        /// Number of values
        values: usize,
    },
    /// Constellation without points
    #[error("constellation is empty")]
    EmptyConstellation,
    /// Constellation value does not fit into the bits per symbol
    #[error("constellation value {value} does not fit into {nbits} bits")]
    ConstellationValue {
        /// Offending value
        value: u8,
        /// Bits per symbol
        nbits: usize,
    },
    /// More data subcarriers than occupied carriers
    #[error("{allocated} subcarriers allocated, but only {occupied} occupied carriers")]
    SubcarrierOverflow {
        /// Allocated subcarriers
        allocated: usize,
        /// Occupied carriers
        occupied: usize,
    },
    /// Subcarrier index outside the occupied carriers
    #[error("subcarrier index {index} outside of {occupied} occupied carriers")]
    SubcarrierIndex {
        /// Offending index
        index: usize,
        /// Occupied carriers
        occupied: usize,
    },
    /// Malformed subcarrier mask
    #[error("invalid subcarrier mask {0:?}")]
    InvalidMask(String),
    /// Cyclic prefixer output smaller than its input
    #[error("cyclic prefixer output size {output} smaller than input size {input}")]
    CyclicPrefixSize {
        /// Input symbol size
        input: usize,
        /// Output symbol size
        output: usize,
    },
    /// Other invalid construction parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Absolute time tag not on the first sample of the stream
    #[error("rx time tag at sample {0}, expected sample 0")]
    TimeTagOffset(usize),
    /// Payload longer than the header can describe
    #[error("payload of {len} bytes exceeds maximum of {max}")]
    PayloadOverrun {
        /// Payload length
        len: usize,
        /// Maximum length
        max: usize,
    },
}
