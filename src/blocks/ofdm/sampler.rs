use num_complex::Complex32;
use std::any::Any;
use std::cmp;

use crate::anyhow::Result;
use crate::blocks::ofdm::OfdmError;
use crate::blocks::ofdm::tags::RX_TIME;
use crate::blocks::ofdm::tags::SYNC_CFO;
use crate::blocks::ofdm::tags::SYNC_TIME;
use crate::blocks::ofdm::tags::TimeTagPolicy;
use crate::runtime::BlockMeta;
use crate::runtime::Kernel;
use crate::runtime::KernelInterface;
use crate::runtime::StreamInput;
use crate::runtime::StreamOutput;
use crate::runtime::Tag;
use crate::runtime::Timestamp;
use crate::runtime::WorkIo;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    NoSignal,
    Frame { remaining: usize },
}

/// Cut OFDM symbols out of a sample stream.
///
/// Scans the trigger stream for the end of a preamble. On a trigger, the
/// `fft_length` samples ending at the trigger are emitted as the first symbol
/// of the burst with a `1` on the `flag` output. Afterwards, one symbol is
/// emitted every `symbol_length` samples, skipping the cyclic prefix, until a
/// new trigger arrives or `timeout` symbols have been emitted.
///
/// The trigger marks the end of the last of `preamble_len` preamble symbols.
/// The time of the burst's first sample, i.e. the start of the first preamble
/// symbol's cyclic prefix, is computed from the last
/// [`rx_time`](super::tags::RX_TIME) tag and attached as
/// [`sync_time`](super::tags::SYNC_TIME) to the flagged output item, together
/// with the last [`sync_cfo`](super::tags::SYNC_CFO) seen on the input.
///
/// # Inputs
///
/// `in`: Samples (Complex32)
///
/// `trigger`: Non-zero at the last sample of the last preamble symbol (u8)
///
/// # Outputs
///
/// `out`: Symbols (Complex32, vector of `fft_length`)
///
/// `flag`: `1` on the first symbol of a burst (u8)
pub struct OfdmSampler {
    input: StreamInput<Complex32>,
    trigger: StreamInput<u8>,
    output: StreamOutput<Complex32>,
    flag: StreamOutput<u8>,
    fft_length: usize,
    symbol_length: usize,
    bandwidth: f64,
    timeout: usize,
    preamble_len: usize,
    time_policy: TimeTagPolicy,
    state: State,
    time_anchor: Option<(usize, Timestamp)>,
    last_cfo: Option<f64>,
    tags_seen: usize,
}

impl OfdmSampler {
    /// Create sampler with default tag policy
    pub fn new(
        fft_length: usize,
        symbol_length: usize,
        bandwidth: f64,
        timeout: usize,
    ) -> Result<Self, OfdmError> {
        SamplerBuilder::new(fft_length, symbol_length)
            .bandwidth(bandwidth)
            .timeout(timeout)
            .build()
    }

    /// Whether the sampler is inside a frame
    pub fn in_frame(&self) -> bool {
        matches!(self.state, State::Frame { .. })
    }

    /// Absolute input index and time of the current time reference
    pub fn time_anchor(&self) -> Option<(usize, Timestamp)> {
        self.time_anchor
    }

    fn observe_tags(&mut self, until: usize) -> Result<(), OfdmError> {
        let from = cmp::max(self.tags_seen, self.input.nitems_read());
        if until <= from {
            return Ok(());
        }

        let rx_time = self
            .input
            .most_recent_tag(from, until, RX_TIME)
            .and_then(|t| t.tag.as_time().map(|time| (t.index, time)));

        if let Some((index, time)) = rx_time {
            if index == 0 {
                self.time_anchor = Some((0, time));
            } else {
                match self.time_policy {
                    TimeTagPolicy::Rebase => {
                        debug!("rx time {} at sample {}", time, index);
                        self.time_anchor = Some((index, time));
                    }
                    TimeTagPolicy::Drop => {
                        warn!("ignoring rx time tag at sample {}", index);
                    }
                    TimeTagPolicy::Strict => return Err(OfdmError::TimeTagOffset(index)),
                }
            }
        }

        if let Some(cfo) = self
            .input
            .most_recent_tag(from, until, SYNC_CFO)
            .and_then(|t| t.tag.as_f64())
        {
            self.last_cfo = Some(cfo);
        }

        self.tags_seen = until;
        Ok(())
    }

    fn burst_time(&self, start: usize) -> Timestamp {
        let (index, time) = self.time_anchor.unwrap_or_default();
        let elapsed = (start as f64 - index as f64) / self.bandwidth;
        time.add_secs(elapsed)
    }

    fn tag_burst(&mut self, trigger: usize, meta: &BlockMeta) {
        let start = (trigger + 1).saturating_sub(self.preamble_len * self.symbol_length);
        if self.time_anchor.is_none() {
            debug!("no rx time seen yet, timing burst from stream start");
        }
        let time = self.burst_time(start);
        let index = self.flag.nitems_written();
        let id = meta.source_id();

        debug!("burst at sample {} ({})", start, time);
        self.flag
            .add_tag_from(index, Tag::NamedTime(SYNC_TIME.to_string(), time), &id);

        match self.last_cfo.take() {
            Some(cfo) => {
                self.flag
                    .add_tag_from(index, Tag::NamedF64(SYNC_CFO.to_string(), cfo), &id);
            }
            None => debug!("burst at sample {} without cfo", start),
        }
    }

    fn step(&mut self, meta: &BlockMeta) -> Result<(), OfdmError> {
        let fft = self.fft_length;
        let sym = self.symbol_length;
        let nread = self.input.nitems_read();

        let found = (fft..=sym + fft).find(|&i| self.trigger.slice()[i] != 0);
        let scanned = found.map_or(sym + fft + 1, |i| i + 1);
        self.observe_tags(nread + scanned)?;

        let consumed = match (found, self.state) {
            (Some(index), _) => {
                self.tag_burst(nread + index, meta);
                let first = index + 1 - fft;
                self.emit(first, 1);
                self.state = State::Frame {
                    remaining: self.timeout,
                };
                first
            }
            (None, State::Frame { remaining }) => {
                self.emit(sym, 0);
                self.state = if remaining <= 1 {
                    debug!("frame timeout");
                    State::NoSignal
                } else {
                    State::Frame {
                        remaining: remaining - 1,
                    }
                };
                sym
            }
            (None, State::NoSignal) => sym + 1,
        };

        self.input.consume(consumed);
        self.trigger.consume(consumed);
        Ok(())
    }

    fn emit(&mut self, offset: usize, flag: u8) {
        let fft = self.fft_length;
        self.output
            .item_mut(0)
            .copy_from_slice(&self.input.slice()[offset..offset + fft]);
        self.flag.slice()[0] = flag;
        self.output.produce(1);
        self.flag.produce(1);
    }
}

#[doc(hidden)]
impl Kernel for OfdmSampler {
    async fn work(&mut self, io: &mut WorkIo, meta: &mut BlockMeta) -> Result<()> {
        let window = self.symbol_length + self.fft_length + 1;

        loop {
            let available = cmp::min(self.input.items(), self.trigger.items());
            if available < window {
                if self.input.finished() || self.trigger.finished() {
                    io.finished = true;
                }
                break;
            }
            if self.output.items() == 0 || self.flag.items() == 0 {
                break;
            }
            self.step(meta)?;
        }

        Ok(())
    }

    fn forecast(&self, noutput_items: usize) -> usize {
        match noutput_items {
            0 => 0,
            n => n * self.symbol_length + self.fft_length + 1,
        }
    }
}

impl KernelInterface for OfdmSampler {
    fn type_name() -> &'static str {
        "OfdmSampler"
    }
    fn stream_inputs(&self) -> Vec<String> {
        vec![self.input.name().to_string(), self.trigger.name().to_string()]
    }
    fn stream_outputs(&self) -> Vec<String> {
        vec![self.output.name().to_string(), self.flag.name().to_string()]
    }
    fn stream_input(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.input),
            1 => Some(&mut self.trigger),
            _ => None,
        }
    }
    fn stream_output(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.output),
            1 => Some(&mut self.flag),
            _ => None,
        }
    }
}

/// Build an [OfdmSampler].
///
/// # Usage
/// ```
/// use ofdm_framing::blocks::ofdm::SamplerBuilder;
/// use ofdm_framing::blocks::ofdm::TimeTagPolicy;
///
/// let sampler = SamplerBuilder::new(64, 80)
///     .bandwidth(1e6)
///     .timeout(100)
///     .time_tag_policy(TimeTagPolicy::Strict)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct SamplerBuilder {
    fft_length: usize,
    symbol_length: usize,
    bandwidth: f64,
    timeout: usize,
    preamble_len: usize,
    time_policy: TimeTagPolicy,
}

impl SamplerBuilder {
    /// Sampler for symbols of `fft_length` samples plus cyclic prefix,
    /// `symbol_length` samples in total.
    pub fn new(fft_length: usize, symbol_length: usize) -> Self {
        SamplerBuilder {
            fft_length,
            symbol_length,
            bandwidth: 1.0,
            timeout: 100,
            preamble_len: 1,
            time_policy: TimeTagPolicy::default(),
        }
    }

    /// Sample rate in samples per second
    #[must_use]
    pub fn bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Symbols per burst before falling back to trigger search
    #[must_use]
    pub fn timeout(mut self, timeout: usize) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of preamble symbols in front of each burst
    #[must_use]
    pub fn preamble_len(mut self, preamble_len: usize) -> Self {
        self.preamble_len = preamble_len;
        self
    }

    /// Handling of rx time tags that are not on sample zero
    #[must_use]
    pub fn time_tag_policy(mut self, policy: TimeTagPolicy) -> Self {
        self.time_policy = policy;
        self
    }

    /// Create sampler
    pub fn build(self) -> Result<OfdmSampler, OfdmError> {
        if self.fft_length == 0 {
            return Err(OfdmError::InvalidParameter(
                "fft length must be positive".to_string(),
            ));
        }
        if self.symbol_length < self.fft_length {
            return Err(OfdmError::CyclicPrefixSize {
                input: self.fft_length,
                output: self.symbol_length,
            });
        }
        if !(self.bandwidth.is_finite() && self.bandwidth > 0.0) {
            return Err(OfdmError::InvalidParameter(format!(
                "bandwidth {} must be positive",
                self.bandwidth
            )));
        }
        if self.timeout == 0 {
            return Err(OfdmError::InvalidParameter(
                "timeout must be positive".to_string(),
            ));
        }
        if self.preamble_len == 0 {
            return Err(OfdmError::InvalidParameter(
                "preamble must have at least one symbol".to_string(),
            ));
        }

        Ok(OfdmSampler {
            input: StreamInput::new("in"),
            trigger: StreamInput::new("trigger"),
            output: StreamOutput::with_vlen("out", self.fft_length),
            flag: StreamOutput::new("flag"),
            fft_length: self.fft_length,
            symbol_length: self.symbol_length,
            bandwidth: self.bandwidth,
            timeout: self.timeout,
            preamble_len: self.preamble_len,
            time_policy: self.time_policy,
            state: State::NoSignal,
            time_anchor: None,
            last_cfo: None,
            tags_seen: 0,
        })
    }
}
