use num_complex::Complex32;
use std::any::Any;
use std::cmp;

use crate::anyhow::Result;
use crate::blocks::ofdm::Constellation;
use crate::blocks::ofdm::Demapper;
use crate::blocks::ofdm::FrameHeader;
use crate::blocks::ofdm::HEADER_BYTES;
use crate::blocks::ofdm::OfdmError;
use crate::blocks::ofdm::SubcarrierMap;
use crate::blocks::ofdm::tags::MissingTagPolicy;
use crate::blocks::ofdm::tags::SYNC_CFO;
use crate::blocks::ofdm::tags::SYNC_TIME;
use crate::runtime::BlockMeta;
use crate::runtime::Kernel;
use crate::runtime::KernelInterface;
use crate::runtime::Message;
use crate::runtime::MsgQueue;
use crate::runtime::StreamInput;
use crate::runtime::StreamOutput;
use crate::runtime::Timestamp;
use crate::runtime::WorkIo;

#[derive(Clone, Debug, PartialEq)]
enum State {
    SyncSearch,
    HaveSync { header: u32, count: usize },
    HaveHeader { header: FrameHeader, packet: Vec<u8> },
}

#[derive(Clone, Debug, Default)]
struct FrameQuality {
    reference_power: f64,
    error_power: f64,
    power_list: Vec<f64>,
}

impl FrameQuality {
    fn snr_db(&self) -> Option<f64> {
        if self.power_list.is_empty() || self.reference_power == 0.0 {
            None
        } else {
            Some(10.0 * (self.reference_power / self.error_power).log10())
        }
    }
}

/// Demodulate OFDM bursts into frames.
///
/// A `1` on the `flag` input marks the preamble symbol of a burst. It is not
/// demodulated, but resets the equalizer and the phase/frequency tracking and
/// picks up the [`sync_time`](super::tags::SYNC_TIME) and
/// [`sync_cfo`](super::tags::SYNC_CFO) tags of that symbol. The following
/// symbols are demapped. The first [`HEADER_BYTES`] bytes form the header;
/// once the announced payload length is reached, a [`Message`] with the
/// payload is put into the queue. The queue is never waited on: if a bounded
/// queue is full, the frame is dropped and counted in
/// [`dropped`](Self::dropped).
///
/// # Inputs
///
/// `in`: Symbols (Complex32, vector of `occupied_carriers`)
///
/// `flag`: Start of burst (u8)
///
/// # Outputs
///
/// `derotated`: Derotated and equalized data carriers, zero-padded to
/// `occupied_carriers` (Complex32, vector of `occupied_carriers`). Optional.
pub struct OfdmFrameSink {
    input: StreamInput<Complex32>,
    flag: StreamInput<u8>,
    derotated: StreamOutput<Complex32>,
    map: SubcarrierMap,
    demapper: Demapper,
    queue: MsgQueue,
    missing_tags: MissingTagPolicy,
    state: State,
    sync_time: Option<Timestamp>,
    sync_cfo: Option<f64>,
    quality: FrameQuality,
    bytes: Vec<u8>,
    dropped: usize,
}

impl OfdmFrameSink {
    /// Create frame sink with the default subcarrier map and gains.
    pub fn new(
        constellation: Constellation,
        occupied_carriers: usize,
        queue: MsgQueue,
    ) -> Result<Self, OfdmError> {
        FrameSinkBuilder::new(constellation, occupied_carriers, queue).build()
    }

    /// Demapper with equalizer and tracking state
    pub fn demapper(&self) -> &Demapper {
        &self.demapper
    }

    /// Data subcarriers
    pub fn subcarrier_map(&self) -> &SubcarrierMap {
        &self.map
    }

    /// Frames dropped because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Whether the sink is waiting for the next burst
    pub fn searching(&self) -> bool {
        self.state == State::SyncSearch
    }

    fn enter_search(&mut self) {
        self.state = State::SyncSearch;
    }

    fn enter_have_sync(&mut self) {
        self.demapper.reset();
        self.quality = FrameQuality::default();
        self.state = State::HaveSync {
            header: 0,
            count: 0,
        };
    }

    /// Reads the sync tags of the flagged symbol. Returns whether the burst
    /// should be demodulated.
    fn read_sync_tags(&mut self) -> bool {
        let nread = self.flag.nitems_read();

        let time = self
            .flag
            .most_recent_tag(nread, nread + 1, SYNC_TIME)
            .and_then(|t| t.tag.as_time());
        let cfo = self
            .flag
            .most_recent_tag(nread, nread + 1, SYNC_CFO)
            .and_then(|t| t.tag.as_f64());

        match time {
            Some(t) => self.sync_time = Some(t),
            None => warn!("burst at symbol {} without sync time", nread),
        }
        match cfo {
            Some(c) => self.sync_cfo = Some(c),
            None => warn!("burst at symbol {} without cfo", nread),
        }

        match self.missing_tags {
            MissingTagPolicy::Warn => true,
            MissingTagPolicy::DropBurst => time.is_some() && cfo.is_some(),
        }
    }

    fn deliver(&mut self, header: FrameHeader, payload: Vec<u8>) {
        let snr = self.quality.snr_db();
        let mut msg = Message::new(0, header.whitener_offset as f64, 0.0, payload);
        msg.timestamp = self.sync_time;
        msg.cfo = self.sync_cfo;
        msg.snr = snr;
        msg.power_list = std::mem::take(&mut self.quality.power_list);

        debug!(
            "frame of {} bytes, offset {}, snr {:?}",
            msg.len(),
            header.whitener_offset,
            snr
        );
        if let Err(msg) = self.queue.try_enqueue(msg) {
            self.dropped += 1;
            warn!(
                "message queue full, dropping frame of {} bytes ({} dropped)",
                msg.len(),
                self.dropped
            );
        }
    }

    fn step(&mut self) {
        let sig = self.flag.slice()[0] != 0;
        let write_derotated = self.derotated.is_connected();

        if write_derotated {
            self.derotated.item_mut(0).fill(Complex32::new(0.0, 0.0));
        }

        match self.state {
            State::SyncSearch => {
                if sig && self.read_sync_tags() {
                    self.enter_have_sync();
                }
            }
            _ => {
                if sig {
                    debug!("start of burst while demodulating, ignored");
                }
                self.bytes.clear();
                let derotated = if write_derotated {
                    Some(&mut self.derotated.item_mut(0)[..self.map.len()])
                } else {
                    None
                };
                let stats =
                    self.demapper
                        .demap(self.input.item(0), &self.map, &mut self.bytes, derotated);
                self.quality.reference_power += stats.reference_power;
                self.quality.error_power += stats.error_power;
                self.quality.power_list.push(stats.rx_power);
                self.consume_bytes();
            }
        }

        self.input.consume(1);
        self.flag.consume(1);
        if write_derotated {
            self.derotated.produce(1);
        }
    }

    fn consume_bytes(&mut self) {
        let mut j = 0;
        while j < self.bytes.len() {
            match &mut self.state {
                State::SyncSearch => break,
                State::HaveSync { header, count } => {
                    *header = (*header << 8) | self.bytes[j] as u32;
                    *count += 1;
                    j += 1;
                    if *count < HEADER_BYTES {
                        continue;
                    }

                    let word = *header;
                    if !FrameHeader::is_valid(word) {
                        debug!("bad header {:#010x}", word);
                        self.enter_search();
                        break;
                    }
                    let header = FrameHeader::from_word(word);
                    debug!(
                        "header: payload {} bytes, offset {}",
                        header.payload_len, header.whitener_offset
                    );
                    let len = header.payload_len as usize;
                    if len == 0 {
                        self.deliver(header, Vec::new());
                        self.enter_search();
                        break;
                    }
                    self.state = State::HaveHeader {
                        header,
                        packet: Vec::with_capacity(len),
                    };
                }
                State::HaveHeader { header, packet } => {
                    let len = header.payload_len as usize;
                    let take = cmp::min(len - packet.len(), self.bytes.len() - j);
                    packet.extend_from_slice(&self.bytes[j..j + take]);
                    j += take;
                    if packet.len() == len {
                        let header = *header;
                        let payload = std::mem::take(packet);
                        self.deliver(header, payload);
                        self.enter_search();
                        break;
                    }
                }
            }
        }
    }
}

#[doc(hidden)]
impl Kernel for OfdmFrameSink {
    async fn work(&mut self, io: &mut WorkIo, _meta: &mut BlockMeta) -> Result<()> {
        loop {
            let n = cmp::min(self.input.items(), self.flag.items());
            if n == 0 {
                if self.input.finished() || self.flag.finished() {
                    io.finished = true;
                }
                break;
            }
            if self.derotated.is_connected() && self.derotated.items() == 0 {
                break;
            }
            self.step();
        }
        Ok(())
    }
}

impl KernelInterface for OfdmFrameSink {
    fn type_name() -> &'static str {
        "OfdmFrameSink"
    }
    fn stream_inputs(&self) -> Vec<String> {
        vec![self.input.name().to_string(), self.flag.name().to_string()]
    }
    fn stream_outputs(&self) -> Vec<String> {
        vec![self.derotated.name().to_string()]
    }
    fn stream_input(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.input),
            1 => Some(&mut self.flag),
            _ => None,
        }
    }
    fn stream_output(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.derotated),
            _ => None,
        }
    }
}

/// Build an [OfdmFrameSink].
///
/// Defaults: subcarrier map from [`SubcarrierMap::default_for`], phase gain
/// `0.25`, frequency gain `phase_gain² / 4`, equalizer gain `0.05`.
///
/// # Usage
/// ```
/// use ofdm_framing::blocks::ofdm::Constellation;
/// use ofdm_framing::blocks::ofdm::FrameSinkBuilder;
/// use ofdm_framing::runtime::MsgQueue;
///
/// let queue = MsgQueue::unbounded();
/// let sink = FrameSinkBuilder::new(Constellation::qpsk(), 200, queue.clone())
///     .phase_gain(0.1)
///     .build()
///     .unwrap();
/// assert_eq!(sink.subcarrier_map().len(), 198);
/// ```
pub struct FrameSinkBuilder {
    constellation: Constellation,
    occupied_carriers: usize,
    queue: MsgQueue,
    map: Option<SubcarrierMap>,
    phase_gain: f32,
    freq_gain: Option<f32>,
    eq_gain: f32,
    missing_tags: MissingTagPolicy,
}

impl FrameSinkBuilder {
    /// Frame sink for symbols of `occupied_carriers` carriers, delivering
    /// frames into `queue`
    pub fn new(constellation: Constellation, occupied_carriers: usize, queue: MsgQueue) -> Self {
        FrameSinkBuilder {
            constellation,
            occupied_carriers,
            queue,
            map: None,
            phase_gain: 0.25,
            freq_gain: None,
            eq_gain: 0.05,
            missing_tags: MissingTagPolicy::default(),
        }
    }

    /// Data subcarriers
    #[must_use]
    pub fn subcarrier_map(mut self, map: SubcarrierMap) -> Self {
        self.map = Some(map);
        self
    }

    /// Phase gain of the tracking loop
    #[must_use]
    pub fn phase_gain(mut self, gain: f32) -> Self {
        self.phase_gain = gain;
        self
    }

    /// Frequency gain of the tracking loop
    #[must_use]
    pub fn freq_gain(mut self, gain: f32) -> Self {
        self.freq_gain = Some(gain);
        self
    }

    /// Equalizer adaptation gain
    #[must_use]
    pub fn eq_gain(mut self, gain: f32) -> Self {
        self.eq_gain = gain;
        self
    }

    /// Handling of bursts without sync tags
    #[must_use]
    pub fn missing_tag_policy(mut self, policy: MissingTagPolicy) -> Self {
        self.missing_tags = policy;
        self
    }

    /// Create frame sink
    pub fn build(self) -> Result<OfdmFrameSink, OfdmError> {
        let map = match self.map {
            Some(m) => m,
            None => SubcarrierMap::default_for(self.occupied_carriers)?,
        };
        if map.occupied() != self.occupied_carriers {
            return Err(OfdmError::InvalidParameter(format!(
                "subcarrier map for {} carriers, sink for {}",
                map.occupied(),
                self.occupied_carriers
            )));
        }

        let freq_gain = self
            .freq_gain
            .unwrap_or(self.phase_gain * self.phase_gain / 4.0);
        for (name, gain) in [
            ("phase gain", self.phase_gain),
            ("frequency gain", freq_gain),
            ("equalizer gain", self.eq_gain),
        ] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(OfdmError::InvalidParameter(format!("{name} {gain}")));
            }
        }

        let demapper = Demapper::new(
            self.constellation,
            map.len(),
            self.phase_gain,
            freq_gain,
            self.eq_gain,
        );

        Ok(OfdmFrameSink {
            input: StreamInput::with_vlen("in", self.occupied_carriers),
            flag: StreamInput::new("flag"),
            derotated: StreamOutput::with_vlen("derotated", self.occupied_carriers),
            map,
            demapper,
            queue: self.queue,
            missing_tags: self.missing_tags,
            state: State::SyncSearch,
            sync_time: None,
            sync_cfo: None,
            quality: FrameQuality::default(),
            bytes: Vec::with_capacity(self.occupied_carriers),
            dropped: 0,
        })
    }
}
