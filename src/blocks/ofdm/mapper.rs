use num_complex::Complex32;
use std::any::Any;

use crate::anyhow::Result;
use crate::blocks::ofdm::Constellation;
use crate::blocks::ofdm::FrameHeader;
use crate::blocks::ofdm::OfdmError;
use crate::blocks::ofdm::SubcarrierMap;
use crate::blocks::ofdm::tags::TX_TIME;
use crate::runtime::BlockMeta;
use crate::runtime::Kernel;
use crate::runtime::KernelInterface;
use crate::runtime::Message;
use crate::runtime::MsgQueue;
use crate::runtime::StreamOutput;
use crate::runtime::Tag;
use crate::runtime::Timestamp;
use crate::runtime::WorkIo;

struct Burst {
    bytes: Vec<u8>,
    bit_pos: usize,
    first: bool,
    timestamp: Option<Timestamp>,
}

impl Burst {
    fn total_bits(&self) -> usize {
        8 * self.bytes.len()
    }

    fn next_bits(&mut self, nbits: usize) -> u8 {
        let mut v = 0u8;
        for b in 0..nbits {
            let pos = self.bit_pos + b;
            if pos < self.total_bits() {
                v |= ((self.bytes[pos / 8] >> (pos % 8)) & 1) << b;
            }
        }
        self.bit_pos += nbits;
        v
    }
}

/// Map messages onto OFDM symbols.
///
/// Takes [`Message`]s from a queue, prepends the frame header and maps the
/// bits onto the data carriers, least significant bit first. Data carrier
/// `k` of the map lands on FFT bin `zeros_on_left + k`, with the occupied
/// carriers centered in the FFT. The last symbol of a burst is padded with
/// zero bits.
///
/// The whitener offset of the header is taken from `arg1`. A message with
/// timestamp gets a [`tx_time`](super::tags::TX_TIME) tag on its first
/// symbol. A message of type `1` ends the stream.
///
/// # Outputs
///
/// `out`: Symbols (Complex32, vector of `fft_length`)
///
/// `flag`: `1` on the first symbol of a burst (u8)
///
/// `eob`: `1` on the last symbol of a burst (u8)
pub struct OfdmMapper {
    output: StreamOutput<Complex32>,
    flag: StreamOutput<u8>,
    eob: StreamOutput<u8>,
    queue: MsgQueue,
    map: SubcarrierMap,
    points: Vec<Complex32>,
    nbits: usize,
    zeros_on_left: usize,
    burst: Option<Burst>,
}

impl OfdmMapper {
    /// Create mapper.
    ///
    /// The constellation needs a point for every bit pattern.
    pub fn new(
        constellation: &Constellation,
        map: SubcarrierMap,
        fft_length: usize,
        queue: MsgQueue,
    ) -> Result<Self, OfdmError> {
        if map.occupied() > fft_length {
            return Err(OfdmError::InvalidParameter(format!(
                "{} occupied carriers do not fit into fft length {}",
                map.occupied(),
                fft_length
            )));
        }

        let nbits = constellation.nbits();
        if !constellation.is_complete() {
            return Err(OfdmError::InvalidParameter(format!(
                "constellation does not cover every {nbits}-bit pattern"
            )));
        }
        let points: Vec<Complex32> = (0..1usize << nbits)
            .filter_map(|value| constellation.point(value as u8))
            .collect();

        Ok(OfdmMapper {
            output: StreamOutput::with_vlen("out", fft_length),
            flag: StreamOutput::new("flag"),
            eob: StreamOutput::new("eob"),
            queue,
            zeros_on_left: (fft_length - map.occupied()).div_ceil(2),
            map,
            points,
            nbits,
            burst: None,
        })
    }

    /// First FFT bin of the occupied carriers
    pub fn zeros_on_left(&self) -> usize {
        self.zeros_on_left
    }

    fn start_burst(msg: Message) -> Option<Burst> {
        let offset = msg.arg1 as u8;
        let header = match FrameHeader::new(msg.len(), offset) {
            Ok(h) => h,
            Err(e) => {
                warn!("dropping message: {}", e);
                return None;
            }
        };

        let mut bytes = Vec::with_capacity(header.to_bytes().len() + msg.len());
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(&msg.payload);
        debug!("burst of {} bytes", msg.len());

        Some(Burst {
            bytes,
            bit_pos: 0,
            first: true,
            timestamp: msg.timestamp,
        })
    }
}

#[doc(hidden)]
impl Kernel for OfdmMapper {
    async fn work(&mut self, io: &mut WorkIo, meta: &mut BlockMeta) -> Result<()> {
        loop {
            if self.output.items() == 0 || self.flag.items() == 0 || self.eob.items() == 0 {
                break;
            }

            if self.burst.is_none() {
                match self.queue.try_dequeue() {
                    None => break,
                    Some(msg) if msg.msg_type == 1 => {
                        io.finished = true;
                        break;
                    }
                    Some(msg) => {
                        self.burst = Self::start_burst(msg);
                        continue;
                    }
                }
            }

            let Some(burst) = self.burst.as_mut() else {
                break;
            };

            let index = self.output.nitems_written();
            if burst.first {
                if let Some(t) = burst.timestamp {
                    self.output.add_tag_from(
                        index,
                        Tag::NamedTime(TX_TIME.to_string(), t),
                        &meta.source_id(),
                    );
                }
            }

            let sym = self.output.item_mut(0);
            sym.fill(Complex32::new(0.0, 0.0));
            for &k in self.map.indices() {
                let v = burst.next_bits(self.nbits);
                sym[self.zeros_on_left + k] = self.points[v as usize];
            }

            let last = burst.bit_pos >= burst.total_bits();
            self.flag.slice()[0] = u8::from(burst.first);
            self.eob.slice()[0] = u8::from(last);
            burst.first = false;

            self.output.produce(1);
            self.flag.produce(1);
            self.eob.produce(1);

            if last {
                self.burst = None;
            }
        }

        Ok(())
    }
}

impl KernelInterface for OfdmMapper {
    fn type_name() -> &'static str {
        "OfdmMapper"
    }
    fn stream_inputs(&self) -> Vec<String> {
        vec![]
    }
    fn stream_outputs(&self) -> Vec<String> {
        vec![
            self.output.name().to_string(),
            self.flag.name().to_string(),
            self.eob.name().to_string(),
        ]
    }
    fn stream_input(&mut self, _id: usize) -> Option<&mut dyn Any> {
        None
    }
    fn stream_output(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.output),
            1 => Some(&mut self.flag),
            2 => Some(&mut self.eob),
            _ => None,
        }
    }
}
