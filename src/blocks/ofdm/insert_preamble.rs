use num_complex::Complex32;
use std::any::Any;
use std::cmp;

use crate::anyhow::Result;
use crate::blocks::ofdm::OfdmError;
use crate::blocks::ofdm::tags::SYNC_TIME;
use crate::blocks::ofdm::tags::TX_SOB;
use crate::blocks::ofdm::tags::TX_TIME;
use crate::runtime::BlockMeta;
use crate::runtime::ItemTag;
use crate::runtime::Kernel;
use crate::runtime::KernelInterface;
use crate::runtime::StreamInput;
use crate::runtime::StreamOutput;
use crate::runtime::Tag;
use crate::runtime::WorkIo;
use crate::runtime::most_recent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Preamble(usize),
    FirstPayload,
    Payload,
}

/// Put the preamble in front of each burst.
///
/// A non-zero `flag` marks the first payload symbol of a burst. The
/// configured preamble symbols are emitted before it, the first one carrying
/// a `1` on the output `flag`, a [`tx_sob`](super::tags::TX_SOB) tag and,
/// if the flagged input symbol has one, its time as
/// [`tx_time`](super::tags::TX_TIME). Symbols before the first burst are
/// dropped. `aux` is passed through for payload symbols and is `0` for
/// preamble symbols.
///
/// # Inputs
///
/// `in`: Payload symbols (Complex32, vector of `fft_length`)
///
/// `flag`: First symbol of a burst (u8)
///
/// `aux`: Auxiliary flag, usually end of burst (u8)
///
/// # Outputs
///
/// `out`: Symbols (Complex32, vector of `fft_length`)
///
/// `flag`: First preamble symbol of a burst (u8)
///
/// `aux`: Auxiliary flag (u8)
pub struct OfdmInsertPreamble {
    input: StreamInput<Complex32>,
    in_flag: StreamInput<u8>,
    in_aux: StreamInput<u8>,
    output: StreamOutput<Complex32>,
    out_flag: StreamOutput<u8>,
    out_aux: StreamOutput<u8>,
    fft_length: usize,
    preamble: Vec<Vec<Complex32>>,
    state: State,
}

impl OfdmInsertPreamble {
    /// Create preamble inserter.
    ///
    /// All preamble symbols must have `fft_length` samples.
    pub fn new(fft_length: usize, preamble: Vec<Vec<Complex32>>) -> Result<Self, OfdmError> {
        if fft_length == 0 {
            return Err(OfdmError::InvalidParameter(
                "fft length must be positive".to_string(),
            ));
        }
        if preamble.is_empty() {
            return Err(OfdmError::InvalidParameter("empty preamble".to_string()));
        }
        if let Some((index, sym)) = preamble
            .iter()
            .enumerate()
            .find(|(_, s)| s.len() != fft_length)
        {
            return Err(OfdmError::PreambleLength {
                index,
                len: sym.len(),
                expected: fft_length,
            });
        }

        Ok(OfdmInsertPreamble {
            input: StreamInput::with_vlen("in", fft_length),
            in_flag: StreamInput::new("flag"),
            in_aux: StreamInput::new("aux"),
            output: StreamOutput::with_vlen("out", fft_length),
            out_flag: StreamOutput::new("flag"),
            out_aux: StreamOutput::new("aux"),
            fft_length,
            preamble,
            state: State::Idle,
        })
    }

    /// Samples per symbol
    pub fn fft_length(&self) -> usize {
        self.fft_length
    }

    /// Preamble symbols
    pub fn preamble(&self) -> &[Vec<Complex32>] {
        &self.preamble
    }

    fn stamp_burst(&mut self, ni: usize, meta: &BlockMeta) {
        let index = self.input.nitems_read() + ni;
        let time = most_recent(
            self.input
                .tags()
                .iter()
                .filter(|t| t.index == index && (t.has_key(TX_TIME) || t.has_key(SYNC_TIME))),
        )
        .and_then(|t| t.tag.as_time());

        let out = self.output.nitems_written();
        let id = meta.source_id();
        self.output
            .add_tag_from(out, Tag::Flag(TX_SOB.to_string()), &id);
        match time {
            Some(t) => {
                self.output
                    .add_tag_from(out, Tag::NamedTime(TX_TIME.to_string(), t), &id);
            }
            None => debug!("burst at symbol {} without time", index),
        }
    }

    fn copy_payload(&mut self, ni: usize) {
        let index = self.input.nitems_read() + ni;
        let out = self.output.nitems_written();
        let forward: Vec<ItemTag> = self
            .input
            .tags()
            .iter()
            .filter(|t| {
                t.index == index
                    && !(t.has_key(TX_TIME) || t.has_key(SYNC_TIME) || t.has_key(TX_SOB))
            })
            .cloned()
            .collect();
        for t in forward {
            match t.source {
                Some(s) => self.output.add_tag_from(out, t.tag, &s),
                None => self.output.add_tag(out, t.tag),
            }
        }

        self.output
            .item_mut(0)
            .copy_from_slice(self.input.item(ni));
        self.out_flag.slice()[0] = 0;
        self.out_aux.slice()[0] = self.in_aux.slice()[ni];
        self.produce();
    }

    fn produce(&mut self) {
        self.output.produce(1);
        self.out_flag.produce(1);
        self.out_aux.produce(1);
    }
}

#[doc(hidden)]
impl Kernel for OfdmInsertPreamble {
    async fn work(&mut self, io: &mut WorkIo, meta: &mut BlockMeta) -> Result<()> {
        let ninput = cmp::min(
            self.input.items(),
            cmp::min(self.in_flag.items(), self.in_aux.items()),
        );
        let noutput = cmp::min(
            self.output.items(),
            cmp::min(self.out_flag.items(), self.out_aux.items()),
        );

        let mut ni = 0;
        let mut no = 0;

        while no < noutput && ni < ninput {
            match self.state {
                State::Idle => {
                    if self.in_flag.slice()[ni] & 0x1 != 0 {
                        self.state = State::Preamble(0);
                    } else {
                        ni += 1;
                    }
                }
                State::Preamble(n) if n >= self.preamble.len() => {
                    self.state = State::FirstPayload;
                }
                State::Preamble(n) => {
                    if n == 0 {
                        self.stamp_burst(ni, meta);
                    }
                    self.output
                        .item_mut(0)
                        .copy_from_slice(&self.preamble[n]);
                    self.out_flag.slice()[0] = u8::from(n == 0);
                    // end of burst belongs to payload symbols only
                    self.out_aux.slice()[0] = 0;
                    self.produce();
                    no += 1;
                    self.state = State::Preamble(n + 1);
                }
                State::FirstPayload => {
                    self.copy_payload(ni);
                    no += 1;
                    ni += 1;
                    self.state = State::Payload;
                }
                State::Payload => {
                    if self.in_flag.slice()[ni] & 0x1 != 0 {
                        self.state = State::Preamble(0);
                    } else {
                        self.copy_payload(ni);
                        no += 1;
                        ni += 1;
                    }
                }
            }
        }

        self.input.consume(ni);
        self.in_flag.consume(ni);
        self.in_aux.consume(ni);

        if self.input.finished() && ninput == ni {
            io.finished = true;
        }

        Ok(())
    }
}

impl KernelInterface for OfdmInsertPreamble {
    fn type_name() -> &'static str {
        "OfdmInsertPreamble"
    }
    fn stream_inputs(&self) -> Vec<String> {
        vec![
            self.input.name().to_string(),
            self.in_flag.name().to_string(),
            self.in_aux.name().to_string(),
        ]
    }
    fn stream_outputs(&self) -> Vec<String> {
        vec![
            self.output.name().to_string(),
            self.out_flag.name().to_string(),
            self.out_aux.name().to_string(),
        ]
    }
    fn stream_input(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.input),
            1 => Some(&mut self.in_flag),
            2 => Some(&mut self.in_aux),
            _ => None,
        }
    }
    fn stream_output(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.output),
            1 => Some(&mut self.out_flag),
            2 => Some(&mut self.out_aux),
            _ => None,
        }
    }
}
