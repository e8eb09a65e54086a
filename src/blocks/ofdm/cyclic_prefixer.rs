use num_complex::Complex32;
use std::any::Any;
use std::cmp;

use crate::anyhow::Result;
use crate::blocks::ofdm::OfdmError;
use crate::blocks::ofdm::tags::TX_EOB;
use crate::runtime::BlockMeta;
use crate::runtime::ItemTag;
use crate::runtime::Kernel;
use crate::runtime::KernelInterface;
use crate::runtime::StreamInput;
use crate::runtime::StreamOutput;
use crate::runtime::Tag;
use crate::runtime::WorkIo;

/// Add a cyclic prefix to OFDM symbols.
///
/// Each input symbol of `input_size` samples becomes `output_size` output
/// samples: the last `output_size - input_size` samples, followed by the
/// whole symbol. Tags of a symbol move to its first output sample.
///
/// # Inputs
///
/// `in`: Symbols (Complex32, vector of `input_size`)
///
/// `eob`: End of burst (u8). Optional; when connected, the last sample of a
/// flagged symbol gets a [`tx_eob`](super::tags::TX_EOB) tag.
///
/// # Outputs
///
/// `out`: Samples (Complex32)
///
/// # Usage
/// ```
/// use ofdm_framing::blocks::ofdm::OfdmCyclicPrefixer;
///
/// let cp = OfdmCyclicPrefixer::new(64, 80).unwrap();
/// ```
pub struct OfdmCyclicPrefixer {
    input: StreamInput<Complex32>,
    eob: StreamInput<u8>,
    output: StreamOutput<Complex32>,
    input_size: usize,
    output_size: usize,
}

impl OfdmCyclicPrefixer {
    /// Create cyclic prefixer
    pub fn new(input_size: usize, output_size: usize) -> Result<Self, OfdmError> {
        if input_size == 0 || output_size < input_size {
            return Err(OfdmError::CyclicPrefixSize {
                input: input_size,
                output: output_size,
            });
        }
        Ok(OfdmCyclicPrefixer {
            input: StreamInput::with_vlen("in", input_size),
            eob: StreamInput::new("eob"),
            output: StreamOutput::new("out"),
            input_size,
            output_size,
        })
    }

    /// Length of the cyclic prefix
    pub fn prefix_len(&self) -> usize {
        self.output_size - self.input_size
    }
}

#[doc(hidden)]
impl Kernel for OfdmCyclicPrefixer {
    async fn work(&mut self, io: &mut WorkIo, meta: &mut BlockMeta) -> Result<()> {
        let with_eob = self.eob.is_connected();
        let mut n = cmp::min(self.input.items(), self.output.items() / self.output_size);
        if with_eob {
            n = cmp::min(n, self.eob.items());
        }

        let cp = self.prefix_len();
        let nread = self.input.nitems_read();
        let nwritten = self.output.nitems_written();
        let id = meta.source_id();

        let moved: Vec<ItemTag> = self
            .input
            .tags()
            .iter()
            .filter(|t| t.index < nread + n)
            .cloned()
            .collect();
        for t in moved {
            let index = nwritten + (t.index - nread) * self.output_size;
            match t.source {
                Some(s) => self.output.add_tag_from(index, t.tag, &s),
                None => self.output.add_tag(index, t.tag),
            }
        }

        for i in 0..n {
            let sym = self.input.item(i);
            let o = &mut self.output.slice()[i * self.output_size..(i + 1) * self.output_size];
            o[cp..].copy_from_slice(sym);
            o[..cp].copy_from_slice(&sym[self.input_size - cp..]);

            if with_eob && self.eob.slice()[i] & 0x1 != 0 {
                let index = nwritten + (i + 1) * self.output_size - 1;
                self.output
                    .add_tag_from(index, Tag::Flag(TX_EOB.to_string()), &id);
            }
        }

        self.input.consume(n);
        if with_eob {
            self.eob.consume(n);
        }
        self.output.produce(n * self.output_size);

        if self.input.finished() && self.input.items() == 0 {
            io.finished = true;
        }

        Ok(())
    }

    fn forecast(&self, noutput_items: usize) -> usize {
        noutput_items.div_ceil(self.output_size)
    }
}

impl KernelInterface for OfdmCyclicPrefixer {
    fn type_name() -> &'static str {
        "OfdmCyclicPrefixer"
    }
    fn stream_inputs(&self) -> Vec<String> {
        vec![self.input.name().to_string(), self.eob.name().to_string()]
    }
    fn stream_outputs(&self) -> Vec<String> {
        vec![self.output.name().to_string()]
    }
    fn stream_input(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.input),
            1 => Some(&mut self.eob),
            _ => None,
        }
    }
    fn stream_output(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.output),
            _ => None,
        }
    }
}
