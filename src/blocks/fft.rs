use num_complex::Complex32;
use rustfft::FftPlanner;
use std::any::Any;
use std::cmp;
use std::sync::Arc;

use crate::anyhow::Result;
use crate::runtime::BlockMeta;
use crate::runtime::ItemTag;
use crate::runtime::Kernel;
use crate::runtime::KernelInterface;
use crate::runtime::StreamInput;
use crate::runtime::StreamOutput;
use crate::runtime::WorkIo;

/// Compute an FFT.
///
/// This block computes the FFT on one symbol of `len` samples at a time,
/// outputting one symbol of `len` samples per FFT. Tags stay on their symbol.
///
/// # Inputs
///
/// `in`: Input symbols (Complex32, vector of `len`)
///
/// # Outputs
///
/// `out`: FFT results (Complex32, vector of `len`)
///
/// # Usage
/// ```
/// use ofdm_framing::blocks::Fft;
/// use ofdm_framing::blocks::FftDirection;
///
/// let ifft = Fft::with_options(64, FftDirection::Inverse, true, Some(1.0 / 64.0));
/// ```
pub struct Fft {
    input: StreamInput<Complex32>,
    output: StreamOutput<Complex32>,
    len: usize,
    fft_shift: bool,
    direction: FftDirection,
    normalize: Option<f32>,
    plan: Arc<dyn rustfft::Fft<f32>>,
    scratch: Box<[Complex32]>,
    shift_buf: Vec<Complex32>,
}

/// Fft direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FftDirection {
    /// Time to frequency domain
    Forward,
    /// Frequency to time domain
    Inverse,
}

impl Fft {
    /// Forward FFT
    pub fn new(len: usize) -> Self {
        Self::with_direction(len, FftDirection::Forward)
    }

    /// FFT in the given direction
    pub fn with_direction(len: usize, direction: FftDirection) -> Self {
        Self::with_options(len, direction, false, None)
    }

    /// FFT with optional shift of DC to the center and scaling of the output
    pub fn with_options(
        len: usize,
        direction: FftDirection,
        fft_shift: bool,
        normalize: Option<f32>,
    ) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let plan = match direction {
            FftDirection::Forward => planner.plan_fft_forward(len),
            FftDirection::Inverse => planner.plan_fft_inverse(len),
        };
        let scratch_len = plan.get_inplace_scratch_len();

        Fft {
            input: StreamInput::with_vlen("in", len),
            output: StreamOutput::with_vlen("out", len),
            len,
            plan,
            direction,
            fft_shift,
            normalize,
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len].into_boxed_slice(),
            shift_buf: vec![Complex32::new(0.0, 0.0); len],
        }
    }

    fn shift(buf: &mut [Complex32], tmp: &mut [Complex32]) {
        let len = buf.len();
        tmp.copy_from_slice(buf);
        for k in 0..len {
            buf[k] = tmp[(k + len / 2) % len];
        }
    }
}

#[doc(hidden)]
impl Kernel for Fft {
    async fn work(&mut self, io: &mut WorkIo, _meta: &mut BlockMeta) -> Result<()> {
        let n = cmp::min(self.input.items(), self.output.items());

        if n > 0 {
            let nread = self.input.nitems_read();
            let nwritten = self.output.nitems_written();
            let tags: Vec<ItemTag> = self
                .input
                .tags()
                .iter()
                .filter(|t| t.index < nread + n)
                .cloned()
                .collect();
            for t in tags {
                let index = nwritten + (t.index - nread);
                match t.source {
                    Some(s) => self.output.add_tag_from(index, t.tag, &s),
                    None => self.output.add_tag(index, t.tag),
                }
            }

            let m = n * self.len;
            let o = &mut self.output.slice()[0..m];
            o.copy_from_slice(&self.input.slice()[0..m]);

            for sym in o.chunks_exact_mut(self.len) {
                if self.direction == FftDirection::Inverse && self.fft_shift {
                    Self::shift(sym, &mut self.shift_buf);
                }
                self.plan.process_with_scratch(sym, &mut self.scratch);
                if self.direction == FftDirection::Forward && self.fft_shift {
                    Self::shift(sym, &mut self.shift_buf);
                }
            }

            if let Some(fac) = self.normalize {
                for item in o.iter_mut() {
                    *item *= fac;
                }
            }

            self.input.consume(n);
            self.output.produce(n);
        }

        if self.input.finished() && self.input.items() == 0 {
            io.finished = true;
        }

        Ok(())
    }
}

impl KernelInterface for Fft {
    fn type_name() -> &'static str {
        "Fft"
    }
    fn stream_inputs(&self) -> Vec<String> {
        vec![self.input.name().to_string()]
    }
    fn stream_outputs(&self) -> Vec<String> {
        vec![self.output.name().to_string()]
    }
    fn stream_input(&mut self, id: usize) -> Option<&mut dyn Any> {
        match id {
            0 => Some(&mut self.input),
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
