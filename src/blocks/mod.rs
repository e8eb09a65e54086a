//! ## OFDM framing blocks
//! | Block | Usage |
//! |---|---|
//! | [OfdmSampler](ofdm::OfdmSampler) | Cut symbols at preamble triggers |
//! | [OfdmFrameSink](ofdm::OfdmFrameSink) | Demodulate bursts into messages |
//! | [OfdmMapper](ofdm::OfdmMapper) | Map messages onto symbols |
//! | [OfdmInsertPreamble](ofdm::OfdmInsertPreamble) | Put the preamble in front of bursts |
//! | [OfdmCyclicPrefixer](ofdm::OfdmCyclicPrefixer) | Add the cyclic prefix |
//!
//! ## DSP blocks
//! | Block | Usage |
//! |---|---|
//! | [Fft] | Computes FFT |

mod fft;
pub use fft::{Fft, FftDirection};

pub mod ofdm;
