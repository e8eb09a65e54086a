#![warn(missing_docs)]
#![allow(clippy::new_ret_no_self)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Burst framing for OFDM modems, written as FutureSDR-style blocks.
//!
//! The crate turns a continuous stream of complex baseband samples into
//! header-validated payload frames and back:
//! * **Receive**: [`OfdmSampler`](blocks::ofdm::OfdmSampler) cuts symbols at
//!   preamble triggers, [`OfdmFrameSink`](blocks::ofdm::OfdmFrameSink)
//!   tracks phase/frequency, equalizes, slices and reassembles frames.
//! * **Transmit**: [`OfdmMapper`](blocks::ofdm::OfdmMapper),
//!   [`OfdmInsertPreamble`](blocks::ofdm::OfdmInsertPreamble) and
//!   [`OfdmCyclicPrefixer`](blocks::ofdm::OfdmCyclicPrefixer).
//!
//! Burst timing and channel metadata travel between stages as stream tags
//! attached to absolute item indices.
//!
//! ## Example
//! Add a cyclic prefix to a single symbol:
//! ```
//! use ofdm_framing::blocks::ofdm::OfdmCyclicPrefixer;
//! use ofdm_framing::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cp = OfdmCyclicPrefixer::new(64, 80)?;
//! let mut mocker = Mocker::new(cp);
//! mocker.input(0, vec![Complex32::new(1.0, 0.0); 64]);
//! mocker.init_output::<Complex32>(0, 80);
//! mocker.run();
//!
//! let (out, _) = mocker.output::<Complex32>(0);
//! assert_eq!(out.len(), 80);
//! # Ok(())
//! # }
//! ```

/// Logging macro
#[macro_use]
pub extern crate tracing;

// re-exports
pub use anyhow;
pub use futures;
pub use num_complex;
pub use rustfft;

pub mod blocks;
pub mod prelude;
pub mod runtime;
