use num_complex::Complex32;
use std::f32::consts::PI;

use crate::blocks::ofdm::Constellation;
use crate::blocks::ofdm::SubcarrierMap;

/// Per-symbol measurements of the demapper.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SymbolStats {
    /// Bytes completed by this symbol
    pub bytes: usize,
    /// Power of the decided reference points
    pub reference_power: f64,
    /// Power of the distance between derotated samples and decisions
    pub error_power: f64,
    /// Mean received power on the data carriers
    pub rx_power: f64,
}

/// Demapper
///
/// Slices the data carriers of an OFDM symbol and packs the decided bit
/// patterns into bytes, least significant bit first. Carries a one-tap
/// equalizer per data carrier and a second-order phase/frequency tracking
/// loop across symbols.
#[derive(Clone, Debug)]
pub struct Demapper {
    constellation: Constellation,
    taps: Vec<Complex32>,
    phase: f32,
    freq: f32,
    phase_gain: f32,
    freq_gain: f32,
    eq_gain: f32,
    partial_byte: u8,
    byte_offset: usize,
    resid: u8,
    nresid: usize,
}

impl Demapper {
    /// Create demapper for `ncarriers` data carriers.
    pub fn new(
        constellation: Constellation,
        ncarriers: usize,
        phase_gain: f32,
        freq_gain: f32,
        eq_gain: f32,
    ) -> Self {
        Demapper {
            constellation,
            taps: vec![Complex32::new(1.0, 0.0); ncarriers],
            phase: 0.0,
            freq: 0.0,
            phase_gain,
            freq_gain,
            eq_gain,
            partial_byte: 0,
            byte_offset: 0,
            resid: 0,
            nresid: 0,
        }
    }

    /// Unity taps, zero phase and frequency, empty bit packer.
    pub fn reset(&mut self) {
        self.taps.fill(Complex32::new(1.0, 0.0));
        self.phase = 0.0;
        self.freq = 0.0;
        self.partial_byte = 0;
        self.byte_offset = 0;
        self.resid = 0;
        self.nresid = 0;
    }

    /// Equalizer taps, one per data carrier
    pub fn taps(&self) -> &[Complex32] {
        &self.taps
    }

    /// Tracked carrier phase in `[0, 2π)`
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Tracked frequency offset in radians per symbol
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Constellation used by the slicer
    pub fn constellation(&self) -> &Constellation {
        &self.constellation
    }

    /// Demap one symbol.
    ///
    /// Completed bytes are appended to `out`. If `derotated` is given, the
    /// derotated and equalized value of data carrier `i` is written to
    /// `derotated[i]`.
    pub fn demap(
        &mut self,
        symbol: &[Complex32],
        map: &SubcarrierMap,
        out: &mut Vec<u8>,
        mut derotated: Option<&mut [Complex32]>,
    ) -> SymbolStats {
        let nbits = self.constellation.nbits();
        let carrier = Complex32::from_polar(1.0, self.phase);
        let mut accum_error = Complex32::new(0.0, 0.0);
        let mut stats = SymbolStats::default();

        let indices = map.indices();
        let mut i = 0;
        while i < indices.len() {
            if self.nresid > 0 {
                self.partial_byte |= self.resid;
                self.byte_offset += self.nresid;
                self.nresid = 0;
                self.resid = 0;
            }

            while self.byte_offset < 8 && i < indices.len() {
                let rx = symbol[indices[i]];
                let sigrot = rx * carrier * self.taps[i];

                if let Some(d) = derotated.as_deref_mut() {
                    d[i] = sigrot;
                }

                let k = self.constellation.slice(sigrot);
                let bits = self.constellation.values()[k];
                let closest = self.constellation.points()[k];

                accum_error += sigrot * closest.conj();
                stats.reference_power += closest.norm_sqr() as f64;
                stats.error_power += (sigrot - closest).norm_sqr() as f64;
                stats.rx_power += rx.norm_sqr() as f64;

                if sigrot.norm_sqr() > 0.001 {
                    let tap = self.taps[i];
                    self.taps[i] = tap + (closest / sigrot - tap) * self.eq_gain;
                }

                i += 1;

                if 8 - self.byte_offset >= nbits {
                    self.partial_byte |= bits << self.byte_offset;
                    self.byte_offset += nbits;
                } else {
                    let room = 8 - self.byte_offset;
                    self.nresid = nbits - room;
                    let mask = ((1u16 << room) - 1) as u8;
                    self.partial_byte |= (bits & mask) << self.byte_offset;
                    self.resid = bits >> room;
                    self.byte_offset += room;
                }
            }

            if self.byte_offset == 8 {
                out.push(self.partial_byte);
                stats.bytes += 1;
                self.byte_offset = 0;
                self.partial_byte = 0;
            }
        }

        if !indices.is_empty() {
            stats.rx_power /= indices.len() as f64;
        }

        let angle = accum_error.arg();
        self.freq -= self.freq_gain * angle;
        self.phase += self.freq - self.phase_gain * angle;
        if self.phase >= 2.0 * PI {
            self.phase -= 2.0 * PI;
        }
        if self.phase < 0.0 {
            self.phase += 2.0 * PI;
        }

        stats
    }
}
