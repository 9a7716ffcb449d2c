//! Trellis storage and the Viterbi decoder (ACS, traceback, BCJR-style
//! cumulative uncertainty).

use std::rc::Rc;

use crate::bitstream::{extract_bits, BitAccumulator, BitSink};
use crate::branch_metric::branch_distance;
use crate::error::ConvCodeError;
use crate::tables::EncoderTables;

pub const DEFAULT_INIT_OTHER_STATES: u32 = u32::MAX / 2;
pub const DEFAULT_UNCERTAINTY_100: u32 = 100;

#[derive(Clone, Copy, Debug, Default)]
struct TrellisCell {
    /// During ACS: the winning predecessor state. After traceback, row 0
    /// of each column is overwritten with the recovered input bit.
    predecessor: u16,
    /// The branch metric (not including the predecessor's path metric)
    /// contributed by the winning transition.
    branch_metric: u32,
}

/// Soft/hard Viterbi decoder over a caller-supplied [`BitSink`] for the
/// recovered bit stream.
pub struct Decoder<S: BitSink> {
    tables: Rc<EncoderTables>,
    do_tail: bool,
    uncertainty_100: u32,

    curr: Vec<u32>,
    next: Vec<u32>,

    trellis: Vec<TrellisCell>,
    trellis_size: usize,
    ctrellis: usize,

    leftover_bits: usize,
    leftover_data: u32,
    leftover_reliability: Vec<u8>,

    acc: BitAccumulator<S>,
}

impl<S: BitSink> Decoder<S> {
    pub fn new(
        tables: Rc<EncoderTables>,
        trellis_size: usize,
        do_tail: bool,
        sink: S,
    ) -> Self {
        let num_states = tables.num_states();
        let num_polys = tables.num_polys();
        let mut d = Self {
            tables,
            do_tail,
            uncertainty_100: DEFAULT_UNCERTAINTY_100,
            curr: vec![0; num_states],
            next: vec![0; num_states],
            trellis: vec![TrellisCell::default(); trellis_size * num_states],
            trellis_size,
            ctrellis: 0,
            leftover_bits: 0,
            leftover_data: 0,
            leftover_reliability: vec![0; num_polys],
            acc: BitAccumulator::new(sink),
        };
        d.reinit(0, DEFAULT_INIT_OTHER_STATES).expect("state 0 is always valid");
        d
    }

    pub fn set_uncertainty_100(&mut self, uncertainty_100: u32) {
        self.uncertainty_100 = uncertainty_100;
    }

    #[inline]
    fn idx(&self, col: usize, state: usize) -> usize {
        col * self.tables.num_states() + state
    }

    /// `start_state < num_states` is required; for tail biting the decoder
    /// is first run from state 0 with a small `init_other_states`, then
    /// re-run from the discovered end state.
    pub fn reinit(&mut self, start_state: usize, init_other_states: u32) -> Result<(), ConvCodeError> {
        if start_state >= self.tables.num_states() {
            return Err(ConvCodeError::ConfigError { reason: "start_state out of range" });
        }
        self.curr.fill(init_other_states);
        self.curr[start_state] = 0;
        self.ctrellis = 0;
        self.leftover_bits = 0;
        self.leftover_data = 0;
        self.acc.reset();
        tracing::trace!(start_state, init_other_states, "decoder reinit");
        Ok(())
    }

    /// The input bit that transitions `predecessor` into `target`.
    #[inline]
    fn transition_bit(&self, predecessor: usize, target: usize) -> u32 {
        if self.tables.recursive() {
            if self.tables.next_state(0, predecessor) == target { 0 } else { 1 }
        } else {
            (target & 1) as u32
        }
    }

    /// Advance the trellis by one column for the received `rcv_symbol`,
    /// optionally with per-polynomial-bit reliabilities.
    pub fn decode_symbol(
        &mut self,
        rcv_symbol: u32,
        reliability: Option<&[u8]>,
    ) -> Result<(), ConvCodeError> {
        let num_polys = self.tables.num_polys();
        if self.ctrellis + num_polys > self.trellis_size {
            return Err(ConvCodeError::CapacityError { trellis_size: self.trellis_size });
        }
        let num_states = self.tables.num_states();
        let k = self.tables.k() as usize;
        let top_bit = if k >= 2 { 1usize << (k - 2) } else { 0 };

        for i in 0..num_states {
            let p1 = i >> 1;
            let p2 = p1 | top_bit;

            let b1 = self.transition_bit(p1, i);
            let b2 = self.transition_bit(p2, i);

            let dist1 = branch_distance(
                self.tables.convert(b1, p1),
                rcv_symbol,
                reliability,
                num_polys,
                self.uncertainty_100,
            );
            let dist2 = branch_distance(
                self.tables.convert(b2, p2),
                rcv_symbol,
                reliability,
                num_polys,
                self.uncertainty_100,
            );

            let d1 = self.curr[p1] + dist1;
            let d2 = self.curr[p2] + dist2;

            let (predecessor, branch_metric, metric) =
                if d2 < d1 { (p2, dist2, d2) } else { (p1, dist1, d1) };

            let cell_idx = self.idx(self.ctrellis, i);
            self.trellis[cell_idx] = TrellisCell { predecessor: predecessor as u16, branch_metric };
            self.next[i] = metric;
        }

        self.ctrellis += 1;
        std::mem::swap(&mut self.curr, &mut self.next);
        Ok(())
    }

    /// Feed `nbits` coded bits from `bytes` (low-bit-first), with an
    /// optional one-reliability-byte-per-bit slice of the same length.
    pub fn decode_data(
        &mut self,
        bytes: &[u8],
        nbits: usize,
        reliability: Option<&[u8]>,
    ) -> Result<(), ConvCodeError> {
        let num_polys = self.tables.num_polys();
        let mut curr_bit = 0usize;
        let mut nbits = nbits;

        if self.leftover_bits > 0 {
            if nbits + self.leftover_bits < num_polys {
                let newbits = extract_bits(bytes, 0, nbits as u32);
                self.leftover_data |= newbits << self.leftover_bits;
                if let Some(rel) = reliability {
                    self.leftover_reliability[self.leftover_bits..self.leftover_bits + nbits]
                        .copy_from_slice(&rel[..nbits]);
                }
                self.leftover_bits += nbits;
                return Ok(());
            }

            let extract_size = num_polys - self.leftover_bits;
            let newbits = extract_bits(bytes, 0, extract_size as u32);
            self.leftover_data |= newbits << self.leftover_bits;
            if let Some(rel) = reliability {
                self.leftover_reliability[self.leftover_bits..num_polys]
                    .copy_from_slice(&rel[..extract_size]);
            }
            let sym = self.leftover_data;
            let rel_owned = reliability.map(|_| self.leftover_reliability.clone());
            self.decode_symbol(sym, rel_owned.as_deref())?;

            curr_bit += extract_size;
            nbits -= extract_size;
            self.leftover_bits = 0;
            self.leftover_data = 0;
        }

        while nbits >= num_polys {
            let sym = extract_bits(bytes, curr_bit, num_polys as u32);
            let rel_slice = reliability.map(|r| &r[curr_bit..curr_bit + num_polys]);
            self.decode_symbol(sym, rel_slice)?;
            curr_bit += num_polys;
            nbits -= num_polys;
        }

        self.leftover_bits = nbits;
        if nbits > 0 {
            self.leftover_data = extract_bits(bytes, curr_bit, nbits as u32);
            if let Some(rel) = reliability {
                self.leftover_reliability[..nbits].copy_from_slice(&rel[curr_bit..curr_bit + nbits]);
            }
        } else {
            self.leftover_data = 0;
        }
        Ok(())
    }

    /// Traceback from the minimum-metric terminal state. Returns the
    /// winning metric and, if `want_uncertainty`, the cumulative branch
    /// metric prefix for every trellis column (including tail columns,
    /// trimmed by the caller).
    fn traceback(&mut self, want_uncertainty: bool) -> (u32, Option<Vec<u32>>) {
        let num_states = self.tables.num_states();
        let mut min_pos = 0usize;
        let mut min_val = self.curr[0];
        for i in 1..num_states {
            if self.curr[i] < min_val {
                min_val = self.curr[i];
                min_pos = i;
            }
        }

        let mut cstate = min_pos;
        let mut running = min_val;
        let mut uncertainty = want_uncertainty.then(|| vec![0u32; self.ctrellis]);

        for col in (0..self.ctrellis).rev() {
            let cell = self.trellis[self.idx(col, cstate)];
            let bit = self.transition_bit(cell.predecessor as usize, cstate) as u16;

            if let Some(u) = uncertainty.as_mut() {
                u[col] = running;
                running = running.saturating_sub(cell.branch_metric);
            }

            let row0 = self.idx(col, 0);
            self.trellis[row0] = TrellisCell { predecessor: bit, branch_metric: 0 };
            cstate = cell.predecessor as usize;
        }

        (min_val, uncertainty)
    }

    fn replay_forward(&mut self) -> Result<(), ConvCodeError> {
        let extra = if self.do_tail { (self.tables.k() - 1) as usize } else { 0 };
        let emit_len = self.ctrellis.saturating_sub(extra);
        for col in 0..emit_len {
            let bit = self.trellis[self.idx(col, 0)].predecessor as u32;
            self.acc.append(bit, 1)?;
        }
        self.acc.finish()
    }

    /// Finish decoding: traceback, replay recovered bits to the sink, and
    /// return `(total_output_bits, num_errs)`.
    pub fn decode_finish(&mut self) -> Result<(usize, u32), ConvCodeError> {
        let (min_val, _) = self.traceback(false);
        self.replay_forward()?;
        tracing::trace!(total = self.acc.total_out_bits(), num_errs = min_val, "decode finished");
        Ok((self.acc.total_out_bits(), min_val))
    }

    /// As [`Decoder::decode_finish`], but also returns the BCJR-style
    /// cumulative uncertainty prefix, one entry per recovered output bit.
    pub fn decode_finish_with_uncertainty(&mut self) -> Result<(usize, u32, Vec<u32>), ConvCodeError> {
        let (min_val, uncertainty) = self.traceback(true);
        let mut uncertainty = uncertainty.expect("requested above");
        let extra = if self.do_tail { (self.tables.k() - 1) as usize } else { 0 };
        let emit_len = self.ctrellis.saturating_sub(extra);
        uncertainty.truncate(emit_len);
        self.replay_forward()?;
        Ok((self.acc.total_out_bits(), min_val, uncertainty))
    }

    pub fn into_sink(self) -> S {
        self.acc.into_sink()
    }

    pub fn sink(&self) -> &S {
        self.acc.sink_ref()
    }
}

/// One-shot, non-streaming decode of a complete codeword into a caller
/// buffer, with optional soft reliabilities and optional per-bit
/// cumulative uncertainty output.
#[allow(clippy::too_many_arguments)]
pub fn decode_block(
    tables: &Rc<EncoderTables>,
    do_tail: bool,
    start_state: usize,
    init_other_states: u32,
    uncertainty_100: u32,
    in_bytes: &[u8],
    nbits: usize,
    reliability: Option<&[u8]>,
    out_bytes: &mut [u8],
    mut out_uncertainty: Option<&mut [u32]>,
) -> Result<(usize, u32), ConvCodeError> {
    let trellis_size = nbits + tables.k() as usize * tables.num_polys();
    let mut dec = Decoder::new(Rc::clone(tables), trellis_size, do_tail, Vec::new());
    dec.set_uncertainty_100(uncertainty_100);
    dec.reinit(start_state, init_other_states)?;
    dec.decode_data(in_bytes, nbits, reliability)?;

    let (total_bits, num_errs) = if out_uncertainty.is_some() {
        let (total_bits, num_errs, uncertainty) = dec.decode_finish_with_uncertainty()?;
        if let Some(slot) = out_uncertainty.as_deref_mut() {
            let n = slot.len().min(uncertainty.len());
            slot[..n].copy_from_slice(&uncertainty[..n]);
        }
        (total_bits, num_errs)
    } else {
        dec.decode_finish()?
    };

    let out = dec.into_sink();
    assert!(out_bytes.len() >= out.len(), "out_bytes too small for decode_block");
    out_bytes[..out.len()].copy_from_slice(&out);
    Ok((total_bits, num_errs))
}
