//! Convolutional encoder: applies [`EncoderTables`] to an input bit stream.

use std::rc::Rc;

use crate::bitstream::{BitAccumulator, BitSink};
use crate::error::ConvCodeError;
use crate::tables::EncoderTables;

/// Streaming encoder over a caller-supplied [`BitSink`].
pub struct Encoder<S: BitSink> {
    tables: Rc<EncoderTables>,
    state: usize,
    do_tail: bool,
    output_symbol_size: bool,
    acc: BitAccumulator<S>,
}

impl<S: BitSink> Encoder<S> {
    pub fn new(tables: Rc<EncoderTables>, do_tail: bool, sink: S) -> Self {
        Self {
            tables,
            state: 0,
            do_tail,
            output_symbol_size: false,
            acc: BitAccumulator::new(sink),
        }
    }

    /// If `val`, encoder output comes out in exactly `num_polys`-bit chunks
    /// instead of packed bytes with a possibly short final chunk.
    pub fn set_output_per_symbol(&mut self, val: bool) {
        self.output_symbol_size = val;
    }

    /// `start_state` is normally 0; for tail-biting, pass the last `k-1`
    /// bits of the message.
    pub fn reinit(&mut self, start_state: usize) -> Result<(), ConvCodeError> {
        if start_state >= self.tables.num_states() {
            return Err(ConvCodeError::ConfigError { reason: "start_state out of range" });
        }
        self.state = start_state;
        self.acc.reset();
        tracing::trace!(start_state, "encoder reinit");
        Ok(())
    }

    fn encode_bit(&mut self, bit: u32) -> Result<(), ConvCodeError> {
        let sym = self.tables.convert(bit, self.state);
        self.state = self.tables.next_state(bit, self.state);
        if self.output_symbol_size {
            self.acc.append_symbol(sym, self.tables.num_polys() as u32)
        } else {
            self.acc.append(sym, self.tables.num_polys() as u32)
        }
    }

    /// Feed `nbits` input bits from `bytes`, low-bit-first.
    pub fn encode_data(&mut self, bytes: &[u8], nbits: usize) -> Result<(), ConvCodeError> {
        let mut remaining = nbits;
        let mut i = 0;
        while remaining > 0 {
            let byte = bytes[i];
            let take = remaining.min(8);
            for j in 0..take {
                self.encode_bit(((byte >> j) & 1) as u32)?;
            }
            remaining -= take;
            i += 1;
        }
        Ok(())
    }

    /// Append the `k-1`-bit zero tail (if `do_tail`) and flush. Returns total output bits.
    pub fn encode_finish(&mut self) -> Result<usize, ConvCodeError> {
        if self.do_tail {
            for _ in 0..self.tables.k() - 1 {
                self.encode_bit(0)?;
            }
        }
        self.acc.finish()?;
        tracing::trace!(total_out_bits = self.acc.total_out_bits(), "encode finished");
        Ok(self.acc.total_out_bits())
    }

    pub fn into_sink(self) -> S {
        self.acc.into_sink()
    }

    pub fn sink(&self) -> &S {
        self.acc.sink_ref()
    }
}

impl<S: BitSink> BitAccumulator<S> {
    /// Per-symbol mode: each symbol is flushed as its own `num_polys`-bit
    /// chunk instead of being packed across byte boundaries.
    fn append_symbol(&mut self, sym: u32, num_polys: u32) -> Result<(), ConvCodeError> {
        self.append(sym, num_polys)?;
        self.finish()
    }
}

/// One-shot, non-streaming encode directly into a caller-provided byte
/// buffer. Equivalent to `encode_data` + `encode_finish` with no sink
/// callback involved.
pub fn encode_block(
    tables: &Rc<EncoderTables>,
    do_tail: bool,
    start_state: usize,
    in_bytes: &[u8],
    nbits: usize,
    out_bytes: &mut [u8],
) -> Result<usize, ConvCodeError> {
    let mut enc = Encoder::new(Rc::clone(tables), do_tail, Vec::new());
    enc.reinit(start_state)?;
    enc.encode_data(in_bytes, nbits)?;
    let total_bits = enc.encode_finish()?;
    let out = enc.into_sink();
    assert!(out_bytes.len() >= out.len(), "out_bytes too small for encode_block");
    out_bytes[..out.len()].copy_from_slice(&out);
    Ok(total_bits)
}
