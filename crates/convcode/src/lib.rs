//! Convolutional encoder, soft-decision Viterbi decoder, and block
//! interleaver for forward-error-correction layers (radio, space, and
//! telemetry protocols such as Voyager, LTE, CDMA2000, and Cassini).
//!
//! Bit order is low-bit-first throughout the public API: the first bit
//! fed in or read out is bit 0 of the first byte.

pub mod bitstream;
pub mod branch_metric;
pub mod encoder;
pub mod error;
pub mod interleaver;
pub mod presets;
pub mod tables;
pub mod trellis;

pub use bitstream::{extract_bits, BitSink};
pub use encoder::{encode_block, Encoder};
pub use error::ConvCodeError;
pub use interleaver::{deinterleave, interleave, Interleaver};
pub use tables::EncoderTables;
pub use trellis::{decode_block, Decoder, DEFAULT_INIT_OTHER_STATES, DEFAULT_UNCERTAINTY_100};

use std::rc::Rc;

/// A convolutional codec instance: shared tables plus an encode session
/// and a decode session, each with its own `Vec<u8>` output buffer.
///
/// Encoding and decoding may be driven independently and interleaved in
/// any order; they share only the immutable tables.
pub struct ConvCode {
    tables: Rc<EncoderTables>,
    encoder: Encoder<Vec<u8>>,
    decoder: Decoder<Vec<u8>>,
}

impl ConvCode {
    /// `max_decode_len_bits` bounds the trellis: the largest message
    /// length (in bits, before the tail) the decoder can handle in one
    /// session before returning `CapacityError`.
    pub fn new(
        k: u32,
        polys: &[u32],
        do_tail: bool,
        recursive: bool,
        max_decode_len_bits: usize,
    ) -> Result<Self, ConvCodeError> {
        let tables = Rc::new(EncoderTables::build(k, polys, recursive)?);
        let trellis_size = max_decode_len_bits + tables.k() as usize * tables.num_polys();
        let encoder = Encoder::new(Rc::clone(&tables), do_tail, Vec::new());
        let decoder = Decoder::new(Rc::clone(&tables), trellis_size, do_tail, Vec::new());
        Ok(Self { tables, encoder, decoder })
    }

    pub fn tables(&self) -> &Rc<EncoderTables> {
        &self.tables
    }

    pub fn set_encode_output_per_symbol(&mut self, val: bool) {
        self.encoder.set_output_per_symbol(val);
    }

    pub fn set_decode_uncertainty_100(&mut self, uncertainty_100: u32) {
        self.decoder.set_uncertainty_100(uncertainty_100);
    }

    pub fn reinit_encoder(&mut self, start_state: usize) -> Result<(), ConvCodeError> {
        self.encoder.reinit(start_state)
    }

    pub fn reinit_decoder(
        &mut self,
        start_state: usize,
        init_other_states: u32,
    ) -> Result<(), ConvCodeError> {
        self.decoder.reinit(start_state, init_other_states)
    }

    pub fn reinit(&mut self) -> Result<(), ConvCodeError> {
        self.reinit_encoder(0)?;
        self.reinit_decoder(0, DEFAULT_INIT_OTHER_STATES)
    }

    pub fn encode_data(&mut self, bytes: &[u8], nbits: usize) -> Result<(), ConvCodeError> {
        self.encoder.encode_data(bytes, nbits)
    }

    pub fn encode_finish(&mut self) -> Result<usize, ConvCodeError> {
        self.encoder.encode_finish()
    }

    pub fn encoded(&self) -> &[u8] {
        self.encoder.sink()
    }

    pub fn decode_data(
        &mut self,
        bytes: &[u8],
        nbits: usize,
        reliability: Option<&[u8]>,
    ) -> Result<(), ConvCodeError> {
        self.decoder.decode_data(bytes, nbits, reliability)
    }

    pub fn decode_finish(&mut self) -> Result<(usize, u32), ConvCodeError> {
        self.decoder.decode_finish()
    }

    pub fn decode_finish_with_uncertainty(
        &mut self,
    ) -> Result<(usize, u32, Vec<u32>), ConvCodeError> {
        self.decoder.decode_finish_with_uncertainty()
    }

    pub fn decoded(&self) -> &[u8] {
        self.decoder.sink()
    }
}
