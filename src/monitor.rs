//! Recording and independent decoding of bus activity.
//!
//! The testbench appends a [`LineTransition`] to its [`BusTrace`] whenever
//! the bus lines change. [`FrameDecoder`] rebuilds frames from such a trace
//! without sharing any state with the encoder: it samples the data line on
//! every bus clock rising edge while select is asserted, and emits a frame
//! when select is released after exactly sixteen bits.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::LineTransition;
use crate::frame::{BusFrame, FRAME_BITS};
use crate::lines::Level;

/// Ordered log of bus line changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BusTrace {
    transitions: Vec<LineTransition>,
}

impl BusTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, transition: LineTransition) {
        self.transitions.push(transition);
    }

    pub fn transitions(&self) -> &[LineTransition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }

    /// Frames decoded from the whole trace.
    pub fn frames(&self) -> Vec<BusFrame> {
        decode_frames(&self.transitions)
    }
}

/// Streaming frame decoder.
#[derive(Clone, Debug, Default)]
pub struct FrameDecoder {
    bits: Vec<Level>,
    in_frame: bool,
    /// Select windows closed with the wrong number of bits
    pub malformed: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transition; returns a frame when one completes.
    pub fn feed(&mut self, transition: &LineTransition) -> Option<BusFrame> {
        if transition.is_select() {
            self.in_frame = true;
            self.bits.clear();
        }

        if self.in_frame && transition.after.is_selected() && transition.is_clock_rise() {
            self.bits.push(transition.after.data);
        }

        if transition.is_deselect() && self.in_frame {
            self.in_frame = false;
            let bits = std::mem::take(&mut self.bits);
            if bits.len() == FRAME_BITS {
                return BusFrame::from_bits(&bits);
            }
            debug!(bits = bits.len(), tick = transition.tick, "malformed frame on bus");
            self.malformed += 1;
        }
        None
    }
}

/// Decodes every complete frame in a list of transitions.
pub fn decode_frames(transitions: &[LineTransition]) -> Vec<BusFrame> {
    let mut decoder = FrameDecoder::new();
    transitions.iter().filter_map(|t| decoder.feed(t)).collect()
}
