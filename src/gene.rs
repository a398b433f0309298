//! Logic-graph nodes.
//!
//! A [`Gene`] is one node of a feed-forward boolean circuit: a two-input
//! logic function, the indices of its two predecessors, and a cached
//! 64-bit output buffer. Evaluation is bit-parallel: one `u64` carries
//! the gene's output for 64 truth-table patterns at once.
//!
//! The genome is always a DAG with strictly backward edges: for a gene
//! at index `i > 0`, both predecessor indices are `< i`. That invariant
//! is what lets [`output`] recurse without a cycle check.

use crate::algorithm::IslandAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight two-input logic functions a gene can compute.
///
/// `Nop` and `Not` are single-input; they ignore the `b` predecessor
/// entirely (it is never even evaluated).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneFunction {
    Nop = 0,
    Not = 1,
    And = 2,
    Nand = 3,
    Or = 4,
    Nor = 5,
    Xor = 6,
    Xnor = 7,
}

impl GeneFunction {
    pub const COUNT: usize = 8;

    /// Decode the wire byte; `None` for bytes outside the enum.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Nop),
            1 => Some(Self::Not),
            2 => Some(Self::And),
            3 => Some(Self::Nand),
            4 => Some(Self::Or),
            5 => Some(Self::Nor),
            6 => Some(Self::Xor),
            7 => Some(Self::Xnor),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether the function consults its second input.
    pub fn uses_b(self) -> bool {
        !matches!(self, Self::Nop | Self::Not)
    }
}

impl fmt::Display for GeneFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nop => "NOP",
            Self::Not => "NOT",
            Self::And => "AND",
            Self::Nand => "NAND",
            Self::Or => "OR",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
            Self::Xnor => "XNOR",
        };
        f.write_str(name)
    }
}

/// Minimal gene representation for transmission between processes.
///
/// On the wire this is exactly [`FRAME_BYTES`] bytes: the function byte
/// followed by the two predecessor indices as little-endian `u16`s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneFrame {
    pub function: GeneFunction,
    pub a_index: u16,
    pub b_index: u16,
}

/// Packed size of one gene frame on the wire.
pub const FRAME_BYTES: usize = 5;

impl GeneFrame {
    pub fn encode(&self) -> [u8; FRAME_BYTES] {
        let a = self.a_index.to_le_bytes();
        let b = self.b_index.to_le_bytes();
        [self.function.as_byte(), a[0], a[1], b[0], b[1]]
    }

    /// Decode one frame; `None` if the function byte is not a known
    /// gene function.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        assert_eq!(bytes.len(), FRAME_BYTES, "gene frame must be {FRAME_BYTES} bytes");
        Some(Self {
            function: GeneFunction::from_byte(bytes[0])?,
            a_index: u16::from_le_bytes([bytes[1], bytes[2]]),
            b_index: u16::from_le_bytes([bytes[3], bytes[4]]),
        })
    }
}

/// One node in the evaluation graph.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Gene {
    function: GeneFunction,
    a_index: u16,
    b_index: u16,
    buffer: u64,
    buffer_valid: bool,
}

impl Default for Gene {
    fn default() -> Self {
        Self {
            function: GeneFunction::Nop,
            a_index: 0,
            b_index: 0,
            buffer: 0,
            buffer_valid: false,
        }
    }
}

impl Gene {
    pub fn from_frame(frame: GeneFrame) -> Self {
        Self {
            function: frame.function,
            a_index: frame.a_index,
            b_index: frame.b_index,
            buffer: 0,
            buffer_valid: false,
        }
    }

    pub fn frame(&self) -> GeneFrame {
        GeneFrame {
            function: self.function,
            a_index: self.a_index,
            b_index: self.b_index,
        }
    }

    pub fn function(&self) -> GeneFunction {
        self.function
    }

    pub fn set_function(&mut self, function: GeneFunction) {
        self.function = function;
    }

    pub fn a_index(&self) -> u16 {
        self.a_index
    }

    pub fn set_a_index(&mut self, index: u16) {
        self.a_index = index;
    }

    pub fn b_index(&self) -> u16 {
        self.b_index
    }

    pub fn set_b_index(&mut self, index: u16) {
        self.b_index = index;
    }

    /// A gene whose buffer survived the last evaluation was reached
    /// from an output tap.
    pub fn is_active(&self) -> bool {
        self.buffer_valid
    }

    pub fn clear_buffer(&mut self) {
        self.buffer_valid = false;
    }

    /// Force the buffer to `value` and mark it valid. Used to shadow
    /// the input-sink genes with truth-table input lanes.
    pub fn override_buffer(&mut self, value: u64) {
        self.buffer = value;
        self.buffer_valid = true;
    }

    /// Apply the gene function to two input lanes, one pattern per bit.
    pub fn compute_output(&self, a: u64, b: u64) -> u64 {
        match self.function {
            GeneFunction::Nop => a,
            GeneFunction::Not => !a,
            GeneFunction::And => a & b,
            GeneFunction::Nand => !(a & b),
            GeneFunction::Or => a | b,
            GeneFunction::Nor => !(a | b),
            GeneFunction::Xor => a ^ b,
            GeneFunction::Xnor => !(a ^ b),
        }
    }

    /// Randomly alter one of the gene's three characteristics: the `a`
    /// edge, the `b` edge, or the function.
    ///
    /// Returns the prior buffer validity. A mutation that hits a gene
    /// which was reached from an output tap invalidates the owning
    /// genome's cached score; the caller uses the return value to make
    /// that call.
    pub fn mutate(&mut self, self_index: usize, algorithm: &mut IslandAlgorithm) -> bool {
        match algorithm.draw(0, 2) {
            0 => self.a_index = algorithm.random_gene_input_index(self_index),
            1 => self.b_index = algorithm.random_gene_input_index(self_index),
            _ => self.function = algorithm.random_gene_function(),
        }
        let previously_active = self.buffer_valid;
        self.buffer_valid = false;
        previously_active
    }
}

/// Recursively evaluate the output buffer of `genes[index]`.
///
/// Memoizing: a valid buffer is returned as-is, so each gene is
/// computed at most once per lane sweep. Recursion terminates because
/// edges point strictly backward; depth is bounded by the genome
/// length.
pub fn output(genes: &mut [Gene], index: usize) -> u64 {
    if genes[index].buffer_valid {
        return genes[index].buffer;
    }
    let function = genes[index].function;
    let a_index = genes[index].a_index as usize;
    let b_index = genes[index].b_index as usize;

    let a = output(genes, a_index);
    let b = if function.uses_b() {
        output(genes, b_index)
    } else {
        0
    };

    let value = genes[index].compute_output(a, b);
    genes[index].buffer = value;
    genes[index].buffer_valid = true;
    value
}
