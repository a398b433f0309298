//! Truth-table targets and their on-disk format.
//!
//! A table stores one bit-packed vector per input channel and one per
//! output channel, with pattern `p` occupying bit `p` of every vector.
//! That layout is what makes the evaluator bit-parallel: lane `k` of
//! input `j` hands 64 consecutive patterns to the circuit in a single
//! `u64`.
//!
//! The text format:
//!
//! ```text
//! # comments run to end of line
//! iCount  2;
//! oCount  1;
//! radix   2;
//! pattern 00:0, 01:1, 10:1, 11:0;
//! ```
//!
//! `iCount`, `oCount` and `radix` must appear before any `pattern`
//! block. Numbers use digits `0-9a-fA-F` up to the declared radix.
//! Bit `j` of an input pattern feeds input channel `j` (LSB is
//! channel 0).

use crate::bits::BitVector;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("[line {line}, col {column}] {message}")]
    Parse {
        line: u32,
        column: u32,
        message: String,
    },
    #[error("conflicting output for duplicate input pattern {input:#x}")]
    ConflictingPattern { input: u32 },
    #[error("input count must be nonzero")]
    NoInputs,
    #[error("output count must be nonzero")]
    NoOutputs,
    #[error("table contains no patterns")]
    NoPatterns,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A set of `(input, output)` bit patterns the evolver scores against.
#[derive(Clone, Debug)]
pub struct TruthTable {
    pattern_map: BTreeMap<u32, u32>,
    inputs: Vec<BitVector>,
    outputs: Vec<BitVector>,
}

impl TruthTable {
    /// An empty table with fixed channel counts.
    pub fn new(input_count: u32, output_count: u32) -> Result<Self, TableError> {
        if input_count == 0 {
            return Err(TableError::NoInputs);
        }
        if output_count == 0 {
            return Err(TableError::NoOutputs);
        }
        Ok(Self {
            pattern_map: BTreeMap::new(),
            inputs: vec![BitVector::new(); input_count as usize],
            outputs: vec![BitVector::new(); output_count as usize],
        })
    }

    /// Load a table from a pattern file.
    pub fn from_file(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a table from pattern-file text.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut cursor = Cursor::new(text);
        let mut input_count: Option<u32> = None;
        let mut output_count: Option<u32> = None;
        let mut radix: Option<u32> = None;
        let mut patterns: Vec<(u32, u32)> = Vec::new();

        cursor.skip_whitespace();
        while let Some(ch) = cursor.current() {
            if ch == b'#' {
                cursor.skip_line();
            } else if is_name_char(ch) {
                let ident = cursor.take_name();
                match ident.as_str() {
                    "inputCount" | "iCount" => {
                        if input_count.is_some() {
                            return Err(cursor.error("input count already specified"));
                        }
                        input_count = Some(cursor.number(10)?);
                        cursor.expect_semicolon()?;
                    }
                    "outputCount" | "oCount" => {
                        if output_count.is_some() {
                            return Err(cursor.error("output count already specified"));
                        }
                        output_count = Some(cursor.number(10)?);
                        cursor.expect_semicolon()?;
                    }
                    "radix" => {
                        radix = Some(cursor.number(10)?);
                        cursor.expect_semicolon()?;
                    }
                    "pattern" => match radix {
                        Some(radix) => cursor.pattern_list(&mut patterns, radix)?,
                        None => return Err(cursor.error("radix not specified")),
                    },
                    other => {
                        return Err(cursor.error(format!("identifier '{other}' not recognised")))
                    }
                }
            } else {
                return Err(cursor.error(format!("unexpected '{}'", ch as char)));
            }
            cursor.skip_whitespace();
        }

        let input_count = input_count.filter(|&n| n > 0).ok_or(TableError::NoInputs)?;
        let output_count = output_count
            .filter(|&n| n > 0)
            .ok_or(TableError::NoOutputs)?;
        if patterns.is_empty() {
            return Err(TableError::NoPatterns);
        }

        let mut table = Self::new(input_count, output_count)?;
        for (input, output) in patterns {
            table.add_pattern(input, output)?;
        }
        Ok(table)
    }

    /// Add one pattern. Values are masked to the channel counts before
    /// storage. A duplicate input with a matching output is warned and
    /// ignored; a conflicting output is an error.
    pub fn add_pattern(&mut self, input: u32, output: u32) -> Result<(), TableError> {
        let input_masked = input & low_bits(self.inputs.len() as u32);
        let output_masked = output & low_bits(self.outputs.len() as u32);

        if let Some(&existing) = self.pattern_map.get(&input_masked) {
            if existing != output_masked {
                return Err(TableError::ConflictingPattern {
                    input: input_masked,
                });
            }
            warn!("duplicate pattern [{input}:{output}], definition ignored");
            return Ok(());
        }

        for (i, channel) in self.inputs.iter_mut().enumerate() {
            channel.push_bit(input_masked & (1 << i) != 0);
        }
        for (i, channel) in self.outputs.iter_mut().enumerate() {
            channel.push_bit(output_masked & (1 << i) != 0);
        }
        self.pattern_map.insert(input_masked, output_masked);
        Ok(())
    }

    pub fn input_count(&self) -> u32 {
        self.inputs.len() as u32
    }

    pub fn output_count(&self) -> u32 {
        self.outputs.len() as u32
    }

    pub fn pattern_count(&self) -> u32 {
        self.pattern_map.len() as u32
    }

    /// Reconstruct the `(input, output)` pair stored at `index`, in
    /// insertion order.
    pub fn pattern(&self, index: u32) -> (u32, u32) {
        let mut input = 0;
        let mut output = 0;
        for (i, channel) in self.inputs.iter().enumerate() {
            if channel.get_bit(index) {
                input |= 1 << i;
            }
        }
        for (i, channel) in self.outputs.iter().enumerate() {
            if channel.get_bit(index) {
                output |= 1 << i;
            }
        }
        (input, output)
    }

    /// Number of 64-bit lanes covering all patterns.
    pub fn lane_count(&self) -> u32 {
        self.inputs[0].lane_count()
    }

    /// 64 consecutive patterns' worth of input channel `input`.
    pub fn input_lane(&self, input: u32, lane: u32) -> u64 {
        self.inputs[input as usize].lane(lane)
    }

    /// 64 consecutive patterns' worth of output channel `output`.
    pub fn output_lane(&self, output: u32, lane: u32) -> u64 {
        self.outputs[output as usize].lane(lane)
    }

    /// Validity mask for `lane`; zeroes out slots past the final
    /// pattern.
    pub fn lane_mask(&self, lane: u32) -> u64 {
        self.inputs[0].lane_mask(lane)
    }

    /// Panics unless every channel vector carries the same nonzero
    /// pattern count. Tables built through the public interface always
    /// satisfy this.
    pub fn assert_valid(&self) {
        let pattern_bits = self.inputs[0].len();
        assert!(pattern_bits > 0, "truth table is empty");
        for channel in &self.inputs {
            assert_eq!(channel.len(), pattern_bits, "input vector length mismatch");
        }
        for channel in &self.outputs {
            assert_eq!(channel.len(), pattern_bits, "output vector length mismatch");
        }
    }

    /// Write the table back out in binary radix.
    pub fn write_to_file(&self, path: &Path) -> Result<(), TableError> {
        let mut text = String::new();
        let _ = writeln!(text, "radix 2;");
        let _ = writeln!(text, "iCount {};", self.input_count());
        let _ = writeln!(text, "oCount {};", self.output_count());
        for index in 0..self.pattern_count() {
            let (input, output) = self.pattern(index);
            let _ = write!(text, "pattern ");
            for bit in (0..self.input_count()).rev() {
                let _ = write!(text, "{}", (input >> bit) & 1);
            }
            let _ = write!(text, ":");
            for bit in (0..self.output_count()).rev() {
                let _ = write!(text, "{}", (output >> bit) & 1);
            }
            let _ = writeln!(text, ";");
        }
        fs::write(path, text)?;
        Ok(())
    }

    /// Full adder truth table over two `width`-bit operands, with an
    /// optional carry input and output.
    pub fn adder(width: u32, carry: bool) -> Result<Self, TableError> {
        let input_count = width * 2 + carry as u32;
        let output_count = width + carry as u32;
        let mut table = Self::new(input_count, output_count)?;
        let operand_mask = low_bits(width);
        for i in 0..1u32 << input_count {
            let a = i & operand_mask;
            let b = (i >> width) & operand_mask;
            let c = if carry { (i >> (width * 2)) & 1 } else { 0 };
            table.add_pattern(i, a + b + c)?;
        }
        Ok(table)
    }

    /// Multiplier truth table over two `width`-bit operands.
    pub fn multiplier(width: u32) -> Result<Self, TableError> {
        let input_count = width * 2;
        let mut table = Self::new(input_count, input_count)?;
        let operand_mask = low_bits(width);
        for i in 0..1u32 << input_count {
            let a = i & operand_mask;
            let b = (i >> width) & operand_mask;
            table.add_pattern(i, a * b)?;
        }
        Ok(table)
    }
}

fn low_bits(count: u32) -> u32 {
    if count >= 32 {
        u32::MAX
    } else {
        (1u32 << count) - 1
    }
}

fn is_name_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

fn is_number_char(ch: u8) -> bool {
    ch.is_ascii_digit() || matches!(ch, b'a'..=b'f' | b'A'..=b'F')
}

/// Character-level cursor over pattern-file text, tracking line and
/// column for error reporting.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
            column: 0,
        }
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn advance(&mut self) {
        if let Some(&ch) = self.bytes.get(self.pos) {
            self.pos += 1;
            if ch == b'\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> TableError {
        TableError::Parse {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.advance();
        }
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.current() {
            self.advance();
            if ch == b'\n' {
                return;
            }
        }
    }

    fn take_name(&mut self) -> String {
        let start = self.pos;
        while self.current().is_some_and(is_name_char) {
            self.advance();
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }

    fn expect(&mut self, ch: u8) -> Result<(), TableError> {
        match self.current() {
            Some(current) if current == ch => {
                self.advance();
                Ok(())
            }
            Some(current) => Err(self.error(format!(
                "unexpected '{}', expected '{}'",
                current as char, ch as char
            ))),
            None => Err(self.error(format!("unexpected end of file, expected '{}'", ch as char))),
        }
    }

    fn expect_semicolon(&mut self) -> Result<(), TableError> {
        self.skip_whitespace();
        self.expect(b';')
    }

    /// Parse a number at the given radix. Digit characters outside the
    /// radix are rejected; the accumulator wraps like the storage it
    /// feeds.
    fn number(&mut self, radix: u32) -> Result<u32, TableError> {
        if !(2..=16).contains(&radix) {
            return Err(self.error("supported radix values: 2 - 16"));
        }
        self.skip_whitespace();
        let start = self.pos;
        while self.current().is_some_and(is_number_char) {
            self.advance();
        }
        let digits = &self.bytes[start..self.pos];
        if digits.is_empty() {
            return Err(self.error("expected a number"));
        }
        let mut value: u32 = 0;
        for &ch in digits {
            let digit = (ch as char)
                .to_digit(radix)
                .ok_or_else(|| self.error(format!("'{}' outside radix bounds", ch as char)))?;
            value = value.wrapping_mul(radix).wrapping_add(digit);
        }
        Ok(value)
    }

    /// Parse one `<input>:<output>` pattern.
    fn pattern(&mut self, radix: u32) -> Result<(u32, u32), TableError> {
        self.skip_whitespace();
        if !self.current().is_some_and(is_number_char) {
            return Err(self.error("expected bit pattern specification"));
        }
        let input = self.number(radix)?;
        self.skip_whitespace();
        self.expect(b':')?;
        self.skip_whitespace();
        if !self.current().is_some_and(is_number_char) {
            return Err(self.error("expected bit pattern specification"));
        }
        let output = self.number(radix)?;
        Ok((input, output))
    }

    /// Parse a comma-separated pattern list terminated by a semicolon.
    fn pattern_list(
        &mut self,
        patterns: &mut Vec<(u32, u32)>,
        radix: u32,
    ) -> Result<(), TableError> {
        loop {
            patterns.push(self.pattern(radix)?);
            self.skip_whitespace();
            match self.current() {
                Some(b';') => {
                    self.advance();
                    return Ok(());
                }
                Some(b',') => self.advance(),
                Some(other) => {
                    return Err(
                        self.error(format!("unexpected '{}', expected ';' or ','", other as char))
                    )
                }
                None => return Err(self.error("unexpected end of file, expected ';' or ','")),
            }
        }
    }
}
