//! Buffered character I/O for the trap subsystem.

use std::collections::VecDeque;
use std::fmt;

/// Trap vectors dispatched by the TRAP opcode's low byte.
pub mod traps {
    /// Blocking read of one character into R0, no echo.
    pub const GETC: u16 = 0x20;
    /// Write the character in R0's low byte.
    pub const OUT: u16 = 0x21;
    /// Write a null-terminated string, one character per word, from the
    /// address in R0.
    pub const PUTS: u16 = 0x22;
    /// Prompt, then blocking read of one character into R0 with echo.
    pub const IN: u16 = 0x23;
    /// Write a packed string, two characters per word (low byte first),
    /// from the address in R0.
    pub const PUTSP: u16 = 0x24;
    /// Stop the machine.
    pub const HALT: u16 = 0x25;
}

/// Prompt printed by the `IN` trap before it reads.
pub const IN_PROMPT: &[u8] = b"Enter a character: ";

/// Callback receiving each flushed output chunk as it is produced.
pub type OutputSink = Box<dyn FnMut(&[u8])>;

/// Character queues for one engine instance: an input queue consumed by the
/// read traps and an accumulated output log flushed chunk-wise to an
/// optional sink.
#[derive(Default)]
pub struct IoChannel {
    input: VecDeque<u8>,
    output: Vec<u8>,
    sink: Option<OutputSink>,
}

impl fmt::Debug for IoChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoChannel")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("sink", &self.sink.as_ref().map(|_| "..."))
            .finish()
    }
}

impl IoChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&mut self, sink: OutputSink) {
        self.sink = Some(sink);
    }

    pub fn queue_input(&mut self, byte: u8) {
        self.input.push_back(byte);
    }

    pub fn extend_input<I: IntoIterator<Item = u8>>(&mut self, bytes: I) {
        self.input.extend(bytes);
    }

    pub fn pop_input(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    /// Appends one trap's worth of output to the log and hands the chunk to
    /// the sink. Called once per output-producing trap, not batched.
    pub fn flush(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.output.extend_from_slice(chunk);
        if let Some(sink) = self.sink.as_mut() {
            sink(chunk);
        }
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }
}
