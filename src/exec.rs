//! Execution engine: fetch/decode/execute state machine over one owned
//! register file, memory image, and I/O channel.

use crate::decode::{decode, Instr};
use crate::io::{traps, IoChannel, OutputSink, IN_PROMPT};
use crate::memory::{Memory, DEFAULT_MEMORY_WORDS, PROGRAM_ORIGIN};
use crate::state::{Reg, Registers};
use crate::{Result, VmError};
use std::env;

pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

/// Per-run configuration. All fields have defaults; the builder methods
/// mirror the struct fields.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Backing store size in words.
    pub memory_words: usize,
    /// Seed for the low-memory data region (address 0, capped).
    pub low_memory: Vec<i16>,
    /// Initial input queue consumed by the read traps.
    pub input: Vec<u8>,
    /// Safety valve against runaway programs; not part of the
    /// architectural contract.
    pub step_limit: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            memory_words: DEFAULT_MEMORY_WORDS,
            low_memory: Vec::new(),
            input: Vec::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

impl RunOptions {
    pub fn with_memory_words(mut self, words: usize) -> Self {
        self.memory_words = words;
        self
    }

    pub fn with_low_memory(mut self, seed: Vec<i16>) -> Self {
        self.low_memory = seed;
        self
    }

    pub fn with_input(mut self, input: Vec<u8>) -> Self {
        self.input = input;
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Idle,
    Running,
    Halted,
}

/// What one `step` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// Instruction executed, machine still running.
    Continue,
    /// Machine reached a terminal state (clean halt or captured error).
    Halted,
    /// A blocking read is parked; supply a character via
    /// [`Vm::push_char`] to make progress.
    AwaitingInput,
}

/// Completion token for the single outstanding blocking read.
#[derive(Debug, Clone, Copy)]
struct PendingRead {
    echo: bool,
}

/// Point-in-time capture of a finished run. Does not alias live engine
/// state.
#[derive(Debug)]
pub struct RunOutcome {
    pub success: bool,
    pub error: Option<VmError>,
    pub registers: Registers,
    pub memory: Vec<i16>,
    pub output: Vec<u8>,
}

enum Flow {
    Continue,
    Halt,
    Await,
}

/// One virtual machine instance. All architectural state is owned here;
/// concurrent use is rejected, not synchronized.
#[derive(Debug)]
pub struct Vm {
    options: RunOptions,
    registers: Registers,
    memory: Memory,
    io: IoChannel,
    status: Status,
    pending: Option<PendingRead>,
    error: Option<VmError>,
    steps: u64,
}

impl Default for Vm {
    fn default() -> Self {
        Vm::with_options(RunOptions::default())
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm::default()
    }

    pub fn with_options(options: RunOptions) -> Self {
        let memory = Memory::new(options.memory_words);
        Self {
            options,
            registers: Registers::default(),
            memory,
            io: IoChannel::new(),
            status: Status::Idle,
            pending: None,
            error: None,
            steps: 0,
        }
    }

    /// Registers the callback that receives each flushed output chunk.
    pub fn set_output_sink(&mut self, sink: OutputSink) {
        self.io.set_sink(sink);
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn output(&self) -> &[u8] {
        self.io.output()
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn pending_read(&self) -> bool {
        self.pending.is_some()
    }

    /// Resets state and loads `program` at the origin. Rejects while a run
    /// is in progress.
    pub fn start(&mut self, program: &[u16]) -> Result<()> {
        if self.status == Status::Running {
            return Err(VmError::AlreadyRunning);
        }
        self.registers = Registers::default();
        self.memory = Memory::new(self.options.memory_words);
        self.memory.seed_low(&self.options.low_memory);
        self.memory.load_program(program);
        self.io.clear();
        self.io.extend_input(self.options.input.iter().copied());
        self.pending = None;
        self.error = None;
        self.steps = 0;
        self.registers.set_pc(PROGRAM_ORIGIN as u32);
        self.status = Status::Running;
        Ok(())
    }

    /// Fetches, decodes, and executes one instruction. The PC is
    /// incremented at fetch, before any operand interpretation.
    pub fn step(&mut self) -> Result<StepEvent> {
        if self.status != Status::Running {
            return Err(VmError::NotRunning);
        }
        if self.pending.is_some() {
            return Ok(StepEvent::AwaitingInput);
        }
        if self.steps >= self.options.step_limit {
            self.halt_with(VmError::StepLimitExceeded(self.options.step_limit));
            return Ok(StepEvent::Halted);
        }
        let pc = self.registers.pc();
        let word = match self.memory.fetch(pc) {
            Some(word) => word,
            None => {
                // PC past the end of allocated memory: clean termination.
                self.status = Status::Halted;
                return Ok(StepEvent::Halted);
            }
        };
        if env::var("LC3_TRACE").is_ok() {
            eprintln!("[lc3] pc={pc:#07x} word={word:#06x}");
        }
        self.registers.set_pc(pc + 1);
        self.steps += 1;
        let flow = decode(word).and_then(|instr| self.execute(instr));
        match flow {
            Ok(Flow::Continue) => Ok(StepEvent::Continue),
            Ok(Flow::Await) => Ok(StepEvent::AwaitingInput),
            Ok(Flow::Halt) => {
                self.status = Status::Halted;
                Ok(StepEvent::Halted)
            }
            Err(err) => {
                self.halt_with(err);
                Ok(StepEvent::Halted)
            }
        }
    }

    /// Supplies one input character: resolves the outstanding blocking read
    /// if there is one, otherwise enqueues for a later read.
    pub fn push_char(&mut self, byte: u8) {
        match self.pending.take() {
            Some(pending) => self.complete_read(byte, pending.echo),
            None => self.io.queue_input(byte),
        }
    }

    /// Explicit cancellation: forces the engine into the terminal state
    /// with the distinguished cancellation condition.
    pub fn abort(&mut self) {
        self.pending = None;
        self.error = Some(VmError::Aborted);
        self.status = Status::Halted;
    }

    /// Captures the run outcome and restores the engine to its initial
    /// state. A still-running engine is aborted first.
    pub fn finish(&mut self) -> RunOutcome {
        if self.status == Status::Running {
            self.abort();
        }
        let error = self.error.take();
        let outcome = RunOutcome {
            success: error.is_none(),
            error,
            registers: self.registers.clone(),
            memory: self.memory.snapshot(),
            output: self.io.take_output(),
        };
        self.io.clear();
        self.pending = None;
        self.status = Status::Idle;
        outcome
    }

    /// Drives a whole program: `start`, then `step` until terminal,
    /// returning the captured outcome. Single-shot; the engine is back to
    /// its initial state on return. A blocking read that cannot be
    /// satisfied from the pre-supplied input queue is aborted, since no
    /// caller can push characters inside a synchronous run.
    pub fn run(&mut self, program: &[u16]) -> Result<RunOutcome> {
        self.start(program)?;
        loop {
            match self.step()? {
                StepEvent::Continue => {}
                StepEvent::Halted => break,
                StepEvent::AwaitingInput => {
                    self.abort();
                    break;
                }
            }
        }
        Ok(self.finish())
    }

    fn halt_with(&mut self, err: VmError) {
        self.error = Some(err);
        self.status = Status::Halted;
    }

    /// Target address for PC-relative addressing, in 16-bit address space.
    fn pc_relative(&self, offset: i16) -> u16 {
        self.registers.pc_addr().wrapping_add(offset as u16)
    }

    fn execute(&mut self, instr: Instr) -> Result<Flow> {
        let regs = &mut self.registers;
        match instr {
            Instr::AddImm { dr, sr1, imm } => {
                let value = regs.get(sr1).wrapping_add(imm);
                regs.set_flagged(dr, value);
            }
            Instr::AddReg { dr, sr1, sr2 } => {
                let value = regs.get(sr1).wrapping_add(regs.get(sr2));
                regs.set_flagged(dr, value);
            }
            Instr::AndImm { dr, sr1, imm } => {
                let value = regs.get(sr1) & imm;
                regs.set_flagged(dr, value);
            }
            Instr::AndReg { dr, sr1, sr2 } => {
                let value = regs.get(sr1) & regs.get(sr2);
                regs.set_flagged(dr, value);
            }
            Instr::Not { dr, sr } => {
                let value = !regs.get(sr);
                regs.set_flagged(dr, value);
            }
            Instr::Br { mask, offset } => {
                if mask & regs.cond().mask() != 0 {
                    let target = self.pc_relative(offset);
                    self.registers.set_pc(target as u32);
                }
            }
            Instr::Jmp { base } => {
                let target = regs.get(base) as u16;
                regs.set_pc(target as u32);
            }
            Instr::Jsr { offset } => {
                regs.set(Reg::R7, regs.pc_addr() as i16);
                let target = self.pc_relative(offset);
                self.registers.set_pc(target as u32);
            }
            Instr::Jsrr { base } => {
                regs.set(Reg::R7, regs.pc_addr() as i16);
                let target = regs.get(base) as u16;
                regs.set_pc(target as u32);
            }
            Instr::Ld { dr, offset } => {
                let addr = self.pc_relative(offset);
                let value = self.memory.read(addr);
                self.registers.set_flagged(dr, value);
            }
            Instr::Ldi { dr, offset } => {
                let addr = self.pc_relative(offset);
                let indirect = self.memory.read_word(addr);
                let value = self.memory.read(indirect);
                self.registers.set_flagged(dr, value);
            }
            Instr::Ldr { dr, base, offset } => {
                let addr = (regs.get(base) as u16).wrapping_add(offset as u16);
                let value = self.memory.read(addr);
                self.registers.set_flagged(dr, value);
            }
            Instr::Lea { dr, offset } => {
                let addr = self.pc_relative(offset);
                self.registers.set_flagged(dr, addr as i16);
            }
            Instr::St { sr, offset } => {
                let value = regs.get(sr);
                let addr = self.pc_relative(offset);
                self.memory.write(addr, value);
            }
            Instr::Sti { sr, offset } => {
                let addr = self.pc_relative(offset);
                let indirect = self.memory.read_word(addr);
                let value = self.registers.get(sr);
                self.memory.write(indirect, value);
            }
            Instr::Str { sr, base, offset } => {
                let addr = (regs.get(base) as u16).wrapping_add(offset as u16);
                let value = regs.get(sr);
                self.memory.write(addr, value);
            }
            Instr::Trap { vector } => return self.trap(vector),
        }
        Ok(Flow::Continue)
    }

    fn trap(&mut self, vector: u16) -> Result<Flow> {
        match vector {
            traps::GETC => self.read_char(false),
            traps::OUT => {
                let byte = (self.registers.get(Reg::R0) as u16 & 0xFF) as u8;
                self.io.flush(&[byte]);
                Ok(Flow::Continue)
            }
            traps::PUTS => {
                let chunk = self.collect_string(false);
                self.io.flush(&chunk);
                Ok(Flow::Continue)
            }
            traps::IN => {
                self.io.flush(IN_PROMPT);
                self.read_char(true)
            }
            traps::PUTSP => {
                let chunk = self.collect_string(true);
                self.io.flush(&chunk);
                Ok(Flow::Continue)
            }
            traps::HALT => Ok(Flow::Halt),
            other => Err(VmError::BadTrap { vector: other }),
        }
    }

    /// Walks the string starting at the address in R0 up to its zero
    /// terminator; `packed` reads two characters per word, low byte first,
    /// omitting a zero high byte.
    fn collect_string(&self, packed: bool) -> Vec<u8> {
        let mut addr = self.registers.get(Reg::R0) as u16;
        let mut chunk = Vec::new();
        // The walk is bounded by the store size so an unterminated string
        // cannot spin forever on a wrapped address.
        for _ in 0..self.memory.len() {
            let word = self.memory.read_word(addr);
            if word == 0 {
                break;
            }
            if packed {
                chunk.push((word & 0xFF) as u8);
                let high = (word >> 8) as u8;
                if high != 0 {
                    chunk.push(high);
                }
            } else {
                chunk.push((word & 0xFF) as u8);
            }
            addr = addr.wrapping_add(1);
        }
        chunk
    }

    fn read_char(&mut self, echo: bool) -> Result<Flow> {
        match self.io.pop_input() {
            Some(byte) => {
                self.complete_read(byte, echo);
                Ok(Flow::Continue)
            }
            None => {
                self.pending = Some(PendingRead { echo });
                Ok(Flow::Await)
            }
        }
    }

    fn complete_read(&mut self, byte: u8, echo: bool) {
        self.registers.set(Reg::R0, byte as i16);
        if echo {
            self.io.flush(&[byte]);
        }
    }
}
