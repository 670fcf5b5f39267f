//! End-to-end programs driven through the public engine surface.

use lc3_core::{
    asm, traps, CondFlag, Reg, RunOptions, StepEvent, Vm, VmError, IN_PROMPT, PROGRAM_ORIGIN,
};
use std::cell::RefCell;
use std::rc::Rc;

fn halt() -> u16 {
    asm::trap(traps::HALT).unwrap()
}

#[test]
fn immediate_and_register_adds() {
    let program = [
        asm::add_imm(Reg::R0, Reg::R0, -3).unwrap(),
        asm::add_imm(Reg::R1, Reg::R1, 2).unwrap(),
        asm::add_reg(Reg::R2, Reg::R1, Reg::R0).unwrap(),
        halt(),
    ];
    let outcome = Vm::new().run(&program).unwrap();
    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.registers.get(Reg::R0), -3);
    assert_eq!(outcome.registers.get(Reg::R1), 2);
    assert_eq!(outcome.registers.get(Reg::R2), -1);
}

#[test]
fn getc_consumes_queued_input() {
    let program = [asm::trap(traps::GETC).unwrap(), halt()];
    let mut vm = Vm::with_options(RunOptions::default().with_input(vec![65]));
    let outcome = vm.run(&program).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.registers.get(Reg::R0), 65);
    assert!(outcome.output.is_empty());
}

#[test]
fn in_prompts_and_echoes() {
    let program = [asm::trap(traps::IN).unwrap(), halt()];
    let mut vm = Vm::with_options(RunOptions::default().with_input(vec![b'A']));
    let outcome = vm.run(&program).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.registers.get(Reg::R0), b'A' as i16);
    assert_eq!(outcome.output, b"Enter a character: A");
}

#[test]
fn puts_walks_string_from_r0() {
    // R0 is zero on a fresh run, so the string is read from address 0.
    let seed: Vec<i16> = b"Hello\0".iter().map(|&b| b as i16).collect();
    let program = [asm::trap(traps::PUTS).unwrap(), halt()];
    let mut vm = Vm::with_options(RunOptions::default().with_low_memory(seed));
    let outcome = vm.run(&program).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.output, b"Hello");
}

#[test]
fn putsp_unpacks_two_chars_per_word() {
    let program = [asm::trap(traps::PUTSP).unwrap(), halt()];
    let mut vm = Vm::with_options(RunOptions::default().with_low_memory(vec![28488, 25965]));
    let outcome = vm.run(&program).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.output, b"Home");
}

#[test]
fn out_writes_low_byte_of_r0() {
    let program = [
        asm::add_imm(Reg::R0, Reg::R0, b'!' as i16).unwrap(),
        asm::trap(traps::OUT).unwrap(),
        halt(),
    ];
    let outcome = Vm::new().run(&program).unwrap();
    assert_eq!(outcome.output, b"!");
}

#[test]
fn pc_falls_off_the_end_of_memory_cleanly() {
    let words = PROGRAM_ORIGIN as usize + 2;
    let program = [asm::add_imm(Reg::R0, Reg::R0, 1).unwrap()];
    let mut vm = Vm::with_options(RunOptions::default().with_memory_words(words));
    let outcome = vm.run(&program).unwrap();
    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.registers.get(Reg::R0), 1);
    assert_eq!(outcome.registers.pc(), words as u32);

    // One word smaller: the boundary moves, termination stays clean.
    let words = PROGRAM_ORIGIN as usize + 1;
    let mut vm = Vm::with_options(RunOptions::default().with_memory_words(words));
    let outcome = vm.run(&program).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.registers.pc(), words as u32);
}

#[test]
fn fetching_reserved_opcode_fails_the_run() {
    // RES sitting right after the program's only real instruction.
    let program = [asm::add_imm(Reg::R0, Reg::R0, 1).unwrap(), 0xD000];
    let outcome = Vm::new().run(&program).unwrap();
    assert!(!outcome.success);
    assert!(matches!(outcome.error, Some(VmError::BadOpcode { opcode: 13 })));
}

#[test]
fn blocking_read_suspends_until_pushed() {
    let program = [asm::trap(traps::GETC).unwrap(), halt()];
    let mut vm = Vm::new();
    vm.start(&program).unwrap();
    assert_eq!(vm.step().unwrap(), StepEvent::AwaitingInput);
    assert!(vm.pending_read());
    // Still parked until a character arrives.
    assert_eq!(vm.step().unwrap(), StepEvent::AwaitingInput);
    vm.push_char(66);
    assert!(!vm.pending_read());
    assert_eq!(vm.registers().get(Reg::R0), 66);
    assert_eq!(vm.step().unwrap(), StepEvent::Halted);
    let outcome = vm.finish();
    assert!(outcome.success);
    assert_eq!(outcome.registers.get(Reg::R0), 66);
}

#[test]
fn pushed_char_with_no_pending_read_is_enqueued() {
    let program = [asm::trap(traps::GETC).unwrap(), halt()];
    let mut vm = Vm::new();
    vm.start(&program).unwrap();
    vm.push_char(b'q');
    assert_eq!(vm.step().unwrap(), StepEvent::Continue);
    assert_eq!(vm.registers().get(Reg::R0), b'q' as i16);
}

#[test]
fn starved_read_inside_run_is_aborted() {
    let program = [asm::trap(traps::GETC).unwrap(), halt()];
    let outcome = Vm::new().run(&program).unwrap();
    assert!(!outcome.success);
    assert!(matches!(outcome.error, Some(VmError::Aborted)));
}

#[test]
fn abort_while_suspended_cancels_the_run() {
    let program = [asm::trap(traps::IN).unwrap(), halt()];
    let mut vm = Vm::new();
    vm.start(&program).unwrap();
    assert_eq!(vm.step().unwrap(), StepEvent::AwaitingInput);
    vm.abort();
    assert!(!vm.is_running());
    let outcome = vm.finish();
    assert!(!outcome.success);
    assert!(matches!(outcome.error, Some(VmError::Aborted)));
    // The prompt was flushed before the read suspended.
    assert_eq!(outcome.output, IN_PROMPT);
}

#[test]
fn sink_receives_one_chunk_per_trap() {
    let chunks: Rc<RefCell<Vec<Vec<u8>>>> = Rc::default();
    let seen = Rc::clone(&chunks);
    let program = [
        asm::trap(traps::IN).unwrap(),
        asm::trap(traps::OUT).unwrap(),
        halt(),
    ];
    let mut vm = Vm::with_options(RunOptions::default().with_input(vec![b'X']));
    vm.set_output_sink(Box::new(move |chunk| seen.borrow_mut().push(chunk.to_vec())));
    let outcome = vm.run(&program).unwrap();
    assert!(outcome.success);
    assert_eq!(
        &*chunks.borrow(),
        &[IN_PROMPT.to_vec(), vec![b'X'], vec![b'X']]
    );
    assert_eq!(outcome.output, b"Enter a character: XX");
}

#[test]
fn load_family_addressing() {
    // Data: mem[5] holds a value; a pointer to it sits in the image.
    let mut seed = vec![0i16; 6];
    seed[5] = 1234;
    let program = [
        asm::ldr(Reg::R2, Reg::R0, 5).unwrap(), // R0 == 0, so loads mem[5]
        asm::ldi(Reg::R3, 3).unwrap(),          // mem[0x3005] = 5, loads mem[mem[0x3005]]
        asm::lea(Reg::R4, 10).unwrap(),
        halt(),
        0,
        5,
    ];
    let outcome = Vm::with_options(RunOptions::default().with_low_memory(seed))
        .run(&program)
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.registers.get(Reg::R2), 1234);
    assert_eq!(outcome.registers.get(Reg::R3), 1234);
    // LEA executed with PC at origin+3.
    assert_eq!(
        outcome.registers.get(Reg::R4),
        (PROGRAM_ORIGIN + 3 + 10) as i16
    );
}

#[test]
fn ld_loads_pc_relative_and_sets_flags() {
    let program = [
        asm::ld(Reg::R1, 2).unwrap(), // PC is origin+1 here: loads mem[0x3003]
        halt(),
        0,
        (-42i16) as u16,
    ];
    let outcome = Vm::new().run(&program).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.registers.get(Reg::R1), -42);
    assert_eq!(outcome.registers.cond(), CondFlag::Negative);
}

#[test]
fn store_family_addressing() {
    let program = [
        asm::add_imm(Reg::R1, Reg::R1, 7).unwrap(),
        asm::str(Reg::R1, Reg::R0, 20).unwrap(), // R0 == 0: mem[20] = 7
        asm::sti(Reg::R1, 3).unwrap(),           // mem[0x3006] = 30: mem[30] = 7
        halt(),
        0,
        0,
        30,
    ];
    let outcome = Vm::new().run(&program).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.memory[20], 7);
    assert_eq!(outcome.memory[30], 7);
}

#[test]
fn second_run_starts_clean() {
    let program = [
        asm::add_imm(Reg::R0, Reg::R0, 5).unwrap(),
        asm::st(Reg::R0, 100).unwrap(),
        halt(),
    ];
    let mut vm = Vm::new();
    let first = vm.run(&program).unwrap();
    let second = vm.run(&[halt()]).unwrap();
    assert!(first.success && second.success);
    assert_eq!(first.registers.get(Reg::R0), 5);
    assert_eq!(second.registers.get(Reg::R0), 0);
    // The first run's store is not visible in the second run's memory.
    let addr = PROGRAM_ORIGIN as usize + 2 + 100;
    assert_eq!(first.memory[addr], 5);
    assert_eq!(second.memory[addr], 0);
}
