use crate::{
    bits::{get_bits, get_bits_extended, Word},
    error::Fault,
    queue::{IoQueue, IO_QUEUE_CAPACITY},
    symbol::{Condition, Opcode, Register, RunFlag, TrapVect, KBDR, KBSR},
};

/// LC3 can address 128KB of memory.
pub const MEMORY_MAX: usize = 0x10000;

/// What a single [`Vm::step`] did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepOutcome {
    /// Instruction completed normally.
    Executed,
    /// `HALT` stopped the machine.
    Halted,
    /// A character trap needs a word in the input queue. PC still points at the trap, so the
    /// next step retries it.
    WaitingForInput,
    /// A character trap needs more room in the output queue. Retried like
    /// [`StepOutcome::WaitingForInput`].
    WaitingForOutput,
}

/// Complete machine state: memory, registers, run state and the host I/O queues.
pub struct Vm {
    /// System memory - 128KB in size.
    mem: Box<[Word]>,
    /// Program counter
    pc: Word,
    /// 8x 16-bit registers
    reg: [Word; 8],
    /// Condition code
    flag: RunFlag,
    running: bool,
    /// Instructions completed since creation
    executed: u64,
    input: IoQueue,
    output: IoQueue,
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm::with_io_capacity(IO_QUEUE_CAPACITY)
    }

    /// Machine whose input and output queues each hold `capacity` words.
    pub fn with_io_capacity(capacity: usize) -> Self {
        Vm {
            mem: vec![0; MEMORY_MAX].into_boxed_slice(),
            pc: 0,
            reg: [0; 8],
            flag: RunFlag::Uninit,
            running: false,
            executed: 0,
            input: IoQueue::new(capacity),
            output: IoQueue::new(capacity),
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Move the program counter. Rejected while running.
    pub fn set_origin(&mut self, origin: Word) -> Result<(), Fault> {
        if self.running {
            return Err(Fault::Running);
        }
        self.pc = origin;
        Ok(())
    }

    pub fn pc(&self) -> Word {
        self.pc
    }

    pub fn reg(&self, reg: Register) -> Word {
        self.reg[reg.index()]
    }

    pub fn set_reg(&mut self, reg: Register, value: Word) {
        self.reg[reg.index()] = value;
    }

    pub fn flag(&self) -> RunFlag {
        self.flag
    }

    /// Number of instructions that ran to completion.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Words waiting to be read by the program.
    pub fn input(&mut self) -> &mut IoQueue {
        &mut self.input
    }

    /// Words written by the program.
    pub fn output(&mut self) -> &mut IoQueue {
        &mut self.output
    }

    /// Read a word, polling the keyboard when the status register is read.
    ///
    /// Reading [`KBSR`] moves a waiting input word into [`KBDR`] and sets bit 15, or clears the
    /// status when nothing is waiting. This never blocks.
    pub fn read_mem(&mut self, addr: Word) -> Word {
        if addr == KBSR {
            match self.input.pop() {
                Some(word) => {
                    self.mem[KBSR as usize] = 1 << 15;
                    self.mem[KBDR as usize] = word;
                }
                None => self.mem[KBSR as usize] = 0,
            }
        }
        self.mem[addr as usize]
    }

    pub fn write_mem(&mut self, addr: Word, value: Word) {
        self.mem[addr as usize] = value;
    }

    /// Read a word without device side effects.
    pub fn peek(&self, addr: Word) -> Word {
        self.mem[addr as usize]
    }

    /// Whole memory, without device side effects.
    pub fn memory(&self) -> &[Word] {
        &self.mem
    }

    /// Fetch, decode and execute the instruction at PC.
    pub fn step(&mut self) -> Result<StepOutcome, Fault> {
        if !self.running {
            return Err(Fault::NotRunning);
        }

        let instr = self.read_mem(self.pc);
        // PC incremented before instruction is performed
        self.pc = self.pc.wrapping_add(1);

        let outcome = match Opcode::of(instr) {
            Opcode::Br => self.br(instr),
            Opcode::Add => self.add(instr),
            Opcode::Ld => self.ld(instr),
            Opcode::St => self.st(instr),
            Opcode::Jsr => self.jsr(instr),
            Opcode::And => self.and(instr),
            Opcode::Ldr => self.ldr(instr),
            Opcode::Str => self.str(instr),
            Opcode::Not => self.not(instr),
            Opcode::Ldi => self.ldi(instr),
            Opcode::Sti => self.sti(instr),
            Opcode::Jmp => self.jmp(instr),
            Opcode::Lea => self.lea(instr),
            Opcode::Trap => self.trap(instr)?,
            Opcode::Rti | Opcode::Res => {
                return Err(Fault::BadInstruction {
                    addr: self.pc.wrapping_sub(1),
                    instr,
                })
            }
        };
        self.count(outcome);
        Ok(outcome)
    }

    /// Step until the machine stops or a trap waits on I/O.
    ///
    /// With a `limit`, at most that many steps are taken and [`StepOutcome::Executed`] is
    /// returned if the machine was still going.
    pub fn run(&mut self, limit: Option<u64>) -> Result<StepOutcome, Fault> {
        self.start();
        let mut steps = 0;
        loop {
            if limit.is_some_and(|limit| steps >= limit) {
                return Ok(StepOutcome::Executed);
            }
            match self.step()? {
                StepOutcome::Executed => steps += 1,
                other => return Ok(other),
            }
        }
    }

    fn count(&mut self, outcome: StepOutcome) {
        if matches!(outcome, StepOutcome::Executed | StepOutcome::Halted) {
            self.executed += 1;
        }
    }

    #[inline]
    fn r(&self, instr: Word, from: u32) -> Word {
        self.reg[get_bits(instr, from, 3) as usize]
    }

    #[inline]
    fn set_r(&mut self, instr: Word, from: u32, value: Word) {
        self.reg[get_bits(instr, from, 3) as usize] = value;
    }

    #[inline]
    fn pc_offset(&self, instr: Word, bits: u32) -> Word {
        self.pc.wrapping_add(get_bits_extended(instr, 0, bits))
    }

    /// Write a result register and update the condition code from it.
    #[inline]
    fn set_result(&mut self, instr: Word, value: Word) {
        self.set_r(instr, 9, value);
        self.flag = RunFlag::of(value);
    }

    fn br(&mut self, instr: Word) -> StepOutcome {
        let cond = Condition::from_bits(get_bits(instr, 9, 3));
        if cond.matches(self.flag) {
            self.pc = self.pc_offset(instr, 9);
        }
        StepOutcome::Executed
    }

    fn add(&mut self, instr: Word) -> StepOutcome {
        let val1 = self.r(instr, 6);
        let val2 = self.operand2(instr);
        self.set_result(instr, val1.wrapping_add(val2));
        StepOutcome::Executed
    }

    fn and(&mut self, instr: Word) -> StepOutcome {
        let val1 = self.r(instr, 6);
        let val2 = self.operand2(instr);
        self.set_result(instr, val1 & val2);
        StepOutcome::Executed
    }

    /// Second source of ADD and AND, register or imm5 depending on bit 5.
    fn operand2(&self, instr: Word) -> Word {
        if get_bits(instr, 5, 1) == 0 {
            self.r(instr, 0)
        } else {
            get_bits_extended(instr, 0, 5)
        }
    }

    fn ld(&mut self, instr: Word) -> StepOutcome {
        let val = self.read_mem(self.pc_offset(instr, 9));
        self.set_result(instr, val);
        StepOutcome::Executed
    }

    fn ldi(&mut self, instr: Word) -> StepOutcome {
        let ptr = self.read_mem(self.pc_offset(instr, 9));
        let val = self.read_mem(ptr);
        self.set_result(instr, val);
        StepOutcome::Executed
    }

    fn ldr(&mut self, instr: Word) -> StepOutcome {
        let ptr = self.r(instr, 6).wrapping_add(get_bits_extended(instr, 0, 6));
        let val = self.read_mem(ptr);
        self.set_result(instr, val);
        StepOutcome::Executed
    }

    fn lea(&mut self, instr: Word) -> StepOutcome {
        let val = self.pc_offset(instr, 9);
        self.set_result(instr, val);
        StepOutcome::Executed
    }

    fn not(&mut self, instr: Word) -> StepOutcome {
        let val = !self.r(instr, 6);
        self.set_result(instr, val);
        StepOutcome::Executed
    }

    fn st(&mut self, instr: Word) -> StepOutcome {
        let val = self.r(instr, 9);
        self.write_mem(self.pc_offset(instr, 9), val);
        StepOutcome::Executed
    }

    fn sti(&mut self, instr: Word) -> StepOutcome {
        let val = self.r(instr, 9);
        let ptr = self.read_mem(self.pc_offset(instr, 9));
        self.write_mem(ptr, val);
        StepOutcome::Executed
    }

    fn str(&mut self, instr: Word) -> StepOutcome {
        let val = self.r(instr, 9);
        let ptr = self.r(instr, 6).wrapping_add(get_bits_extended(instr, 0, 6));
        self.write_mem(ptr, val);
        StepOutcome::Executed
    }

    fn jmp(&mut self, instr: Word) -> StepOutcome {
        self.pc = self.r(instr, 6);
        StepOutcome::Executed
    }

    fn jsr(&mut self, instr: Word) -> StepOutcome {
        // Link is saved first, so `JSRR R7` jumps to the return address
        self.set_reg(Register::R7, self.pc);
        self.pc = if get_bits(instr, 11, 1) == 1 {
            self.pc_offset(instr, 11)
        } else {
            self.r(instr, 6)
        };
        StepOutcome::Executed
    }

    fn trap(&mut self, instr: Word) -> Result<StepOutcome, Fault> {
        let vect = get_bits(instr, 0, 8);
        let Some(named) = TrapVect::from_vect(vect) else {
            // Service routine address is stored in the vector table
            self.set_reg(Register::R7, self.pc);
            self.pc = self.read_mem(vect);
            return Ok(StepOutcome::Executed);
        };

        match named {
            TrapVect::Getc => match self.input.pop() {
                Some(word) => {
                    self.set_reg(Register::R0, word);
                    Ok(StepOutcome::Executed)
                }
                None => Ok(self.retry(StepOutcome::WaitingForInput)),
            },
            TrapVect::In => {
                if self.input.is_empty() {
                    return Ok(self.retry(StepOutcome::WaitingForInput));
                }
                if self.output.is_full() {
                    return Ok(self.retry(StepOutcome::WaitingForOutput));
                }
                if let Some(word) = self.input.pop() {
                    self.set_reg(Register::R0, word);
                    // Echo; room was checked above
                    let _ = self.output.push(word & 0xFF);
                }
                Ok(StepOutcome::Executed)
            }
            TrapVect::Out => {
                let ch = self.reg(Register::R0) & 0xFF;
                self.write_all(&[ch])
            }
            TrapVect::Puts => {
                let text = self.string_at(self.reg(Register::R0), false);
                self.write_all(&text)
            }
            TrapVect::Putsp => {
                let text = self.string_at(self.reg(Register::R0), true);
                self.write_all(&text)
            }
            TrapVect::Halt => {
                self.stop();
                Ok(StepOutcome::Halted)
            }
        }
    }

    /// Rewind PC onto the current trap so that it runs again on the next step.
    fn retry(&mut self, outcome: StepOutcome) -> StepOutcome {
        self.pc = self.pc.wrapping_sub(1);
        outcome
    }

    /// Queue all of `text` or nothing.
    fn write_all(&mut self, text: &[Word]) -> Result<StepOutcome, Fault> {
        if text.len() > self.output.capacity() {
            return Err(Fault::OutputOverflow {
                addr: self.pc.wrapping_sub(1),
                len: text.len(),
                capacity: self.output.capacity(),
            });
        }
        if text.len() > self.output.free() {
            return Ok(self.retry(StepOutcome::WaitingForOutput));
        }
        for &word in text {
            let _ = self.output.push(word);
        }
        Ok(StepOutcome::Executed)
    }

    /// Null-terminated string starting at `addr`, one character per word or, when `packed`, two
    /// per word with the low byte first.
    ///
    /// Collection stops once the string is longer than the output queue could hold.
    fn string_at(&self, addr: Word, packed: bool) -> Vec<Word> {
        let limit = self.output.capacity() + 1;
        let mut text = Vec::new();
        let mut addr = addr;
        'string: while text.len() < limit {
            let word = self.peek(addr);
            let (chars, len) = if packed {
                ([word & 0xFF, word >> 8], 2)
            } else {
                ([word, 0], 1)
            };
            for &ch in &chars[..len] {
                if ch == 0 {
                    break 'string;
                }
                text.push(ch);
            }
            addr = addr.wrapping_add(1);
        }
        text
    }
}
