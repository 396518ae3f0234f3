use log::*;

use crate::core::{
    opcodes::{opcode, AddressingMode, Mnemonic, Opcode},
    Bus, StatusRegister, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR,
};

/// Cycles consumed by servicing an NMI.
const INTERRUPT_CYCLES: u32 = 7;

/// Where an instruction's operand lives once the addressing mode is resolved.
#[derive(Clone, Copy)]
enum Target {
    Accumulator,
    Address(u16),
}

/// The CPU of the NES, a 6502 derivative without decimal mode.
///
/// The CPU is advanced one cycle at a time with [Cpu::tick]. An instruction
/// executes in full on its first tick and then credits its remaining cycle
/// count, so the next instruction starts after the correct number of idle
/// ticks. OAM-DMA is modelled as stall credit added through [Cpu::stall].
/// ```
/// use famicore::core::{Bus, Cpu, Ram};
/// use std::{cell::RefCell, rc::Rc};
/// let mut bus = Bus::new();
/// bus.attach(Rc::new(RefCell::new(Ram::new(0x10000))), 0x0000, 0x10000);
/// // Reset vector -> $8000, program: LDA #$18
/// bus.write16(0xFFFC, 0x8000);
/// bus.write8(0x8000, 0xA9);
/// bus.write8(0x8001, 0x18);
/// let mut cpu = Cpu::new();
/// cpu.power_on(&mut bus);
/// cpu.tick(&mut bus);
/// assert_eq!(cpu.a, 0x18);
/// ```
#[derive(Debug, Clone)]
pub struct Cpu {
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer, the low byte of an address in page $01
    pub s: u8,
    /// Program counter
    pub pc: u16,
    /// Status register
    pub p: StatusRegister,
    // Edge-triggered NMI latch, cleared when serviced
    nmi_pending: bool,
    // Cycle credit drained before the next instruction executes
    remaining_cycles: u32,
    // Monotonic cycle counter, used for OAM-DMA parity
    ticks: u64,
    // Set by the JAM opcodes; a jammed CPU ignores further ticks
    jammed: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Create a CPU in its pre-power-on state.
    ///
    /// Call [Cpu::power_on] with the system bus to sample the reset vector.
    pub fn new() -> Cpu {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: StatusRegister::power_on(),
            nmi_pending: false,
            remaining_cycles: 0,
            ticks: 0,
            jammed: false,
        }
    }
    /// Power on the CPU.
    ///
    /// Loads the PC from the reset vector at $FFFC/$FFFD, sets the stack
    /// pointer to $FD and the status register to its power-on value, and
    /// clears any pending interrupt and cycle credit.
    pub fn power_on(&mut self, bus: &mut Bus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.s = 0xFD;
        self.p = StatusRegister::power_on();
        self.pc = bus.read16(RESET_VECTOR);
        self.nmi_pending = false;
        self.remaining_cycles = 0;
        self.ticks = 0;
        self.jammed = false;
        info!("CPU powered on, PC = {:#06X}", self.pc);
    }
    /// Raise the NMI latch.
    ///
    /// The interrupt is serviced on the next tick that begins a new
    /// instruction.
    pub fn nmi(&mut self) {
        self.nmi_pending = true;
    }
    /// Stall the CPU for `cycles` additional cycles.
    pub fn stall(&mut self, cycles: u32) {
        self.remaining_cycles += cycles;
    }
    /// The number of cycles executed since power-on.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
    /// Cycles left before the next instruction executes.
    pub fn remaining_cycles(&self) -> u32 {
        self.remaining_cycles
    }
    /// Whether the CPU has executed a JAM opcode and halted.
    pub fn is_jammed(&self) -> bool {
        self.jammed
    }
    /// Advance the CPU by one cycle.
    ///
    /// Drains any outstanding cycle credit first. Otherwise services a
    /// latched NMI, or fetches and executes the instruction at the PC and
    /// credits its remaining cycles (base count plus any page-cross or
    /// branch penalties).
    pub fn tick(&mut self, bus: &mut Bus) {
        self.ticks += 1;
        if self.jammed {
            return;
        }
        if self.remaining_cycles > 0 {
            self.remaining_cycles -= 1;
            return;
        }
        if self.nmi_pending {
            self.nmi_pending = false;
            self.interrupt(bus, NMI_VECTOR);
            self.remaining_cycles = INTERRUPT_CYCLES - 1;
            return;
        }
        let byte = bus.read8(self.pc);
        let op = opcode(byte);
        self.execute(bus, byte, op);
        if self.jammed {
            return;
        }
        self.pc = self.pc.wrapping_add(op.length as u16);
        self.remaining_cycles += (op.cycles - 1) as u32;
    }

    // Push PC and status, set the interrupt disable flag and jump through
    // the vector. The pushed status has B clear and U set.
    fn interrupt(&mut self, bus: &mut Bus, vector: u16) {
        self.push16(bus, self.pc);
        let status = self.p.to_pushed_byte(false);
        self.push8(bus, status);
        self.p.insert(StatusRegister::INTERRUPT_DISABLE);
        self.pc = bus.read16(vector);
    }

    fn push8(&mut self, bus: &mut Bus, value: u8) {
        bus.write8(0x0100 | self.s as u16, value);
        self.s = self.s.wrapping_sub(1);
    }
    fn push16(&mut self, bus: &mut Bus, value: u16) {
        self.push8(bus, (value >> 8) as u8);
        self.push8(bus, (value & 0xFF) as u8);
    }
    fn pull8(&mut self, bus: &mut Bus) -> u8 {
        self.s = self.s.wrapping_add(1);
        bus.read8(0x0100 | self.s as u16)
    }
    fn pull16(&mut self, bus: &mut Bus) -> u16 {
        let lo = self.pull8(bus) as u16;
        let hi = self.pull8(bus) as u16;
        (hi << 8) | lo
    }

    fn operand8(&mut self, bus: &mut Bus) -> u8 {
        bus.read8(self.pc.wrapping_add(1))
    }
    fn operand16(&mut self, bus: &mut Bus) -> u16 {
        bus.read16(self.pc.wrapping_add(1))
    }

    // Add an index to a base address, charging the page-cross penalty cycle
    // when requested (read accesses only; writes always pay the fixed cost).
    fn indexed(&mut self, base: u16, index: u8, penalty: bool) -> u16 {
        let addr = base.wrapping_add(index as u16);
        if penalty && (base & 0xFF00) != (addr & 0xFF00) {
            self.remaining_cycles += 1;
        }
        addr
    }

    // Resolve an addressing mode to the operand's location.
    fn resolve(&mut self, bus: &mut Bus, mode: AddressingMode, penalty: bool) -> Target {
        use AddressingMode::*;
        let addr = match mode {
            Accumulator => return Target::Accumulator,
            Immediate => return Target::Address(self.pc.wrapping_add(1)),
            ZeroPage => self.operand8(bus) as u16,
            ZeroPageX => self.operand8(bus).wrapping_add(self.x) as u16,
            ZeroPageY => self.operand8(bus).wrapping_add(self.y) as u16,
            Absolute => self.operand16(bus),
            AbsoluteX => {
                let base = self.operand16(bus);
                self.indexed(base, self.x, penalty)
            }
            AbsoluteY => {
                let base = self.operand16(bus);
                self.indexed(base, self.y, penalty)
            }
            IndexedIndirect => {
                let ptr = self.operand8(bus).wrapping_add(self.x);
                let lo = bus.read8(ptr as u16) as u16;
                let hi = bus.read8(ptr.wrapping_add(1) as u16) as u16;
                (hi << 8) | lo
            }
            IndirectIndexed => {
                let ptr = self.operand8(bus);
                let lo = bus.read8(ptr as u16) as u16;
                let hi = bus.read8(ptr.wrapping_add(1) as u16) as u16;
                self.indexed((hi << 8) | lo, self.y, penalty)
            }
            Implied | Relative | Indirect => {
                unreachable!("no operand location for {:?}", mode)
            }
        };
        Target::Address(addr)
    }

    fn read_target(&mut self, bus: &mut Bus, target: Target) -> u8 {
        match target {
            Target::Accumulator => self.a,
            Target::Address(addr) => bus.read8(addr),
        }
    }
    fn write_target(&mut self, bus: &mut Bus, target: Target, value: u8) {
        match target {
            Target::Accumulator => self.a = value,
            Target::Address(addr) => bus.write8(addr, value),
        }
    }
    // Read the operand of a read-type instruction, charging page-cross
    // penalties.
    fn read_value(&mut self, bus: &mut Bus, mode: AddressingMode) -> u8 {
        let target = self.resolve(bus, mode, true);
        self.read_target(bus, target)
    }

    fn adc(&mut self, value: u8) {
        let result = self.a as u16 + value as u16 + self.p.contains(StatusRegister::CARRY) as u16;
        self.p.set(StatusRegister::CARRY, result > 0xFF);
        self.p.set(
            StatusRegister::OVERFLOW,
            (!(self.a ^ value) & (self.a ^ result as u8) & 0x80) != 0,
        );
        self.a = result as u8;
        self.p.set_zn(self.a);
    }
    fn sbc(&mut self, value: u8) {
        let borrow = 1 - self.p.contains(StatusRegister::CARRY) as u16;
        let result = (self.a as u16).wrapping_sub(value as u16).wrapping_sub(borrow);
        self.p.set(StatusRegister::CARRY, result <= 0xFF);
        self.p.set(
            StatusRegister::OVERFLOW,
            ((self.a ^ value) & (self.a ^ result as u8) & 0x80) != 0,
        );
        self.a = result as u8;
        self.p.set_zn(self.a);
    }
    fn compare(&mut self, register: u8, value: u8) {
        self.p.set(StatusRegister::CARRY, register >= value);
        self.p.set_zn(register.wrapping_sub(value));
    }
    fn asl(&mut self, value: u8) -> u8 {
        self.p.set(StatusRegister::CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.p.set_zn(result);
        result
    }
    fn lsr(&mut self, value: u8) -> u8 {
        self.p.set(StatusRegister::CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.p.set_zn(result);
        result
    }
    fn rol(&mut self, value: u8) -> u8 {
        let carry = self.p.contains(StatusRegister::CARRY) as u8;
        self.p.set(StatusRegister::CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry;
        self.p.set_zn(result);
        result
    }
    fn ror(&mut self, value: u8) -> u8 {
        let carry = self.p.contains(StatusRegister::CARRY) as u8;
        self.p.set(StatusRegister::CARRY, value & 0x01 != 0);
        let result = (carry << 7) | (value >> 1);
        self.p.set_zn(result);
        result
    }

    // Taken branches cost one extra cycle, two when the target is on a
    // different page than the instruction after the branch.
    fn branch(&mut self, bus: &mut Bus, condition: bool) {
        if !condition {
            return;
        }
        self.remaining_cycles += 1;
        let offset = self.operand8(bus) as i8;
        let next = self.pc.wrapping_add(2);
        let target = next.wrapping_add(offset as i16 as u16);
        if (next & 0xFF00) != (target & 0xFF00) {
            self.remaining_cycles += 1;
        }
        // The opcode length is added back after dispatch
        self.pc = target.wrapping_sub(2);
    }

    fn execute(&mut self, bus: &mut Bus, byte: u8, op: &Opcode) {
        use Mnemonic::*;
        match op.mnemonic {
            Lda => {
                self.a = self.read_value(bus, op.mode);
                self.p.set_zn(self.a);
            }
            Ldx => {
                self.x = self.read_value(bus, op.mode);
                self.p.set_zn(self.x);
            }
            Ldy => {
                self.y = self.read_value(bus, op.mode);
                self.p.set_zn(self.y);
            }
            Sta => {
                let target = self.resolve(bus, op.mode, false);
                self.write_target(bus, target, self.a);
            }
            Stx => {
                let target = self.resolve(bus, op.mode, false);
                self.write_target(bus, target, self.x);
            }
            Sty => {
                let target = self.resolve(bus, op.mode, false);
                self.write_target(bus, target, self.y);
            }
            Adc => {
                let value = self.read_value(bus, op.mode);
                self.adc(value);
            }
            Sbc => {
                let value = self.read_value(bus, op.mode);
                self.sbc(value);
            }
            Cmp => {
                let value = self.read_value(bus, op.mode);
                self.compare(self.a, value);
            }
            Cpx => {
                let value = self.read_value(bus, op.mode);
                self.compare(self.x, value);
            }
            Cpy => {
                let value = self.read_value(bus, op.mode);
                self.compare(self.y, value);
            }
            And => {
                self.a &= self.read_value(bus, op.mode);
                self.p.set_zn(self.a);
            }
            Ora => {
                self.a |= self.read_value(bus, op.mode);
                self.p.set_zn(self.a);
            }
            Eor => {
                self.a ^= self.read_value(bus, op.mode);
                self.p.set_zn(self.a);
            }
            Asl => {
                let target = self.resolve(bus, op.mode, false);
                let value = self.read_target(bus, target);
                let result = self.asl(value);
                self.write_target(bus, target, result);
            }
            Lsr => {
                let target = self.resolve(bus, op.mode, false);
                let value = self.read_target(bus, target);
                let result = self.lsr(value);
                self.write_target(bus, target, result);
            }
            Rol => {
                let target = self.resolve(bus, op.mode, false);
                let value = self.read_target(bus, target);
                let result = self.rol(value);
                self.write_target(bus, target, result);
            }
            Ror => {
                let target = self.resolve(bus, op.mode, false);
                let value = self.read_target(bus, target);
                let result = self.ror(value);
                self.write_target(bus, target, result);
            }
            Inc => {
                let target = self.resolve(bus, op.mode, false);
                let result = self.read_target(bus, target).wrapping_add(1);
                self.write_target(bus, target, result);
                self.p.set_zn(result);
            }
            Dec => {
                let target = self.resolve(bus, op.mode, false);
                let result = self.read_target(bus, target).wrapping_sub(1);
                self.write_target(bus, target, result);
                self.p.set_zn(result);
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.p.set_zn(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.p.set_zn(self.y);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.p.set_zn(self.x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.p.set_zn(self.y);
            }
            Bit => {
                let value = self.read_value(bus, op.mode);
                self.p.set(StatusRegister::ZERO, self.a & value == 0);
                self.p.set(StatusRegister::OVERFLOW, value & 0x40 != 0);
                self.p.set(StatusRegister::NEGATIVE, value & 0x80 != 0);
            }
            Bcc => self.branch(bus, !self.p.contains(StatusRegister::CARRY)),
            Bcs => self.branch(bus, self.p.contains(StatusRegister::CARRY)),
            Bne => self.branch(bus, !self.p.contains(StatusRegister::ZERO)),
            Beq => self.branch(bus, self.p.contains(StatusRegister::ZERO)),
            Bpl => self.branch(bus, !self.p.contains(StatusRegister::NEGATIVE)),
            Bmi => self.branch(bus, self.p.contains(StatusRegister::NEGATIVE)),
            Bvc => self.branch(bus, !self.p.contains(StatusRegister::OVERFLOW)),
            Bvs => self.branch(bus, self.p.contains(StatusRegister::OVERFLOW)),
            Jmp => {
                let target = if op.mode == AddressingMode::Indirect {
                    let ptr = self.operand16(bus);
                    let lo = bus.read8(ptr) as u16;
                    // The pointer's high byte never increments: $xxFF wraps
                    // to $xx00, the indirect-JMP hardware bug
                    let hi = bus.read8((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                    (hi << 8) | lo
                } else {
                    self.operand16(bus)
                };
                self.pc = target.wrapping_sub(3);
            }
            Jsr => {
                let target = self.operand16(bus);
                // The pushed return address is one below the next instruction
                self.push16(bus, self.pc.wrapping_add(2));
                self.pc = target.wrapping_sub(3);
            }
            Rts => {
                // The +1 on the pulled address is supplied by the opcode length
                self.pc = self.pull16(bus);
            }
            Rti => {
                let status = self.pull8(bus);
                self.p = StatusRegister::from_pulled_byte(status);
                self.pc = self.pull16(bus).wrapping_sub(1);
            }
            Brk => {
                self.push16(bus, self.pc.wrapping_add(2));
                let status = self.p.to_pushed_byte(true);
                self.push8(bus, status);
                self.p.insert(StatusRegister::INTERRUPT_DISABLE);
                self.pc = bus.read16(IRQ_VECTOR).wrapping_sub(1);
            }
            Pha => self.push8(bus, self.a),
            Php => {
                let status = self.p.to_pushed_byte(true);
                self.push8(bus, status);
            }
            Pla => {
                self.a = self.pull8(bus);
                self.p.set_zn(self.a);
            }
            Plp => {
                let status = self.pull8(bus);
                self.p = StatusRegister::from_pulled_byte(status);
            }
            Clc => self.p.remove(StatusRegister::CARRY),
            Sec => self.p.insert(StatusRegister::CARRY),
            Cli => self.p.remove(StatusRegister::INTERRUPT_DISABLE),
            Sei => self.p.insert(StatusRegister::INTERRUPT_DISABLE),
            Clv => self.p.remove(StatusRegister::OVERFLOW),
            Cld => self.p.remove(StatusRegister::DECIMAL),
            Sed => self.p.insert(StatusRegister::DECIMAL),
            Tax => {
                self.x = self.a;
                self.p.set_zn(self.x);
            }
            Tay => {
                self.y = self.a;
                self.p.set_zn(self.y);
            }
            Tsx => {
                self.x = self.s;
                self.p.set_zn(self.x);
            }
            Txa => {
                self.a = self.x;
                self.p.set_zn(self.a);
            }
            Tya => {
                self.a = self.y;
                self.p.set_zn(self.a);
            }
            // The only transfer that doesn't affect flags
            Txs => self.s = self.x,
            Nop => {
                // Multi-byte NOPs still consume (and dummy-read) the operand
                if op.mode != AddressingMode::Implied {
                    let _ = self.read_value(bus, op.mode);
                }
            }
            Lax => {
                let value = self.read_value(bus, op.mode);
                self.a = value;
                self.x = value;
                self.p.set_zn(value);
            }
            Sax => {
                let target = self.resolve(bus, op.mode, false);
                self.write_target(bus, target, self.a & self.x);
            }
            Dcp => {
                let target = self.resolve(bus, op.mode, false);
                let result = self.read_target(bus, target).wrapping_sub(1);
                self.write_target(bus, target, result);
                self.compare(self.a, result);
            }
            Isc => {
                let target = self.resolve(bus, op.mode, false);
                let result = self.read_target(bus, target).wrapping_add(1);
                self.write_target(bus, target, result);
                self.sbc(result);
            }
            Slo => {
                let target = self.resolve(bus, op.mode, false);
                let value = self.read_target(bus, target);
                let result = self.asl(value);
                self.write_target(bus, target, result);
                self.a |= result;
                self.p.set_zn(self.a);
            }
            Rla => {
                let target = self.resolve(bus, op.mode, false);
                let value = self.read_target(bus, target);
                let result = self.rol(value);
                self.write_target(bus, target, result);
                self.a &= result;
                self.p.set_zn(self.a);
            }
            Sre => {
                let target = self.resolve(bus, op.mode, false);
                let value = self.read_target(bus, target);
                let result = self.lsr(value);
                self.write_target(bus, target, result);
                self.a ^= result;
                self.p.set_zn(self.a);
            }
            Rra => {
                let target = self.resolve(bus, op.mode, false);
                let value = self.read_target(bus, target);
                let result = self.ror(value);
                self.write_target(bus, target, result);
                self.adc(result);
            }
            Anc => {
                self.a &= self.operand8(bus);
                self.p.set_zn(self.a);
                let negative = self.p.contains(StatusRegister::NEGATIVE);
                self.p.set(StatusRegister::CARRY, negative);
            }
            Alr => {
                self.a &= self.operand8(bus);
                self.a = self.lsr(self.a);
            }
            Arr => {
                self.a &= self.operand8(bus);
                let carry = self.p.contains(StatusRegister::CARRY) as u8;
                let result = (carry << 7) | (self.a >> 1);
                self.a = result;
                self.p.set_zn(result);
                self.p.set(StatusRegister::CARRY, result & 0x40 != 0);
                self.p
                    .set(StatusRegister::OVERFLOW, ((result >> 6) ^ (result >> 5)) & 1 != 0);
            }
            Ane => {
                // Unstable on hardware; 0xEE is the commonly observed bias
                let value = self.operand8(bus);
                self.a = (self.a | 0xEE) & self.x & value;
                self.p.set_zn(self.a);
            }
            Lxa => {
                let value = self.operand8(bus);
                let result = (self.a | 0xEE) & value;
                self.a = result;
                self.x = result;
                self.p.set_zn(result);
            }
            Sbx => {
                let value = self.operand8(bus);
                let ax = self.a & self.x;
                self.p.set(StatusRegister::CARRY, ax >= value);
                self.x = ax.wrapping_sub(value);
                self.p.set_zn(self.x);
            }
            Sha => {
                if let Target::Address(addr) = self.resolve(bus, op.mode, false) {
                    let value = self.a & self.x & ((addr >> 8) as u8).wrapping_add(1);
                    bus.write8(addr, value);
                }
            }
            Shx => {
                if let Target::Address(addr) = self.resolve(bus, op.mode, false) {
                    let value = self.x & ((addr >> 8) as u8).wrapping_add(1);
                    bus.write8(addr, value);
                }
            }
            Shy => {
                if let Target::Address(addr) = self.resolve(bus, op.mode, false) {
                    let value = self.y & ((addr >> 8) as u8).wrapping_add(1);
                    bus.write8(addr, value);
                }
            }
            Tas => {
                self.s = self.a & self.x;
                if let Target::Address(addr) = self.resolve(bus, op.mode, false) {
                    let value = self.s & ((addr >> 8) as u8).wrapping_add(1);
                    bus.write8(addr, value);
                }
            }
            Las => {
                let value = self.read_value(bus, op.mode);
                let result = value & self.s;
                self.a = result;
                self.x = result;
                self.s = result;
                self.p.set_zn(result);
            }
            Jam => {
                self.jammed = true;
                error!("CPU jammed by opcode {:#04X} at {:#06X}", byte, self.pc);
            }
        }
    }
}
