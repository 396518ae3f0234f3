//! The CPU's 256-entry opcode table.
//!
//! Each entry carries the mnemonic, the instruction length in bytes, the base
//! cycle count and the addressing mode. Page-cross and branch penalty cycles
//! are added by the CPU at execution time. Undocumented opcodes are included,
//! since real software depends on them; the twelve JAM opcodes halt the CPU.

/// The thirteen addressing modes of the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
}

/// Every operation the CPU can perform, documented and undocumented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Undocumented
    Alr, Anc, Ane, Arr, Dcp, Isc, Jam, Las, Lax, Lxa, Rla, Rra, Sax, Sbx,
    Sha, Shx, Shy, Slo, Sre, Tas,
}

impl Mnemonic {
    /// The conventional three-letter assembly name, for diagnostics.
    pub fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA", Alr => "ALR", Anc => "ANC", Ane => "ANE", Arr => "ARR",
            Dcp => "DCP", Isc => "ISC", Jam => "JAM", Las => "LAS", Lax => "LAX",
            Lxa => "LXA", Rla => "RLA", Rra => "RRA", Sax => "SAX", Sbx => "SBX",
            Sha => "SHA", Shx => "SHX", Shy => "SHY", Slo => "SLO", Sre => "SRE",
            Tas => "TAS",
        }
    }
}

/// One entry of the opcode table.
#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    /// Instruction length in bytes (1, 2 or 3)
    pub length: u8,
    /// Base cycle count, before page-cross and branch penalties
    pub cycles: u8,
    pub mode: AddressingMode,
}

/// Look up an opcode by its encoding.
/// ```
/// use famicore::core::opcodes::{opcode, Mnemonic};
/// assert_eq!(opcode(0xA9).mnemonic, Mnemonic::Lda);
/// assert_eq!(opcode(0xA9).cycles, 2);
/// ```
pub fn opcode(byte: u8) -> &'static Opcode {
    &OPCODES[byte as usize]
}

macro_rules! op {
    ($mnemonic: ident, $length: literal, $cycles: literal, $mode: ident) => {
        Opcode {
            mnemonic: Mnemonic::$mnemonic,
            length: $length,
            cycles: $cycles,
            mode: AddressingMode::$mode,
        }
    };
}

/// The full opcode table, indexed by opcode number.
#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    // 0x00
    op!(Brk, 1, 7, Implied),         op!(Ora, 2, 6, IndexedIndirect),
    op!(Jam, 1, 2, Implied),         op!(Slo, 2, 8, IndexedIndirect),
    op!(Nop, 2, 3, ZeroPage),        op!(Ora, 2, 3, ZeroPage),
    op!(Asl, 2, 5, ZeroPage),        op!(Slo, 2, 5, ZeroPage),
    op!(Php, 1, 3, Implied),         op!(Ora, 2, 2, Immediate),
    op!(Asl, 1, 2, Accumulator),     op!(Anc, 2, 2, Immediate),
    op!(Nop, 3, 4, Absolute),        op!(Ora, 3, 4, Absolute),
    op!(Asl, 3, 6, Absolute),        op!(Slo, 3, 6, Absolute),
    // 0x10
    op!(Bpl, 2, 2, Relative),        op!(Ora, 2, 5, IndirectIndexed),
    op!(Jam, 1, 2, Implied),         op!(Slo, 2, 8, IndirectIndexed),
    op!(Nop, 2, 4, ZeroPageX),       op!(Ora, 2, 4, ZeroPageX),
    op!(Asl, 2, 6, ZeroPageX),       op!(Slo, 2, 6, ZeroPageX),
    op!(Clc, 1, 2, Implied),         op!(Ora, 3, 4, AbsoluteY),
    op!(Nop, 1, 2, Implied),         op!(Slo, 3, 7, AbsoluteY),
    op!(Nop, 3, 4, AbsoluteX),       op!(Ora, 3, 4, AbsoluteX),
    op!(Asl, 3, 7, AbsoluteX),       op!(Slo, 3, 7, AbsoluteX),
    // 0x20
    op!(Jsr, 3, 6, Absolute),        op!(And, 2, 6, IndexedIndirect),
    op!(Jam, 1, 2, Implied),         op!(Rla, 2, 8, IndexedIndirect),
    op!(Bit, 2, 3, ZeroPage),        op!(And, 2, 3, ZeroPage),
    op!(Rol, 2, 5, ZeroPage),        op!(Rla, 2, 5, ZeroPage),
    op!(Plp, 1, 4, Implied),         op!(And, 2, 2, Immediate),
    op!(Rol, 1, 2, Accumulator),     op!(Anc, 2, 2, Immediate),
    op!(Bit, 3, 4, Absolute),        op!(And, 3, 4, Absolute),
    op!(Rol, 3, 6, Absolute),        op!(Rla, 3, 6, Absolute),
    // 0x30
    op!(Bmi, 2, 2, Relative),        op!(And, 2, 5, IndirectIndexed),
    op!(Jam, 1, 2, Implied),         op!(Rla, 2, 8, IndirectIndexed),
    op!(Nop, 2, 4, ZeroPageX),       op!(And, 2, 4, ZeroPageX),
    op!(Rol, 2, 6, ZeroPageX),       op!(Rla, 2, 6, ZeroPageX),
    op!(Sec, 1, 2, Implied),         op!(And, 3, 4, AbsoluteY),
    op!(Nop, 1, 2, Implied),         op!(Rla, 3, 7, AbsoluteY),
    op!(Nop, 3, 4, AbsoluteX),       op!(And, 3, 4, AbsoluteX),
    op!(Rol, 3, 7, AbsoluteX),       op!(Rla, 3, 7, AbsoluteX),
    // 0x40
    op!(Rti, 1, 6, Implied),         op!(Eor, 2, 6, IndexedIndirect),
    op!(Jam, 1, 2, Implied),         op!(Sre, 2, 8, IndexedIndirect),
    op!(Nop, 2, 3, ZeroPage),        op!(Eor, 2, 3, ZeroPage),
    op!(Lsr, 2, 5, ZeroPage),        op!(Sre, 2, 5, ZeroPage),
    op!(Pha, 1, 3, Implied),         op!(Eor, 2, 2, Immediate),
    op!(Lsr, 1, 2, Accumulator),     op!(Alr, 2, 2, Immediate),
    op!(Jmp, 3, 3, Absolute),        op!(Eor, 3, 4, Absolute),
    op!(Lsr, 3, 6, Absolute),        op!(Sre, 3, 6, Absolute),
    // 0x50
    op!(Bvc, 2, 2, Relative),        op!(Eor, 2, 5, IndirectIndexed),
    op!(Jam, 1, 2, Implied),         op!(Sre, 2, 8, IndirectIndexed),
    op!(Nop, 2, 4, ZeroPageX),       op!(Eor, 2, 4, ZeroPageX),
    op!(Lsr, 2, 6, ZeroPageX),       op!(Sre, 2, 6, ZeroPageX),
    op!(Cli, 1, 2, Implied),         op!(Eor, 3, 4, AbsoluteY),
    op!(Nop, 1, 2, Implied),         op!(Sre, 3, 7, AbsoluteY),
    op!(Nop, 3, 4, AbsoluteX),       op!(Eor, 3, 4, AbsoluteX),
    op!(Lsr, 3, 7, AbsoluteX),       op!(Sre, 3, 7, AbsoluteX),
    // 0x60
    op!(Rts, 1, 6, Implied),         op!(Adc, 2, 6, IndexedIndirect),
    op!(Jam, 1, 2, Implied),         op!(Rra, 2, 8, IndexedIndirect),
    op!(Nop, 2, 3, ZeroPage),        op!(Adc, 2, 3, ZeroPage),
    op!(Ror, 2, 5, ZeroPage),        op!(Rra, 2, 5, ZeroPage),
    op!(Pla, 1, 4, Implied),         op!(Adc, 2, 2, Immediate),
    op!(Ror, 1, 2, Accumulator),     op!(Arr, 2, 2, Immediate),
    op!(Jmp, 3, 5, Indirect),        op!(Adc, 3, 4, Absolute),
    op!(Ror, 3, 6, Absolute),        op!(Rra, 3, 6, Absolute),
    // 0x70
    op!(Bvs, 2, 2, Relative),        op!(Adc, 2, 5, IndirectIndexed),
    op!(Jam, 1, 2, Implied),         op!(Rra, 2, 8, IndirectIndexed),
    op!(Nop, 2, 4, ZeroPageX),       op!(Adc, 2, 4, ZeroPageX),
    op!(Ror, 2, 6, ZeroPageX),       op!(Rra, 2, 6, ZeroPageX),
    op!(Sei, 1, 2, Implied),         op!(Adc, 3, 4, AbsoluteY),
    op!(Nop, 1, 2, Implied),         op!(Rra, 3, 7, AbsoluteY),
    op!(Nop, 3, 4, AbsoluteX),       op!(Adc, 3, 4, AbsoluteX),
    op!(Ror, 3, 7, AbsoluteX),       op!(Rra, 3, 7, AbsoluteX),
    // 0x80
    op!(Nop, 2, 2, Immediate),       op!(Sta, 2, 6, IndexedIndirect),
    op!(Nop, 2, 2, Immediate),       op!(Sax, 2, 6, IndexedIndirect),
    op!(Sty, 2, 3, ZeroPage),        op!(Sta, 2, 3, ZeroPage),
    op!(Stx, 2, 3, ZeroPage),        op!(Sax, 2, 3, ZeroPage),
    op!(Dey, 1, 2, Implied),         op!(Nop, 2, 2, Immediate),
    op!(Txa, 1, 2, Implied),         op!(Ane, 2, 2, Immediate),
    op!(Sty, 3, 4, Absolute),        op!(Sta, 3, 4, Absolute),
    op!(Stx, 3, 4, Absolute),        op!(Sax, 3, 4, Absolute),
    // 0x90
    op!(Bcc, 2, 2, Relative),        op!(Sta, 2, 6, IndirectIndexed),
    op!(Jam, 1, 2, Implied),         op!(Sha, 2, 6, IndirectIndexed),
    op!(Sty, 2, 4, ZeroPageX),       op!(Sta, 2, 4, ZeroPageX),
    op!(Stx, 2, 4, ZeroPageY),       op!(Sax, 2, 4, ZeroPageY),
    op!(Tya, 1, 2, Implied),         op!(Sta, 3, 5, AbsoluteY),
    op!(Txs, 1, 2, Implied),         op!(Tas, 3, 5, AbsoluteY),
    op!(Shy, 3, 5, AbsoluteX),       op!(Sta, 3, 5, AbsoluteX),
    op!(Shx, 3, 5, AbsoluteY),       op!(Sha, 3, 5, AbsoluteY),
    // 0xA0
    op!(Ldy, 2, 2, Immediate),       op!(Lda, 2, 6, IndexedIndirect),
    op!(Ldx, 2, 2, Immediate),       op!(Lax, 2, 6, IndexedIndirect),
    op!(Ldy, 2, 3, ZeroPage),        op!(Lda, 2, 3, ZeroPage),
    op!(Ldx, 2, 3, ZeroPage),        op!(Lax, 2, 3, ZeroPage),
    op!(Tay, 1, 2, Implied),         op!(Lda, 2, 2, Immediate),
    op!(Tax, 1, 2, Implied),         op!(Lxa, 2, 2, Immediate),
    op!(Ldy, 3, 4, Absolute),        op!(Lda, 3, 4, Absolute),
    op!(Ldx, 3, 4, Absolute),        op!(Lax, 3, 4, Absolute),
    // 0xB0
    op!(Bcs, 2, 2, Relative),        op!(Lda, 2, 5, IndirectIndexed),
    op!(Jam, 1, 2, Implied),         op!(Lax, 2, 5, IndirectIndexed),
    op!(Ldy, 2, 4, ZeroPageX),       op!(Lda, 2, 4, ZeroPageX),
    op!(Ldx, 2, 4, ZeroPageY),       op!(Lax, 2, 4, ZeroPageY),
    op!(Clv, 1, 2, Implied),         op!(Lda, 3, 4, AbsoluteY),
    op!(Tsx, 1, 2, Implied),         op!(Las, 3, 4, AbsoluteY),
    op!(Ldy, 3, 4, AbsoluteX),       op!(Lda, 3, 4, AbsoluteX),
    op!(Ldx, 3, 4, AbsoluteY),       op!(Lax, 3, 4, AbsoluteY),
    // 0xC0
    op!(Cpy, 2, 2, Immediate),       op!(Cmp, 2, 6, IndexedIndirect),
    op!(Nop, 2, 2, Immediate),       op!(Dcp, 2, 8, IndexedIndirect),
    op!(Cpy, 2, 3, ZeroPage),        op!(Cmp, 2, 3, ZeroPage),
    op!(Dec, 2, 5, ZeroPage),        op!(Dcp, 2, 5, ZeroPage),
    op!(Iny, 1, 2, Implied),         op!(Cmp, 2, 2, Immediate),
    op!(Dex, 1, 2, Implied),         op!(Sbx, 2, 2, Immediate),
    op!(Cpy, 3, 4, Absolute),        op!(Cmp, 3, 4, Absolute),
    op!(Dec, 3, 6, Absolute),        op!(Dcp, 3, 6, Absolute),
    // 0xD0
    op!(Bne, 2, 2, Relative),        op!(Cmp, 2, 5, IndirectIndexed),
    op!(Jam, 1, 2, Implied),         op!(Dcp, 2, 8, IndirectIndexed),
    op!(Nop, 2, 4, ZeroPageX),       op!(Cmp, 2, 4, ZeroPageX),
    op!(Dec, 2, 6, ZeroPageX),       op!(Dcp, 2, 6, ZeroPageX),
    op!(Cld, 1, 2, Implied),         op!(Cmp, 3, 4, AbsoluteY),
    op!(Nop, 1, 2, Implied),         op!(Dcp, 3, 7, AbsoluteY),
    op!(Nop, 3, 4, AbsoluteX),       op!(Cmp, 3, 4, AbsoluteX),
    op!(Dec, 3, 7, AbsoluteX),       op!(Dcp, 3, 7, AbsoluteX),
    // 0xE0
    op!(Cpx, 2, 2, Immediate),       op!(Sbc, 2, 6, IndexedIndirect),
    op!(Nop, 2, 2, Immediate),       op!(Isc, 2, 8, IndexedIndirect),
    op!(Cpx, 2, 3, ZeroPage),        op!(Sbc, 2, 3, ZeroPage),
    op!(Inc, 2, 5, ZeroPage),        op!(Isc, 2, 5, ZeroPage),
    op!(Inx, 1, 2, Implied),         op!(Sbc, 2, 2, Immediate),
    op!(Nop, 1, 2, Implied),         op!(Sbc, 2, 2, Immediate),
    op!(Cpx, 3, 4, Absolute),        op!(Sbc, 3, 4, Absolute),
    op!(Inc, 3, 6, Absolute),        op!(Isc, 3, 6, Absolute),
    // 0xF0
    op!(Beq, 2, 2, Relative),        op!(Sbc, 2, 5, IndirectIndexed),
    op!(Jam, 1, 2, Implied),         op!(Isc, 2, 8, IndirectIndexed),
    op!(Nop, 2, 4, ZeroPageX),       op!(Sbc, 2, 4, ZeroPageX),
    op!(Inc, 2, 6, ZeroPageX),       op!(Isc, 2, 6, ZeroPageX),
    op!(Sed, 1, 2, Implied),         op!(Sbc, 3, 4, AbsoluteY),
    op!(Nop, 1, 2, Implied),         op!(Isc, 3, 7, AbsoluteY),
    op!(Nop, 3, 4, AbsoluteX),       op!(Sbc, 3, 4, AbsoluteX),
    op!(Inc, 3, 7, AbsoluteX),       op!(Isc, 3, 7, AbsoluteX),
];
