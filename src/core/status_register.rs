use bitflags::bitflags;

bitflags! {
    /// The status register of the CPU.
    ///
    /// Stored as a single byte; the named flags double as bit masks, so the
    /// register can be pushed/pulled through the stack as-is.
    /// Bit 5 ([StatusRegister::UNUSED]) reads back as 1, bit 4
    /// ([StatusRegister::BREAK]) only ever appears in pushed copies.
    /// ```
    /// use famicore::core::StatusRegister;
    /// let mut p = StatusRegister::power_on();
    /// assert_eq!(p.bits(), 0x24);
    /// p.insert(StatusRegister::CARRY);
    /// assert_eq!(p.bits(), 0x25);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusRegister: u8 {
        /// The carry flag, also known as the unsigned overflow flag
        const CARRY = 0x01;
        /// The zero flag
        const ZERO = 0x02;
        /// The interrupt disable flag
        const INTERRUPT_DISABLE = 0x04;
        /// The decimal mode flag (no effect on this CPU revision)
        const DECIMAL = 0x08;
        /// The break command flag, set in copies pushed by BRK/PHP
        const BREAK = 0x10;
        /// Unused, always 1 when read back
        const UNUSED = 0x20;
        /// The (signed) overflow flag
        const OVERFLOW = 0x40;
        /// The negative flag
        const NEGATIVE = 0x80;
    }
}

impl StatusRegister {
    /// The power-on value: interrupt disable and the unused bit.
    pub fn power_on() -> StatusRegister {
        StatusRegister::INTERRUPT_DISABLE | StatusRegister::UNUSED
    }
    /// The byte pushed on the stack.
    ///
    /// BRK and PHP push with the break flag set, IRQ and NMI with it clear.
    /// The unused bit is always set in pushed copies.
    pub fn to_pushed_byte(self, break_flag: bool) -> u8 {
        let mut copy = self | StatusRegister::UNUSED;
        copy.set(StatusRegister::BREAK, break_flag);
        copy.bits()
    }
    /// Rebuild the register from a byte pulled off the stack.
    ///
    /// The break bit is discarded and the unused bit forced to 1.
    pub fn from_pulled_byte(byte: u8) -> StatusRegister {
        let mut p = StatusRegister::from_bits_retain(byte);
        p.remove(StatusRegister::BREAK);
        p.insert(StatusRegister::UNUSED);
        p
    }
    /// Set the zero and negative flags from a result byte.
    pub fn set_zn(&mut self, value: u8) {
        self.set(StatusRegister::ZERO, value == 0);
        self.set(StatusRegister::NEGATIVE, value & 0x80 != 0);
    }
}
