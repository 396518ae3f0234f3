//! A cycle-accurate emulation library for the Nintendo Entertainment System.
//!
//! The console is modelled as a master clock driving a 6502-derived CPU
//! (master / 12) and a picture processing unit (master / 4), connected by
//! page-routed address buses that cartridge mappers reshape at run time.
//! See [core] for the emulation itself.
pub mod core;
