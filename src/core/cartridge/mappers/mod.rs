//! Implementations of the cartridge mappers the console supports.
//! See [Mapper][super::Mapper].
mod nrom;
pub use nrom::NRom;
mod sxrom;
pub use sxrom::SxRom;
