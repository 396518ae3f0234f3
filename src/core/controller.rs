/// The state of one NES controller, one field per button.
///
/// Hosts sample their input layer into this snapshot and hand it to the
/// console with [crate::core::Nes::set_controller_state].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controller {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Controller {
    /// Create a controller with no buttons pressed.
    pub fn new() -> Controller {
        Controller::default()
    }
    /// The shift-register wire format: A in bit 7 down to Right in bit 0.
    pub fn to_byte(self) -> u8 {
        ((self.a as u8) << 7)
            | ((self.b as u8) << 6)
            | ((self.select as u8) << 5)
            | ((self.start as u8) << 4)
            | ((self.up as u8) << 3)
            | ((self.down as u8) << 2)
            | ((self.left as u8) << 1)
            | (self.right as u8)
    }
}
