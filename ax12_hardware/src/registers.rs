//! Control-table addresses of the servo EEPROM/RAM registers this driver
//! touches. Two-byte registers are little-endian starting at the given
//! address.

/// Answer delay, EEPROM, in units of 2 µs.
pub const RETURN_DELAY: u8 = 0x05;
/// Counter-clockwise angle limit (two bytes). Zero puts the servo in wheel
/// mode; 0x3FF restores the full positional range.
pub const CCW_ANGLE_LIMIT: u8 = 0x08;
/// Torque ceiling (two bytes), 0..=0x3FF.
pub const MAX_TORQUE: u8 = 0x0E;
/// Which instructions get a status answer: 0 none, 1 reads only, 2 all.
pub const STATUS_RETURN_LEVEL: u8 = 0x10;
/// Error bits that blink the LED.
pub const ALARM_LED: u8 = 0x11;
/// Error bits that cut torque.
pub const ALARM_SHUTDOWN: u8 = 0x12;
pub const TORQUE_ENABLE: u8 = 0x18;
pub const LED: u8 = 0x19;
/// Goal position (two bytes), 0..=0x3FF over the 300° range.
pub const GOAL_POSITION: u8 = 0x1E;
/// Moving speed (two bytes); bit 10 carries the direction in wheel mode.
pub const MOVING_SPEED: u8 = 0x20;
pub const PRESENT_POSITION: u8 = 0x24;
pub const PRESENT_SPEED: u8 = 0x26;
pub const PRESENT_LOAD: u8 = 0x28;
/// Supply voltage in tenths of a volt.
pub const PRESENT_VOLTAGE: u8 = 0x2A;
/// Temperature in °C, direct reading.
pub const PRESENT_TEMPERATURE: u8 = 0x2B;
/// 1 while the servo moves under its own power.
pub const MOVING: u8 = 0x2E;
