use tokio_modbus::Address;

// Wire addresses, one below the register numbers in the MidNite documentation.
pub const MAIN_BLOCK: Address = 4100;
pub const MODE_BLOCK: Address = 4163;
pub const NAME_BLOCK: Address = 4209;
pub const TIME_BLOCK: Address = 4213;
pub const SETTING_BLOCK: Address = 4243;
pub const WHIZBANG_BLOCK: Address = 4360;
pub const VERSION_BLOCK: Address = 16386;

pub const DEFAULT_UNIT_ID: u8 = 10;
