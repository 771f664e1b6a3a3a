use crate::registers::*;

/// Mounting position used when the board does not provide one.
pub const DEFAULT_POSITION: i32 = 0;

/// SA0 pulled low.
pub const DEFAULT_ADDRESS: u8 = 0x1C;
/// SA0 pulled high.
pub const ALT_ADDRESS: u8 = 0x1D;
/// Addresses tried, in order, when the board does not pin one down.
pub const PROBE_ADDRESSES: &[u8] = &[DEFAULT_ADDRESS, ALT_ADDRESS];

pub const INPUT_DEVICE_NAME: &str = "accelerometer";

pub const POLL_INTERVAL_MS: u32 = 100;
/// Slow cadence used while the sensor sits in standby.
pub const POLL_STOP_TIME_MS: u32 = 200;
pub const POLL_INTERVAL_MIN_MS: u32 = 1;
pub const POLL_INTERVAL_MAX_MS: u32 = 500;

pub const MODE_CHANGE_DELAY_MS: u32 = 100;
/// Boot time after power-up is 1.55 ms.
pub const RESUME_SETTLE_US: u32 = 1_600;

/// Board-level settings, fixed once the device is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub position: i32,
    pub full_scale: AccelFullScale,
    pub int_pin: Option<u32>,
    pub int_flags: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            full_scale: AccelFullScale::G2,
            int_pin: None,
            int_flags: 0,
        }
    }
}

impl Config {
    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    pub fn with_full_scale(mut self, full_scale: AccelFullScale) -> Self {
        self.full_scale = full_scale;
        self
    }

    pub fn with_irq(mut self, pin: u32, flags: u32) -> Self {
        self.int_pin = Some(pin);
        self.int_flags = flags;
        self
    }
}

/// Put the part in standby and program the full-scale range.
pub fn config_standby_init(full_scale: AccelFullScale) -> [RegConfig<AccelReg>; 2] {
    [
        RegConfig {
            op: RegOp::Write,
            reg: AccelReg::CtrlReg1,
            value: 0x00, // Standby, all rate bits cleared
        },
        RegConfig {
            op: RegOp::Write,
            reg: AccelReg::XyzDataCfg,
            value: (full_scale as u8) << ACCEL_FS_LOC,
        },
    ]
}

pub const CONFIG_READ_IDENTITY: &[RegConfig<AccelReg>] = &[
    RegConfig {
        op: RegOp::Read,
        reg: AccelReg::WhoAmI,
        value: 0x00,
    },
    RegConfig {
        op: RegOp::Read,
        reg: AccelReg::Sysmod,
        value: 0x00,
    },
];
