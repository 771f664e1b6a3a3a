#![allow(unused_imports)]
use core::convert::TryFrom;
use bitflags::bitflags;

macro_rules! registers {
    (
        $enum_name:ident, $slice_name:ident {
            $($name:ident = $val:expr),* $(,)?
        }
    ) => {
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum $enum_name {
            $($name = $val),*
        }

        pub const $slice_name: &[$enum_name] = &[
            $($enum_name::$name),*
        ];

        impl $enum_name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($enum_name::$name => stringify!($name),)*
                }
            }
        }

        impl Register for $enum_name {
            fn addr(self) -> u8 {
                self as u8
            }
        }

        impl NamedRegister for $enum_name {
            fn name(&self) -> &'static str {
                self.name()
            }
        }

        impl From<$enum_name> for u8 {
            fn from(r: $enum_name) -> u8 {
                r as u8
            }
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegOp {
    Read,
    Write
}

pub trait NamedRegister: Register {
    fn name(&self) -> &'static str;
}

pub trait Register: Copy {
    fn addr(self) -> u8;
}

#[derive(Clone, Copy, Debug)]
pub struct RegConfig<R: Register> {
    pub op: RegOp,
    pub reg: R,
    pub value: u8,
}

registers! {
    AccelReg, ACCEL_REGS {
        Status = 0x00,
        OutXMsb = 0x01,
        OutXLsb = 0x02,
        OutYMsb = 0x03,
        OutYLsb = 0x04,
        OutZMsb = 0x05,
        OutZLsb = 0x06,
        FSetup = 0x09,
        TrigCfg = 0x0A,
        Sysmod = 0x0B,
        IntSource = 0x0C,
        WhoAmI = 0x0D,
        XyzDataCfg = 0x0E,
        HpFilterCutoff = 0x0F,
        PlStatus = 0x10,
        PlCfg = 0x11,
        PlCount = 0x12,
        PlBfZcomp = 0x13,
        PLThsReg = 0x14,
        FfMtCfg = 0x15,
        FfMtSrc = 0x16,
        FfMtThs = 0x17,
        FfMtCount = 0x18,
        TransientCfg = 0x1D,
        TransientSrc = 0x1E,
        TransientThs = 0x1F,
        TransientCount = 0x20,
        PulseCfg = 0x21,
        PulseSrc = 0x22,
        PulseThsX = 0x23,
        PulseThsY = 0x24,
        PulseThsZ = 0x25,
        PulseTmlt = 0x26,
        PulseLtcy = 0x27,
        PulseWind = 0x28,
        AslpCount = 0x29,
        CtrlReg1 = 0x2A,
        CtrlReg2 = 0x2B,
        CtrlReg3 = 0x2C,
        CtrlReg4 = 0x2D,
        CtrlReg5 = 0x2E,
        OffX = 0x2F,
        OffY = 0x30,
        OffZ = 0x31,
    }
}

/// Length of the sample burst starting at `OutXMsb`.
pub const SAMPLE_BURST_LEN: usize = 7;

/* CTRL_REG1
 * B7     B6     B5   B4   B3   B2      B1     B0
 * ASLP1  ASLP0  DR2  DR1  DR0  LNOISE  F_READ ACTIVE
*/
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtrlReg1Flags: u8 {
        const LNOISE = 1 << 2;
        const F_READ = 1 << 1;
        const ACTIVE = 1 << 0;
    }
}

/* XYZ_DATA_CFG
 * B7   B6   B5   B4     B3   B2   B1   B0
 * 0    0    0    HPF    0    0    FS1  FS0
 *                OUT
*/
pub const ACCEL_FS_LOC: u8 = 0;
/// Full-scale range. In 2g mode the sensitivity is 1024 counts/g, 512 in 4g
/// and 256 in 8g.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccelFullScale {
    #[default]
    G2 = 0,
    G4 = 1,
    G8 = 2,
}

/// Identity reported in `WhoAmI` by the parts this driver claims.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipVariant {
    Mma8451 = 0x1A,
    Mma8452 = 0x2A,
    Mma8453 = 0x3A,
    Mma8652 = 0x4A,
    Mma8653 = 0x5A,
}

pub const CHIP_VARIANTS: &[ChipVariant] = &[
    ChipVariant::Mma8451,
    ChipVariant::Mma8452,
    ChipVariant::Mma8453,
    ChipVariant::Mma8652,
    ChipVariant::Mma8653,
];

impl ChipVariant {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            ChipVariant::Mma8451 => "mma8451",
            ChipVariant::Mma8452 => "mma8452",
            ChipVariant::Mma8453 => "mma8453",
            ChipVariant::Mma8652 => "mma8652",
            ChipVariant::Mma8653 => "mma8653",
        }
    }
}

impl TryFrom<u8> for ChipVariant {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        CHIP_VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.id() == id)
            .ok_or(id)
    }
}
