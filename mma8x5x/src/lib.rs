#![cfg_attr(not(test), no_std)]

pub mod registers;
pub mod configs;
pub mod types;
pub mod orientation;
pub mod power;
pub mod sink;
pub mod device;
pub mod attributes;
pub mod shared;
pub mod console;

use core::fmt::{Debug, Formatter};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, info};

use registers::*;

pub use configs::*;
pub use types::*;
pub use orientation::transform;
pub use power::{GpioSwitch, PowerError, PowerRails, Regulator, RegulatorOp};
pub use sink::SampleSink;
pub use device::{Accelerometer, PowerManaged};
pub use attributes::Attribute;
pub use shared::SharedAccelerometer;
pub use registers::{AccelFullScale, ChipVariant};

/// Trait alias to support both I2c<SevenBitAddress> and I2c without address mode.
pub trait CompatibleI2c<E>: I2c<Error = E> {}
impl<T, E> CompatibleI2c<E> for T where T: I2c<Error = E> {}

struct TypedDebugWrapper<'a, T: ?Sized>(&'a T);

impl<T: Debug> Debug for TypedDebugWrapper<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}::{:?}", core::any::type_name::<T>(), self.0)
    }
}

trait TypedDebug: Debug {
    fn typed_debug(&self) -> TypedDebugWrapper<'_, Self> {
        TypedDebugWrapper(self)
    }
}

impl<T: ?Sized + Debug> TypedDebug for T {}

#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    I2c(E),
    /// `WhoAmI` returned an ID this driver does not handle.
    InvalidDevice(u8),
    Power(PowerError),
    /// Attribute write that is not a decimal integer.
    InvalidInput,
    /// Rails are off; the request needs a resume first.
    Suspended,
}

impl<E> From<PowerError> for Error<E> {
    fn from(err: PowerError) -> Self {
        Error::Power(err)
    }
}

/// Register-level access to an MMA8x5x part.
pub struct Mma8x5x<I2C, E> {
    i2c: I2C,
    address: u8,
    _error: core::marker::PhantomData<E>,
}

impl<I2C, E> Mma8x5x<I2C, E> {
    pub fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    pub fn address(&self) -> u8 {
        self.address
    }
}

impl<I2C, E> Mma8x5x<I2C, E>
where
    I2C: CompatibleI2c<E>,
    E: core::fmt::Debug,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            _error: core::marker::PhantomData,
        }
    }

    pub fn default(i2c: I2C) -> Self {
        Self::new(i2c, DEFAULT_ADDRESS)
    }

    pub fn destroy(self) -> I2C {
        self.i2c
    }

    pub fn who_am_i(&mut self) -> Result<u8, Error<E>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.address, &[AccelReg::WhoAmI as u8], &mut buf)
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    /// Check the chip ID without touching any other register.
    pub fn detect(&mut self) -> Result<ChipVariant, Error<E>> {
        let id = self.who_am_i()?;
        let chip = ChipVariant::try_from(id).map_err(Error::InvalidDevice)?;
        debug!("detected {} at i2c address {:#04x}", chip.name(), self.address);
        Ok(chip)
    }

    /// Standby, program the full-scale range and let the mode change settle.
    pub fn init<D: DelayNs>(
        &mut self,
        full_scale: AccelFullScale,
        delay: &mut D,
    ) -> Result<(), Error<E>> {
        self.apply_config(&config_standby_init(full_scale))?;
        delay.delay_ms(MODE_CHANGE_DELAY_MS);
        info!("initialized, full scale {:?}", full_scale.typed_debug());
        Ok(())
    }

    pub fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    pub fn write_reg(&mut self, reg: u8, val: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[reg, val])
            .map_err(Error::I2c)?;
        Ok(())
    }

    pub fn read_bytes(&mut self, start_reg: u8, buffer: &mut [u8]) -> Result<(), Error<E>> {
        self.i2c
            .write_read(self.address, &[start_reg], buffer)
            .map_err(Error::I2c)
    }

    /// One burst from `OutXMsb`. A short transfer is reported by the bus as
    /// an error, never as a partial sample.
    pub fn read_raw(&mut self) -> Result<RawSample, Error<E>> {
        let mut buf = [0u8; SAMPLE_BURST_LEN];
        self.read_bytes(AccelReg::OutXMsb as u8, &mut buf)?;
        Ok(RawSample::from_burst(&buf))
    }

    /// Read-modify-write of the ACTIVE bit in `CtrlReg1`.
    pub fn set_active(&mut self, active: bool) -> Result<(), Error<E>> {
        let ctrl1 = CtrlReg1Flags::from_bits_retain(self.read_reg(AccelReg::CtrlReg1 as u8)?);
        let ctrl1 = if active {
            ctrl1 | CtrlReg1Flags::ACTIVE
        } else {
            ctrl1 - CtrlReg1Flags::ACTIVE
        };
        self.write_reg(AccelReg::CtrlReg1 as u8, ctrl1.bits())
    }

    pub fn is_active(&mut self) -> Result<bool, Error<E>> {
        let ctrl1 = self.read_reg(AccelReg::CtrlReg1 as u8)?;
        Ok(CtrlReg1Flags::from_bits_retain(ctrl1).contains(CtrlReg1Flags::ACTIVE))
    }

    /// Accepts any register type that implements the `Register` trait
    pub fn apply_config<R>(&mut self, config: &[RegConfig<R>]) -> Result<(), Error<E>>
    where
        R: Register + NamedRegister + Copy,
    {
        for entry in config {
            let addr = entry.reg.addr();
            match entry.op {
                RegOp::Write => {
                    debug!(
                        "write_reg {:<21}({:#04X}) = {:#04x}",
                        entry.reg.name(),
                        addr,
                        entry.value
                    );
                    self.write_reg(addr, entry.value)?
                }
                RegOp::Read => {
                    let data = self.read_reg(addr)?;
                    debug!("read_reg {:<21}({:#04X}) = {:#04x}", entry.reg.name(), addr, data);
                }
            }
        }
        Ok(())
    }

    pub fn dump_config<R>(&mut self, regs: &[R]) -> Result<(), Error<E>>
    where
        R: NamedRegister + Copy,
    {
        fn show(label: &str, reg: u8, val: Result<u8, impl core::fmt::Debug>) {
            match val {
                Ok(v) => debug!("{:<21}({:#04x}): 0x{:02X} ({:>3}) 0b{:08b}", label, reg, v, v, v),
                Err(e) => debug!("{:<16}: Error: {:?}", label, e),
            }
        }

        for reg in regs {
            let label = reg.name();
            let addr = reg.addr();
            show(label, addr, self.read_reg(addr));
        }

        Ok(())
    }
}
