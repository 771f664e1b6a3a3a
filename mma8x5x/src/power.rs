//! Supply rails owned by one sensor instance.
//!
//! Rails are switched on in declaration order and off in reverse. A rail that
//! fails to come up leaves every earlier rail switched back off, so a failed
//! power-up never leaves the part half powered.

use core::fmt::Debug;
use embedded_hal::digital::OutputPin;
use log::{debug, error};

/// Voltage requirements of a single supply pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupplySpec {
    pub name: &'static str,
    pub min_uv: u32,
    pub max_uv: u32,
}

pub const VDD_SUPPLY: SupplySpec = SupplySpec {
    name: "vdd",
    min_uv: 2_850_000,
    max_uv: 2_850_000,
};

pub const VIO_SUPPLY: SupplySpec = SupplySpec {
    name: "vio",
    min_uv: 1_800_000,
    max_uv: 1_800_000,
};

pub const SUPPLY_COUNT: usize = 2;

/// A switchable supply, e.g. a PMIC LDO or a GPIO load switch.
pub trait Regulator {
    type Error: Debug;

    /// Number of selectable voltages. Fixed rails report 0 and are never
    /// asked to change voltage.
    fn count_voltages(&self) -> usize;
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<(), Self::Error>;
    fn enable(&mut self) -> Result<(), Self::Error>;
    fn disable(&mut self) -> Result<(), Self::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegulatorOp {
    SetVoltage,
    Enable,
    Disable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerError {
    pub supply: &'static str,
    pub op: RegulatorOp,
}

struct Supply<R> {
    regulator: R,
    spec: SupplySpec,
    enabled: bool,
}

impl<R: Regulator> Supply<R> {
    fn new(regulator: R, spec: SupplySpec) -> Self {
        Self {
            regulator,
            spec,
            enabled: false,
        }
    }

    fn fail(&self, op: RegulatorOp, err: R::Error) -> PowerError {
        error!("{} regulator {:?} failed: {:?}", self.spec.name, op, err);
        PowerError {
            supply: self.spec.name,
            op,
        }
    }

    fn power_on(&mut self) -> Result<(), PowerError> {
        let selectable = self.regulator.count_voltages() > 0;
        if selectable {
            self.regulator
                .set_voltage(self.spec.min_uv, self.spec.max_uv)
                .map_err(|e| self.fail(RegulatorOp::SetVoltage, e))?;
        }
        if let Err(e) = self.regulator.enable() {
            if selectable {
                let _ = self.regulator.set_voltage(0, self.spec.max_uv);
            }
            return Err(self.fail(RegulatorOp::Enable, e));
        }
        self.enabled = true;
        debug!("{} regulator on", self.spec.name);
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), PowerError> {
        if !self.enabled {
            return Ok(());
        }
        if self.regulator.count_voltages() > 0 {
            let _ = self.regulator.set_voltage(0, self.spec.max_uv);
        }
        self.regulator
            .disable()
            .map_err(|e| self.fail(RegulatorOp::Disable, e))?;
        self.enabled = false;
        debug!("{} regulator off", self.spec.name);
        Ok(())
    }
}

/// The sensor's `vdd` and `vio` rails.
pub struct PowerRails<R> {
    supplies: [Supply<R>; SUPPLY_COUNT],
}

impl<R: Regulator> PowerRails<R> {
    pub fn new(vdd: R, vio: R) -> Self {
        Self {
            supplies: [Supply::new(vdd, VDD_SUPPLY), Supply::new(vio, VIO_SUPPLY)],
        }
    }

    pub fn is_on(&self) -> bool {
        self.supplies.iter().all(|s| s.enabled)
    }

    pub fn power_on(&mut self) -> Result<(), PowerError> {
        for i in 0..SUPPLY_COUNT {
            if self.supplies[i].enabled {
                continue;
            }
            if let Err(e) = self.supplies[i].power_on() {
                for supply in self.supplies[..i].iter_mut().rev() {
                    let _ = supply.power_off();
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Every enabled rail is attempted; the first failure is reported.
    pub fn power_off(&mut self) -> Result<(), PowerError> {
        let mut result = Ok(());
        for supply in self.supplies.iter_mut().rev() {
            if let Err(e) = supply.power_off() {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    pub fn release(self) -> (R, R) {
        let [vdd, vio] = self.supplies;
        (vdd.regulator, vio.regulator)
    }
}

/// Fixed rail behind a GPIO-controlled load switch.
pub struct GpioSwitch<P> {
    pin: P,
    active_low: bool,
}

impl<P: OutputPin> GpioSwitch<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    pub fn destroy(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> Regulator for GpioSwitch<P> {
    type Error = P::Error;

    fn count_voltages(&self) -> usize {
        0
    }

    fn set_voltage(&mut self, _min_uv: u32, _max_uv: u32) -> Result<(), Self::Error> {
        Ok(())
    }

    fn enable(&mut self) -> Result<(), Self::Error> {
        if self.active_low {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        }
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        if self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }
}
