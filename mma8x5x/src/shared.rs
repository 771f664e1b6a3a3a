//! One lock around the whole device so activation changes, poll ticks,
//! attribute access and power transitions never interleave on the bus.

use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::attributes::{Attribute, ATTR_BUF_LEN};
use crate::device::{Accelerometer, PowerManaged};
use crate::power::Regulator;
use crate::sink::SampleSink;
use crate::{CompatibleI2c, Error};

pub struct SharedAccelerometer<I2C, E, R, D> {
    inner: Mutex<RefCell<Accelerometer<I2C, E, R, D>>>,
}

impl<I2C, E, R, D> SharedAccelerometer<I2C, E, R, D>
where
    I2C: CompatibleI2c<E>,
    E: core::fmt::Debug,
    R: Regulator,
    D: DelayNs,
{
    pub fn new(accel: Accelerometer<I2C, E, R, D>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(accel)),
        }
    }

    pub fn into_inner(self) -> Accelerometer<I2C, E, R, D> {
        self.inner.into_inner().into_inner()
    }

    pub fn lock<T>(&self, f: impl FnOnce(&mut Accelerometer<I2C, E, R, D>) -> T) -> T {
        critical_section::with(|cs| {
            let mut accel = self.inner.borrow_ref_mut(cs);
            f(&mut accel)
        })
    }

    pub fn enable(&self) -> Result<(), Error<E>> {
        self.lock(|accel| accel.enable())
    }

    pub fn disable(&self) -> Result<(), Error<E>> {
        self.lock(|accel| accel.disable())
    }

    pub fn poll_once<S: SampleSink>(&self, sink: &mut S) -> u32 {
        self.lock(|accel| accel.poll_once(sink))
    }

    pub fn show(&self, attr: Attribute) -> Result<String<ATTR_BUF_LEN>, Error<E>> {
        self.lock(|accel| accel.show(attr))
    }

    pub fn store(&self, attr: Attribute, input: &str) -> Result<usize, Error<E>> {
        self.lock(|accel| accel.store(attr, input))
    }

    pub fn suspend(&self) -> Result<(), Error<E>> {
        self.lock(|accel| accel.suspend())
    }

    pub fn resume(&self) -> Result<(), Error<E>> {
        self.lock(|accel| accel.resume())
    }
}
