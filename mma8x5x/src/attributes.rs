//! Text attributes exposed to user space: `enable`, `position` and
//! `poll_interval`. Reads render `"<value>\n"`, writes take a decimal value
//! with an optional trailing newline.

use core::fmt::Write;
use core::str::FromStr;
use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::device::Accelerometer;
use crate::power::Regulator;
use crate::{CompatibleI2c, Error};

pub const ATTR_BUF_LEN: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Enable,
    Position,
    PollInterval,
}

pub const ATTRIBUTES: &[Attribute] = &[
    Attribute::Enable,
    Attribute::Position,
    Attribute::PollInterval,
];

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Enable => "enable",
            Attribute::Position => "position",
            Attribute::PollInterval => "poll_interval",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ATTRIBUTES.iter().copied().find(|attr| attr.name() == name)
    }
}

fn parse<T: FromStr, E>(input: &str) -> Result<T, Error<E>> {
    let value = input.strip_suffix('\n').unwrap_or(input);
    value.parse().map_err(|_| Error::InvalidInput)
}

fn render<E>(value: impl core::fmt::Display) -> Result<String<ATTR_BUF_LEN>, Error<E>> {
    let mut out = String::new();
    writeln!(out, "{}", value).map_err(|_| Error::InvalidInput)?;
    Ok(out)
}

impl<I2C, E, R, D> Accelerometer<I2C, E, R, D>
where
    I2C: CompatibleI2c<E>,
    E: core::fmt::Debug,
    R: Regulator,
    D: DelayNs,
{
    pub fn show(&mut self, attr: Attribute) -> Result<String<ATTR_BUF_LEN>, Error<E>> {
        match attr {
            Attribute::Enable => render(u8::from(self.is_enabled()?)),
            Attribute::Position => render(self.position()),
            Attribute::PollInterval => render(self.poll_interval_ms()),
        }
    }

    /// Returns the number of bytes consumed. A rejected write leaves the
    /// device untouched.
    pub fn store(&mut self, attr: Attribute, input: &str) -> Result<usize, Error<E>> {
        match attr {
            Attribute::Enable => {
                let enable: u64 = parse(input)?;
                if enable > 0 {
                    self.enable()?;
                } else {
                    self.disable()?;
                }
            }
            Attribute::Position => {
                let position: i32 = parse(input)?;
                self.set_position(position);
            }
            Attribute::PollInterval => {
                let interval: u32 = parse(input)?;
                self.set_poll_interval_ms(interval);
            }
        }
        Ok(input.len())
    }
}
