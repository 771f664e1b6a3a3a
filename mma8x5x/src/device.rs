//! Stateful sensor instance: activation, polling and power sequencing.

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::configs::*;
use crate::orientation::transform;
use crate::power::{PowerRails, Regulator};
use crate::registers::ChipVariant;
use crate::sink::SampleSink;
use crate::types::{ActivationState, CorrectedSample};
use crate::{CompatibleI2c, Error, Mma8x5x};

/// Suspend/resume hooks driven by the platform's power management.
pub trait PowerManaged {
    type Error;

    fn suspend(&mut self) -> Result<(), Self::Error>;
    fn resume(&mut self) -> Result<(), Self::Error>;
}

pub struct Accelerometer<I2C, E, R, D> {
    driver: Mma8x5x<I2C, E>,
    rails: PowerRails<R>,
    delay: D,
    config: Config,
    chip: ChipVariant,
    state: ActivationState,
    powered_down: bool,
    // Stored as written; clamped only when a sample is transformed.
    position: i32,
    poll_interval_ms: u32,
}

impl<I2C, E, R, D> Accelerometer<I2C, E, R, D>
where
    I2C: CompatibleI2c<E>,
    E: core::fmt::Debug,
    R: Regulator,
    D: DelayNs,
{
    /// Power the part, check its identity and leave it initialized in
    /// standby. On failure the rails are switched back off before the error
    /// is returned.
    pub fn probe(
        i2c: I2C,
        address: u8,
        rails: PowerRails<R>,
        delay: D,
        config: Config,
    ) -> Result<Self, Error<E>> {
        Self::probe_addresses(i2c, &[address], rails, delay, config)
    }

    /// Like `probe`, but the part is looked for at each of `addresses` in
    /// turn and bound at the first one answering with a supported chip ID.
    /// When none does, the error from the last address is returned.
    pub fn probe_addresses(
        i2c: I2C,
        addresses: &[u8],
        mut rails: PowerRails<R>,
        mut delay: D,
        config: Config,
    ) -> Result<Self, Error<E>> {
        let Some((&first, rest)) = addresses.split_first() else {
            return Err(Error::InvalidInput);
        };
        rails.power_on()?;

        let mut driver = Mma8x5x::new(i2c, first);
        let mut detected = driver.detect();
        for &address in rest {
            if detected.is_ok() {
                break;
            }
            driver.address = address;
            detected = driver.detect();
        }
        let chip = match detected {
            Ok(chip) => chip,
            Err(e) => {
                if let Error::InvalidDevice(id) = e {
                    error!("chip ID {:#04x} is not a supported mma8x5x part", id);
                }
                let _ = rails.power_off();
                return Err(e);
            }
        };
        let address = driver.address();

        if let Err(e) = driver.init(config.full_scale, &mut delay) {
            error!("error when init {}: {:?}", chip.name(), e);
            let _ = rails.power_off();
            return Err(e);
        }

        info!(
            "{} probed as {} at {:#04x}, position = {}",
            INPUT_DEVICE_NAME,
            chip.name(),
            address,
            config.position
        );

        Ok(Self {
            driver,
            rails,
            delay,
            config,
            chip,
            state: ActivationState::Standby,
            powered_down: false,
            position: config.position,
            poll_interval_ms: POLL_STOP_TIME_MS,
        })
    }

    /// Stop sampling and hand back the bus, rails and delay.
    pub fn remove(mut self) -> (I2C, PowerRails<R>, D) {
        if let Err(e) = self.driver.set_active(false) {
            warn!("failed to stop {} on remove: {:?}", self.chip.name(), e);
        }
        (self.driver.destroy(), self.rails, self.delay)
    }

    pub fn chip(&self) -> ChipVariant {
        self.chip
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn set_position(&mut self, position: i32) {
        self.position = position;
    }

    pub fn poll_interval_ms(&self) -> u32 {
        self.poll_interval_ms
    }

    pub fn set_poll_interval_ms(&mut self, interval_ms: u32) {
        self.poll_interval_ms = interval_ms.clamp(POLL_INTERVAL_MIN_MS, POLL_INTERVAL_MAX_MS);
    }

    pub fn driver(&mut self) -> &mut Mma8x5x<I2C, E> {
        &mut self.driver
    }

    pub fn enable(&mut self) -> Result<(), Error<E>> {
        if self.state == ActivationState::Active {
            return Ok(());
        }
        if self.powered_down {
            return Err(Error::Suspended);
        }
        self.driver.set_active(true)?;
        self.state = ActivationState::Active;
        debug!("{} set active", self.chip.name());
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), Error<E>> {
        if self.state == ActivationState::Standby {
            return Ok(());
        }
        if self.powered_down {
            return Err(Error::Suspended);
        }
        self.driver.set_active(false)?;
        self.state = ActivationState::Standby;
        debug!("{} set standby", self.chip.name());
        Ok(())
    }

    /// True only when both the hardware bit and the tracked state agree.
    pub fn is_enabled(&mut self) -> Result<bool, Error<E>> {
        let active = self.driver.is_active()?;
        Ok(active && self.state == ActivationState::Active)
    }

    /// One poll tick. Returns the interval until the next tick.
    pub fn poll_once<S: SampleSink>(&mut self, sink: &mut S) -> u32 {
        if self.state == ActivationState::Standby {
            self.poll_interval_ms = POLL_STOP_TIME_MS;
            return self.poll_interval_ms;
        }
        if self.poll_interval_ms == POLL_STOP_TIME_MS {
            self.poll_interval_ms = POLL_INTERVAL_MS;
        }

        match self.driver.read_raw() {
            Ok(raw) => {
                let sample: CorrectedSample = transform(raw, self.position);
                sink.report(sample);
            }
            Err(e) => debug!("i2c block read failed: {:?}", e),
        }
        self.poll_interval_ms
    }
}

impl<I2C, E, R, D> PowerManaged for Accelerometer<I2C, E, R, D>
where
    I2C: CompatibleI2c<E>,
    E: core::fmt::Debug,
    R: Regulator,
    D: DelayNs,
{
    type Error = Error<E>;

    fn suspend(&mut self) -> Result<(), Self::Error> {
        if self.state == ActivationState::Active && !self.powered_down {
            if let Err(e) = self.driver.set_active(false) {
                warn!("failed to stop {} before suspend: {:?}", self.chip.name(), e);
            }
        }
        match self.rails.power_off() {
            Ok(()) => self.powered_down = true,
            Err(e) => warn!("{} left powered across suspend: {:?}", self.chip.name(), e),
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), Self::Error> {
        if self.powered_down {
            let init = config_standby_init(self.config.full_scale);
            let restored = self
                .rails
                .power_on()
                .map_err(Error::from)
                .and_then(|()| self.driver.apply_config(&init));
            if let Err(e) = restored {
                error!("failed during resume operation: {:?}", e);
                return Err(e);
            }
            self.delay.delay_us(RESUME_SETTLE_US);
            self.powered_down = false;
        }
        if self.state == ActivationState::Active {
            self.driver.set_active(true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::power::tests::{fake_rails, Event, EventLog, FakeRegulator};
    use crate::power::{PowerError, RegulatorOp};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
    use std::vec::Vec;

    pub const ADDR: u8 = DEFAULT_ADDRESS;

    pub type TestAccel = Accelerometer<I2cMock, ErrorKind, FakeRegulator, NoopDelay>;

    #[derive(Default)]
    pub struct RecordingSink(pub Vec<CorrectedSample>);

    impl SampleSink for RecordingSink {
        fn report(&mut self, sample: CorrectedSample) {
            self.0.push(sample);
        }
    }

    pub fn probe_transactions(chip_id: u8) -> Vec<Transaction> {
        vec![
            Transaction::write_read(ADDR, vec![0x0D], vec![chip_id]),
            Transaction::write(ADDR, vec![0x2A, 0x00]),
            Transaction::write(ADDR, vec![0x0E, 0x00]),
        ]
    }

    /// Probe against a mock expecting the probe sequence followed by `rest`.
    pub fn probed(config: Config, rest: &[Transaction]) -> (TestAccel, I2cMock, EventLog) {
        let log = EventLog::default();
        let (accel, i2c) = probed_on(fake_rails(&log), config, rest);
        (accel, i2c, log)
    }

    fn probed_on(
        rails: PowerRails<FakeRegulator>,
        config: Config,
        rest: &[Transaction],
    ) -> (TestAccel, I2cMock) {
        let mut expectations = probe_transactions(0x1A);
        expectations.extend_from_slice(rest);
        let i2c = I2cMock::new(&expectations);
        let accel = Accelerometer::probe(i2c.clone(), ADDR, rails, NoopDelay::new(), config);
        (accel.unwrap(), i2c)
    }

    fn probe_default(
        i2c: &I2cMock,
        rails: PowerRails<FakeRegulator>,
    ) -> Result<TestAccel, Error<ErrorKind>> {
        Accelerometer::probe(i2c.clone(), ADDR, rails, NoopDelay::new(), Config::default())
    }

    fn enable_transactions() -> [Transaction; 2] {
        [
            Transaction::write_read(ADDR, vec![0x2A], vec![0x00]),
            Transaction::write(ADDR, vec![0x2A, 0x01]),
        ]
    }

    fn disable_transactions() -> [Transaction; 2] {
        [
            Transaction::write_read(ADDR, vec![0x2A], vec![0x01]),
            Transaction::write(ADDR, vec![0x2A, 0x00]),
        ]
    }

    fn burst(x: i16, y: i16, z: i16) -> Transaction {
        let (x, y, z) = (x.to_be_bytes(), y.to_be_bytes(), z.to_be_bytes());
        Transaction::write_read(ADDR, vec![0x01], vec![x[0], x[1], y[0], y[1], z[0], z[1], 0x00])
    }

    #[test]
    fn probe_leaves_device_in_standby() {
        let (accel, mut i2c, log) = probed(Config::default().with_position(6), &[]);
        assert_eq!(accel.chip(), ChipVariant::Mma8451);
        assert_eq!(accel.state(), ActivationState::Standby);
        assert_eq!(accel.position(), 6);
        assert_eq!(accel.poll_interval_ms(), POLL_STOP_TIME_MS);
        assert!(!accel.is_powered_down());
        assert_eq!(log.borrow().iter().filter(|e| matches!(e, Event::Enable(_))).count(), 2);
        i2c.done();
    }

    #[test]
    fn probe_declines_foreign_chip_and_powers_down() {
        let expectations = [Transaction::write_read(ADDR, vec![0x0D], vec![0x33])];
        let mut i2c = I2cMock::new(&expectations);
        let log = EventLog::default();
        let result = probe_default(&i2c, fake_rails(&log));
        assert_eq!(result.err(), Some(Error::InvalidDevice(0x33)));
        assert_eq!(
            log.borrow().iter().filter(|e| matches!(e, Event::Disable(_))).count(),
            2
        );
        i2c.done();
    }

    #[test]
    fn probe_unwinds_rails_when_init_fails() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0x0D], vec![0x4A]),
            Transaction::write(ADDR, vec![0x2A, 0x00]).with_error(ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let log = EventLog::default();
        let result = probe_default(&i2c, fake_rails(&log));
        assert_eq!(result.err(), Some(Error::I2c(ErrorKind::Other)));
        assert_eq!(log.borrow().last(), Some(&Event::Disable("vdd")));
        i2c.done();
    }

    #[test]
    fn probe_without_power_never_touches_bus() {
        let mut i2c = I2cMock::new(&[]);
        let log = EventLog::default();
        let vdd = FakeRegulator::new("vdd", &log);
        vdd.fail_enable.set(true);
        let rails = PowerRails::new(vdd, FakeRegulator::new("vio", &log));
        let result = probe_default(&i2c, rails);
        assert!(matches!(result, Err(Error::Power(_))));
        i2c.done();
    }

    #[test]
    fn probe_addresses_binds_at_first_answering_address() {
        let expectations = [
            Transaction::write_read(DEFAULT_ADDRESS, vec![0x0D], vec![0x00])
                .with_error(ErrorKind::Other),
            Transaction::write_read(ALT_ADDRESS, vec![0x0D], vec![0x3A]),
            Transaction::write(ALT_ADDRESS, vec![0x2A, 0x00]),
            Transaction::write(ALT_ADDRESS, vec![0x0E, 0x00]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let log = EventLog::default();
        let mut accel: TestAccel = Accelerometer::probe_addresses(
            i2c.clone(),
            PROBE_ADDRESSES,
            fake_rails(&log),
            NoopDelay::new(),
            Config::default(),
        )
        .unwrap();
        assert_eq!(accel.chip(), ChipVariant::Mma8453);
        assert_eq!(accel.driver().address(), ALT_ADDRESS);
        i2c.done();
    }

    #[test]
    fn probe_addresses_reports_last_failure_and_powers_down() {
        let expectations = [
            Transaction::write_read(DEFAULT_ADDRESS, vec![0x0D], vec![0x00])
                .with_error(ErrorKind::Other),
            Transaction::write_read(ALT_ADDRESS, vec![0x0D], vec![0xC4]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let log = EventLog::default();
        let result: Result<TestAccel, _> = Accelerometer::probe_addresses(
            i2c.clone(),
            PROBE_ADDRESSES,
            fake_rails(&log),
            NoopDelay::new(),
            Config::default(),
        );
        assert_eq!(result.err(), Some(Error::InvalidDevice(0xC4)));
        assert_eq!(log.borrow().last(), Some(&Event::Disable("vdd")));
        i2c.done();
    }

    #[test]
    fn probe_addresses_needs_an_address() {
        let mut i2c = I2cMock::new(&[]);
        let log = EventLog::default();
        let result: Result<TestAccel, _> = Accelerometer::probe_addresses(
            i2c.clone(),
            &[],
            fake_rails(&log),
            NoopDelay::new(),
            Config::default(),
        );
        assert_eq!(result.err(), Some(Error::InvalidInput));
        assert!(log.borrow().is_empty());
        i2c.done();
    }

    #[test]
    fn enable_is_idempotent() {
        let (mut accel, mut i2c, _) = probed(Config::default(), &enable_transactions());
        accel.enable().unwrap();
        accel.enable().unwrap();
        assert_eq!(accel.state(), ActivationState::Active);
        i2c.done();
    }

    #[test]
    fn disable_in_standby_is_silent() {
        let (mut accel, mut i2c, _) = probed(Config::default(), &[]);
        accel.disable().unwrap();
        assert_eq!(accel.state(), ActivationState::Standby);
        i2c.done();
    }

    #[test]
    fn enable_then_disable() {
        let mut rest = enable_transactions().to_vec();
        rest.extend(disable_transactions());
        let (mut accel, mut i2c, _) = probed(Config::default(), &rest);
        accel.enable().unwrap();
        accel.disable().unwrap();
        assert_eq!(accel.state(), ActivationState::Standby);
        i2c.done();
    }

    #[test]
    fn failed_enable_write_keeps_standby() {
        let rest = [
            Transaction::write_read(ADDR, vec![0x2A], vec![0x00]),
            Transaction::write(ADDR, vec![0x2A, 0x01]).with_error(ErrorKind::Other),
        ];
        let (mut accel, mut i2c, _) = probed(Config::default(), &rest);
        assert_eq!(accel.enable(), Err(Error::I2c(ErrorKind::Other)));
        assert_eq!(accel.state(), ActivationState::Standby);
        i2c.done();
    }

    #[test]
    fn is_enabled_needs_bit_and_state() {
        let mut rest = vec![Transaction::write_read(ADDR, vec![0x2A], vec![0x01])];
        rest.extend(enable_transactions());
        rest.push(Transaction::write_read(ADDR, vec![0x2A], vec![0x01]));
        let (mut accel, mut i2c, _) = probed(Config::default(), &rest);
        assert_eq!(accel.is_enabled(), Ok(false));
        accel.enable().unwrap();
        assert_eq!(accel.is_enabled(), Ok(true));
        i2c.done();
    }

    #[test]
    fn standby_poll_slows_down_and_skips_bus() {
        let (mut accel, mut i2c, _) = probed(Config::default(), &[]);
        let mut sink = RecordingSink::default();
        accel.set_poll_interval_ms(50);
        assert_eq!(accel.poll_once(&mut sink), POLL_STOP_TIME_MS);
        assert!(sink.0.is_empty());
        i2c.done();
    }

    #[test]
    fn active_poll_reports_corrected_sample() {
        let mut rest = enable_transactions().to_vec();
        rest.push(burst(100, -50, 200));
        rest.push(burst(-32, 16, 0));
        let (mut accel, mut i2c, _) = probed(Config::default().with_position(3), &rest);
        let mut sink = RecordingSink::default();
        accel.enable().unwrap();

        assert_eq!(accel.poll_once(&mut sink), POLL_INTERVAL_MS);
        accel.set_position(1);
        accel.poll_once(&mut sink);

        assert_eq!(
            sink.0,
            [
                CorrectedSample { x: 6, y: -3, z: 12 },
                CorrectedSample { x: 2, y: -1, z: 0 },
            ]
        );
        i2c.done();
    }

    #[test]
    fn active_poll_keeps_custom_interval() {
        let mut rest = enable_transactions().to_vec();
        rest.push(burst(0, 0, 0));
        let (mut accel, mut i2c, _) = probed(Config::default(), &rest);
        accel.enable().unwrap();
        accel.set_poll_interval_ms(20);
        assert_eq!(accel.poll_once(&mut RecordingSink::default()), 20);
        i2c.done();
    }

    #[test]
    fn poll_interval_is_bounded() {
        let (mut accel, mut i2c, _) = probed(Config::default(), &[]);
        accel.set_poll_interval_ms(0);
        assert_eq!(accel.poll_interval_ms(), POLL_INTERVAL_MIN_MS);
        accel.set_poll_interval_ms(10_000);
        assert_eq!(accel.poll_interval_ms(), POLL_INTERVAL_MAX_MS);
        i2c.done();
    }

    #[test]
    fn read_failure_emits_nothing_and_keeps_state() {
        let mut rest = enable_transactions().to_vec();
        rest.push(
            Transaction::write_read(ADDR, vec![0x01], vec![0; 7]).with_error(ErrorKind::Other),
        );
        rest.push(burst(16, 16, 16));
        let (mut accel, mut i2c, _) = probed(Config::default().with_position(3), &rest);
        let mut sink = RecordingSink::default();
        accel.enable().unwrap();

        accel.poll_once(&mut sink);
        assert!(sink.0.is_empty());
        assert_eq!(accel.state(), ActivationState::Active);

        accel.poll_once(&mut sink);
        assert_eq!(sink.0, [CorrectedSample { x: 1, y: 1, z: 1 }]);
        i2c.done();
    }

    #[test]
    fn suspend_and_resume_restore_active_state() {
        let mut rest = enable_transactions().to_vec();
        rest.extend(disable_transactions());
        rest.push(Transaction::write(ADDR, vec![0x2A, 0x00]));
        rest.push(Transaction::write(ADDR, vec![0x0E, 0x00]));
        rest.extend(enable_transactions());
        let (mut accel, mut i2c, log) = probed(Config::default(), &rest);
        accel.enable().unwrap();
        log.borrow_mut().clear();

        accel.suspend().unwrap();
        assert!(accel.is_powered_down());
        assert_eq!(accel.state(), ActivationState::Active);
        assert_eq!(
            *log.borrow(),
            [
                Event::SetVoltage("vio", 0, 1_800_000),
                Event::Disable("vio"),
                Event::SetVoltage("vdd", 0, 2_850_000),
                Event::Disable("vdd"),
            ]
        );

        accel.resume().unwrap();
        assert!(!accel.is_powered_down());
        assert_eq!(accel.state(), ActivationState::Active);
        i2c.done();
    }

    #[test]
    fn suspend_in_standby_only_cuts_power() {
        let rest = [
            Transaction::write(ADDR, vec![0x2A, 0x00]),
            Transaction::write(ADDR, vec![0x0E, 0x00]),
        ];
        let (mut accel, mut i2c, _) = probed(Config::default(), &rest);
        accel.suspend().unwrap();
        assert!(accel.is_powered_down());
        assert_eq!(accel.enable(), Err(Error::Suspended));
        accel.resume().unwrap();
        assert_eq!(accel.state(), ActivationState::Standby);
        i2c.done();
    }

    #[test]
    fn resume_failure_is_reported_and_stays_powered_down() {
        let rest = [Transaction::write(ADDR, vec![0x2A, 0x00]).with_error(ErrorKind::Other)];
        let (mut accel, mut i2c, _) = probed(Config::default(), &rest);
        accel.suspend().unwrap();
        assert_eq!(accel.resume(), Err(Error::I2c(ErrorKind::Other)));
        assert!(accel.is_powered_down());
        i2c.done();
    }

    #[test]
    fn suspend_cuts_power_even_if_stop_fails() {
        let mut rest = enable_transactions().to_vec();
        rest.push(
            Transaction::write_read(ADDR, vec![0x2A], vec![0x00]).with_error(ErrorKind::Other),
        );
        let (mut accel, mut i2c, log) = probed(Config::default(), &rest);
        accel.enable().unwrap();
        log.borrow_mut().clear();

        assert_eq!(accel.suspend(), Ok(()));
        assert!(accel.is_powered_down());
        assert_eq!(
            *log.borrow(),
            [
                Event::SetVoltage("vio", 0, 1_800_000),
                Event::Disable("vio"),
                Event::SetVoltage("vdd", 0, 2_850_000),
                Event::Disable("vdd"),
            ]
        );
        i2c.done();
    }

    #[test]
    fn suspend_with_stuck_rail_stays_powered() {
        let log = EventLog::default();
        let vio = FakeRegulator::new("vio", &log);
        let vio_stuck = vio.fail_disable.clone();
        let rails = PowerRails::new(FakeRegulator::new("vdd", &log), vio);
        let (mut accel, mut i2c) = probed_on(rails, Config::default(), &[]);

        vio_stuck.set(true);
        assert_eq!(accel.suspend(), Ok(()));
        assert!(!accel.is_powered_down());
        // Not marked powered down, so resume skips re-init.
        assert_eq!(accel.resume(), Ok(()));
        i2c.done();
    }

    #[test]
    fn resume_reports_rail_failure_and_stays_powered_down() {
        let log = EventLog::default();
        let vdd = FakeRegulator::new("vdd", &log);
        let vdd_broken = vdd.fail_enable.clone();
        let rails = PowerRails::new(vdd, FakeRegulator::new("vio", &log));
        let rest = [
            Transaction::write(ADDR, vec![0x2A, 0x00]),
            Transaction::write(ADDR, vec![0x0E, 0x00]),
        ];
        let (mut accel, mut i2c) = probed_on(rails, Config::default(), &rest);

        accel.suspend().unwrap();
        vdd_broken.set(true);
        assert_eq!(
            accel.resume(),
            Err(Error::Power(PowerError {
                supply: "vdd",
                op: RegulatorOp::Enable,
            }))
        );
        assert!(accel.is_powered_down());
        assert_eq!(accel.enable(), Err(Error::Suspended));

        vdd_broken.set(false);
        accel.resume().unwrap();
        assert!(!accel.is_powered_down());
        i2c.done();
    }

    #[test]
    fn resume_without_suspend_reasserts_enable() {
        let mut rest = enable_transactions().to_vec();
        rest.extend(enable_transactions());
        let (mut accel, mut i2c, _) = probed(Config::default(), &rest);
        accel.enable().unwrap();
        accel.resume().unwrap();
        i2c.done();
    }

    #[test]
    fn remove_clears_active_bit() {
        let rest = [
            Transaction::write_read(ADDR, vec![0x2A], vec![0x03]),
            Transaction::write(ADDR, vec![0x2A, 0x02]),
        ];
        let (accel, mut i2c, _) = probed(Config::default(), &rest);
        let (_bus, rails, _delay) = accel.remove();
        assert!(rails.is_on());
        i2c.done();
    }
}
