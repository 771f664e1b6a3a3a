#![no_std]
#![no_main]

mod rtt_log;

use panic_rtt_target as _;

#[rtic::app(
device = stm32f4xx_hal::pac,
dispatchers = [EXTI0])]

mod app {
    use heapless::spsc::{Consumer, Producer, Queue};
    use embedded_hal::i2c::I2c as I2cTrait;
    use log::LevelFilter;
    use rtic_monotonics::systick::prelude::*;
    use rtt_target::{rprint, rprintln, DownChannel};
    use stm32f4xx_hal::{
        gpio::{Edge, ErasedPin, ExtiPin, Output, PushPull, PC13},
        i2c::Error as I2cError,
        pac::{I2C1, TIM2},
        prelude::*,
        timer::DelayUs,
    };

    use mma8x5x::console::{Command, LineBuffer};
    use mma8x5x::registers::ACCEL_REGS;
    use mma8x5x::{
        Accelerometer, ActivationState, Config, CorrectedSample, GpioSwitch, PowerManaged,
        PowerRails, INPUT_DEVICE_NAME, PROBE_ADDRESSES,
    };

    use crate::rtt_log;

    systick_monotonic!(Mono, 1_000);

    // Board has the sensor mounted rotated 180 degrees about Z.
    const BOARD_POSITION: i32 = 1;
    const ACCEL_INT1_PIN: u32 = 5;
    const IRQ_EDGE_RISING: u32 = 0x1;
    const SAMPLE_QUEUE_LEN: usize = 32;

    type HalI2c = stm32f4xx_hal::i2c::I2c<I2C1>;
    type RailSwitch = GpioSwitch<ErasedPin<Output<PushPull>>>;
    type Accel = Accelerometer<HalI2c, I2cError, RailSwitch, DelayUs<TIM2>>;

    #[shared]
    struct Shared {
        accel: Accel,
    }

    #[local]
    struct Local {
        sample_producer: Producer<'static, CorrectedSample, SAMPLE_QUEUE_LEN>,
        sample_consumer: Consumer<'static, CorrectedSample, SAMPLE_QUEUE_LEN>,
        console: DownChannel,
        line: LineBuffer,
        button: PC13,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let channels = rtt_target::rtt_init! {
            up: {
                0: {
                    size: 4096,
                    mode: rtt_target::ChannelMode::NoBlockSkip
                }
            }
            down: {
                0: {
                    size: 16
                }
            }
        };
        rtt_target::set_print_channel(channels.up.0);
        rtt_log::init(LevelFilter::Debug);
        rprintln!("RTIC #[init] started");

        let dp = ctx.device;
        let rcc = dp.RCC.constrain();
        let clocks = rcc.cfgr
            .sysclk(84.MHz())
            .freeze();

        Mono::start(ctx.core.SYST, clocks.sysclk().raw());

        let delay: DelayUs<TIM2> = dp.TIM2.delay_us(&clocks);

        let mut syscfg = dp.SYSCFG.constrain();
        let mut exti = dp.EXTI;

        let gpiob = dp.GPIOB.split();
        let gpioc = dp.GPIOC.split();

        let scl = gpiob.pb8.into_alternate::<4>().set_open_drain();
        let sda = gpiob.pb9.into_alternate::<4>().set_open_drain();
        let vdd_en = gpiob.pb0.into_push_pull_output().erase();
        let vio_en = gpiob.pb1.into_push_pull_output().erase();

        let mut button = gpioc.pc13.into_pull_up_input();
        button.make_interrupt_source(&mut syscfg);
        button.enable_interrupt(&mut exti);
        button.trigger_on_edge(&mut exti, Edge::Falling);

        let i2c = HalI2c::new(dp.I2C1, (scl, sda), 400_u32.kHz(), &clocks);

        let rails = PowerRails::new(GpioSwitch::new(vdd_en), GpioSwitch::new(vio_en));
        let config = Config::default()
            .with_position(BOARD_POSITION)
            .with_irq(ACCEL_INT1_PIN, IRQ_EDGE_RISING);

        // SA0 strapping differs between board revisions.
        let probed = Accelerometer::probe_addresses(i2c, PROBE_ADDRESSES, rails, delay, config);
        let mut accel: Accel = match probed {
            Ok(accel) => accel,
            Err(e) => panic!("{} probe failed: {:?}", INPUT_DEVICE_NAME, e),
        };
        scan_i2c_bus(accel.driver().i2c());
        rprintln!(
            "{} ready ({} at {:#04x})",
            INPUT_DEVICE_NAME,
            accel.chip().name(),
            accel.driver().address()
        );

        let queue = cortex_m::singleton!(: Queue<CorrectedSample, SAMPLE_QUEUE_LEN> = Queue::new())
            .expect("sample queue already taken");
        let (prod, cons) = queue.split();

        poll::spawn().ok();

        (
            Shared { accel },
            Local {
                sample_producer: prod,
                sample_consumer: cons,
                console: channels.down.0,
                line: LineBuffer::new(),
                button,
            },
        )
    }

    /// Poll loop. The device decides the next interval: slow while in
    /// standby, normal while active.
    #[task(priority = 1, shared = [accel], local = [sample_producer])]
    async fn poll(mut cx: poll::Context) {
        loop {
            let producer = &mut *cx.local.sample_producer;
            let interval = cx.shared.accel.lock(|accel| accel.poll_once(producer));
            Mono::delay(interval.millis()).await;
        }
    }

    #[task(binds = EXTI15_10, priority = 2, shared = [accel], local = [button])]
    fn on_button(mut cx: on_button::Context) {
        cx.local.button.clear_interrupt_pending_bit();

        cx.shared.accel.lock(|accel| {
            let result = match accel.state() {
                ActivationState::Standby => accel.enable(),
                ActivationState::Active => accel.disable(),
            };
            match result {
                Ok(()) => rprintln!("{:?}", accel.state()),
                Err(e) => rprintln!("toggle failed: {:?}", e),
            }
        });
    }

    #[idle(shared = [accel], local = [sample_consumer, console, line])]
    fn idle(mut ctx: idle::Context) -> ! {
        loop {
            while let Some(sample) = ctx.local.sample_consumer.dequeue() {
                rprintln!("Accel, {}, {}, {}", sample.x, sample.y, sample.z);
            }

            let mut buf = [0u8; 16];
            let count = ctx.local.console.read(&mut buf);
            for &byte in &buf[..count] {
                if ctx.local.line.push(byte) {
                    ctx.shared.accel.lock(|accel| run_command(accel, ctx.local.line.as_str()));
                    ctx.local.line.clear();
                }
            }

            cortex_m::asm::wfi();
        }
    }

    fn run_command(accel: &mut Accel, line: &str) {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                rprintln!("{:?}: {}", e, line);
                return;
            }
        };
        match command {
            Command::Show(attr) => match accel.show(attr) {
                Ok(text) => rprint!("{} = {}", attr.name(), text.as_str()),
                Err(e) => rprintln!("{} read failed: {:?}", attr.name(), e),
            },
            Command::Store(attr, value) => {
                if let Err(e) = accel.store(attr, value) {
                    rprintln!("{} write failed: {:?}", attr.name(), e);
                }
            }
            Command::Suspend => {
                accel.suspend().ok();
                rprintln!("suspended, powered down = {}", accel.is_powered_down());
            }
            Command::Resume => match accel.resume() {
                Ok(()) => rprintln!("resumed, {:?}", accel.state()),
                Err(e) => rprintln!("resume failed: {:?}", e),
            },
            Command::Dump => {
                rprintln!("Dumping ACCEL_REGS config");
                accel.driver().dump_config(ACCEL_REGS).ok();
            }
        }
    }

    fn scan_i2c_bus<I2C, E>(i2c: &mut I2C)
    where
        I2C: I2cTrait<Error = E>,
        E: core::fmt::Debug,
    {
        rprintln!("Scanning I2C bus...");
        for addr in 0x08..=0x77 {
            let mut buf = [0u8];
            if i2c.write_read(addr, &[0x00], &mut buf).is_ok() {
                rprintln!(" - Found device at 0x{:02X}", addr);
            }
        }
    }
}
