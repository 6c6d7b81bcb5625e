//! Routes one clock at a time to CK_OUT (PA8). Every press of the user key
//! selects the next source and lights the next LED.
#![no_main]
#![no_std]

use gd32c2x1_bsp as _;

#[rtic::app(device = gd32c2x1_bsp::pac, peripherals = true)]
mod app {
    use gd32c2x1_bsp::board::eval::{self, Key, Led};
    use gd32c2x1_bsp::board::{self, BoardKey};
    use gd32c2x1_bsp::exti::Exti;
    use gd32c2x1_bsp::gpio::{self, OutputType, Pin, Port, Speed};
    use gd32c2x1_bsp::pmu::Pmu;
    use gd32c2x1_bsp::rcu::{CkOutDiv, CkOutSource, Oscillator, Periph, Rcu};
    use gd32c2x1_bsp::syscfg::Syscfg;
    use gd32c2x1_bsp::usart::Usart;

    const OUTPUTS: [(CkOutSource, CkOutDiv, &str); 5] = [
        (CkOutSource::CkSys, CkOutDiv::Div4, "CK_OUT: system clock, DIV: 4 \r\n"),
        (CkOutSource::Irc48m, CkOutDiv::Div8, "CK_OUT: IRC48M, DIV: 8 \r\n"),
        (CkOutSource::Irc32k, CkOutDiv::Div1, "CK_OUT: IRC32K, DIV: 1 \r\n"),
        (CkOutSource::Lxtal, CkOutDiv::Div1, "CK_OUT: LXTAL, DIV: 1 \r\n"),
        (CkOutSource::Hxtal, CkOutDiv::Div1, "CK_OUT: HXTAL, DIV: 1 \r\n"),
    ];

    #[shared]
    struct Shared {
        pressed: bool,
    }

    #[local]
    struct Local {
        rcu: Rcu,
        com: Usart,
        exti: Exti,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let device = cx.device;

        let mut rcu = Rcu::new(device.RCU);
        let clocks = rcu.clocks();
        let mut com = eval::com_init(device.USART0, &mut rcu, &clocks);
        com.write_str("\r\n /=========== Gigadevice Clock Output Demo ===========/ \r\n");
        com.write_str("press user key to select clock output source \r\n");

        for led in Led::ALL {
            board::led_init(led, &mut rcu);
        }

        let mut pmu = Pmu::new(device.PMU);
        oscillators_start(&mut rcu, &mut pmu, &mut com);

        let ck_out = Pin::new(Port::A, 8);
        ck_out.enable_clock(&mut rcu);
        ck_out.into_alternate(gpio::AF0, OutputType::PushPull, Speed::Level1);

        let mut syscfg = Syscfg::new(device.SYSCFG);
        let mut exti = Exti::new(device.EXTI);
        board::key_init_exti(Key::User, &mut rcu, &mut syscfg, &mut exti);

        (
            Shared { pressed: false },
            Local { rcu, com, exti },
            init::Monotonics(),
        )
    }

    /// Starts every oscillator that can feed CK_OUT. LXTAL lives in the
    /// backup domain and needs backup writes unlocked.
    fn oscillators_start(rcu: &mut Rcu, pmu: &mut Pmu, com: &mut Usart) {
        wait_stable(rcu, com, Oscillator::Irc48m, "RCU_IRC48M");
        wait_stable(rcu, com, Oscillator::Hxtal, "RCU_HXTAL");

        rcu.enable(Periph::Pmu);
        pmu.backup_write_enable();
        wait_stable(rcu, com, Oscillator::Lxtal, "RCU_LXTAL");
        pmu.backup_write_disable();

        wait_stable(rcu, com, Oscillator::Irc32k, "RCU_IRC32K");
    }

    fn wait_stable(rcu: &mut Rcu, com: &mut Usart, osc: Oscillator, name: &str) {
        rcu.osc_on(osc);
        if rcu.osc_stab_wait(osc).is_err() {
            com.write_str(name);
            com.write_str(" rcu_osci_stab_wait timeout! \r\n");
            loop {
                cortex_m::asm::nop();
            }
        }
    }

    #[idle(shared = [pressed], local = [rcu, com])]
    fn idle(mut cx: idle::Context) -> ! {
        let mut seq = 0usize;
        loop {
            let pressed = cx.shared.pressed.lock(|p| core::mem::replace(p, false));
            if !pressed {
                continue;
            }

            eval::leds_set(false);
            board::led_on(Led::ALL[seq % Led::ALL.len()]);

            let (source, div, msg) = OUTPUTS[seq % OUTPUTS.len()];
            cx.local.rcu.ckout_config(source, div);
            cx.local.com.write_str(msg);
            seq = seq.wrapping_add(1);
        }
    }

    #[task(binds = EXTI4, shared = [pressed], local = [exti])]
    fn user_key(mut cx: user_key::Context) {
        let line = Key::User.def().line();
        if cx.local.exti.interrupt_flag_get(line) {
            cx.shared.pressed.lock(|p| *p = true);
            cx.local.exti.interrupt_flag_clear(line);
        }
    }
}
