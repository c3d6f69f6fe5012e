use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::regs::{self, Field, Register};
use super::*;
use crate::time::Hertz;

/// Number of registers in the map; `Register` discriminants index into
/// the simulated bank's word array.
const NREGS: usize = 7;

/// One bus access, in program order. Reads carry the value the
/// sequencer observed, writes the value it issued.
#[derive(Debug, Clone, Copy)]
enum Access {
    Read(Register, u32),
    Write(Register, u32),
}

/// Simulated register bank.
///
/// Models responsive hardware by default: enabling an oscillator or the
/// PLL asserts the matching ready flag on the same write, and a system
/// clock switch request is reflected in the status field immediately.
/// Every access is recorded for ordering assertions, and every run is
/// read-fuel bounded so a wait on a condition no write has produced
/// panics instead of hanging the runner.
struct SimBank {
    words: [u32; NREGS],
    log: RefCell<Vec<Access>>,
    hse_responds: bool,
    /// Reads remaining before the bank declares the sequencer hung.
    fuel: Cell<Option<u32>>,
    /// Set when `PLLCFGR` is written while `PLLON` is set, which real
    /// hardware silently ignores.
    pllcfgr_while_enabled: bool,
}

impl SimBank {
    fn at_reset() -> Self {
        let mut words = [0u32; NREGS];
        words[Register::Cr as usize] = regs::CR_RESET;
        words[Register::Pllcfgr as usize] = regs::PLLCFGR_RESET;
        words[Register::Cfgr as usize] = regs::CFGR_RESET;
        Self {
            words,
            log: RefCell::new(Vec::new()),
            hse_responds: true,
            fuel: Cell::new(Some(4_096)),
            pllcfgr_while_enabled: false,
        }
    }

    /// A bank whose external oscillator never reports ready. `fuel`
    /// bounds the number of reads before the bank treats the sequencer
    /// as hung and panics out of its spin loop.
    fn with_dead_hse(fuel: u32) -> Self {
        let mut bank = Self::at_reset();
        bank.hse_responds = false;
        bank.fuel.set(Some(fuel));
        bank
    }

    fn field(&self, field: Field) -> u32 {
        field.of(self.words[field.reg as usize])
    }

    /// Position in the access log of the first write to `reg` satisfying
    /// `pred`.
    fn first_write(&self, reg: Register, pred: impl Fn(u32) -> bool) -> Option<usize> {
        self.log.borrow().iter().position(
            |a| matches!(a, Access::Write(r, v) if *r == reg && pred(*v)),
        )
    }

    /// Position in the access log of the first read of `reg` that
    /// observed a value satisfying `pred`. Comparable with
    /// [`Self::first_write`] positions.
    fn first_read(&self, reg: Register, pred: impl Fn(u32) -> bool) -> Option<usize> {
        self.log.borrow().iter().position(
            |a| matches!(a, Access::Read(r, v) if *r == reg && pred(*v)),
        )
    }
}

fn with_flag(word: u32, field: Field, on: bool) -> u32 {
    if on {
        word | field.mask
    } else {
        word & !field.mask
    }
}

impl RegisterBank for SimBank {
    fn read(&self, reg: Register) -> u32 {
        if let Some(fuel) = self.fuel.get() {
            if fuel == 0 {
                panic!("sequencer hung: read fuel exhausted");
            }
            self.fuel.set(Some(fuel - 1));
        }
        let value = self.words[reg as usize];
        self.log.borrow_mut().push(Access::Read(reg, value));
        value
    }

    fn write(&mut self, reg: Register, value: u32) {
        if reg == Register::Pllcfgr && self.field(regs::PLLON) != 0 {
            self.pllcfgr_while_enabled = true;
        }

        self.words[reg as usize] = value;
        self.log.borrow_mut().push(Access::Write(reg, value));

        match reg {
            Register::Cr => {
                let mut cr = value;
                cr = with_flag(cr, regs::HSIRDY, regs::HSION.of(value) != 0);
                cr = with_flag(
                    cr,
                    regs::HSERDY,
                    regs::HSEON.of(value) != 0 && self.hse_responds,
                );
                cr = with_flag(cr, regs::PLLRDY, regs::PLLON.of(value) != 0);
                self.words[reg as usize] = cr;
            }
            Register::Cfgr => {
                let sw = regs::SW.of(value);
                self.words[reg as usize] = (value & !regs::SWS.mask) | regs::SWS.bits(sw);
            }
            _ => {}
        }
    }
}

#[test]
fn writes_follow_bringup_order() {
    let mut bank = SimBank::at_reset();
    configure_clock(&mut bank, &Config::default());

    let latency = bank
        .first_write(Register::FlashAcr, |v| regs::LATENCY.of(v) == 2)
        .unwrap();
    let hse_on = bank
        .first_write(Register::Cr, |v| regs::HSEON.of(v) != 0)
        .unwrap();
    let pll_cfg = bank
        .first_write(Register::Pllcfgr, |v| regs::PLLN.of(v) == 72)
        .unwrap();
    let pll_on = bank
        .first_write(Register::Cr, |v| regs::PLLON.of(v) != 0)
        .unwrap();
    let apb1_pre = bank
        .first_write(Register::Cfgr, |v| regs::PPRE1.of(v) == 0b100)
        .unwrap();
    let switch = bank
        .first_write(Register::Cfgr, |v| regs::SW.of(v) == regs::SYSCLK_PLL)
        .unwrap();

    assert!(latency < hse_on);
    assert!(hse_on < pll_cfg);
    assert!(pll_cfg < pll_on);
    assert!(pll_on < switch);
    // bus prescaler must not trail the switch
    assert!(apb1_pre <= switch);

    assert!(!bank.pllcfgr_while_enabled);
}

#[test]
fn status_polls_follow_their_enable_writes() {
    let mut bank = SimBank::at_reset();
    configure_clock(&mut bank, &Config::default());

    // the bank only reflects a flag once the matching write lands, so a
    // successful poll pins the read after the write in the log
    let pll_on = bank
        .first_write(Register::Cr, |v| regs::PLLON.of(v) != 0)
        .unwrap();
    let pll_ready = bank
        .first_read(Register::Cr, |v| regs::PLLRDY.of(v) != 0)
        .unwrap();
    assert!(pll_on < pll_ready);

    let switch = bank
        .first_write(Register::Cfgr, |v| regs::SW.of(v) == regs::SYSCLK_PLL)
        .unwrap();
    let confirm = bank
        .first_read(Register::Cfgr, |v| regs::SWS.of(v) == regs::SYSCLK_PLL)
        .unwrap();
    assert!(switch < confirm);
}

#[test]
fn reset_defaults_reach_pll_with_hsi_off() {
    let mut bank = SimBank::at_reset();
    configure_clock(&mut bank, &Config::default());

    assert_eq!(bank.field(regs::SWS), regs::SYSCLK_PLL);
    assert_eq!(bank.field(regs::HSION), 0);
    assert_eq!(bank.field(regs::LATENCY), 2);
    assert_eq!(bank.field(regs::PPRE1), 0b100);

    // the 72 MHz profile, as one PLLCFGR transaction
    assert_eq!(bank.field(regs::PLLM), 4);
    assert_eq!(bank.field(regs::PLLN), 72);
    assert_eq!(bank.field(regs::PLLP), PllSysDiv::Div2 as u32);
    assert_eq!(bank.field(regs::PLLQ), 3);
    assert_eq!(bank.field(regs::PLLSRC), regs::PLLSRC_HSE);
}

#[test]
fn rerun_never_writes_pll_fields_while_enabled() {
    let mut bank = SimBank::at_reset();
    let config = Config::default();

    configure_clock(&mut bank, &config);
    configure_clock(&mut bank, &config);

    assert!(!bank.pllcfgr_while_enabled);
    assert_eq!(bank.field(regs::SWS), regs::SYSCLK_PLL);
    assert_eq!(bank.field(regs::HSION), 0);
}

#[test]
fn dead_hse_never_reaches_pll_enable() {
    let mut bank = SimBank::with_dead_hse(1_000);

    let result = catch_unwind(AssertUnwindSafe(|| {
        configure_clock(&mut bank, &Config::default());
    }));

    assert!(result.is_err());
    assert!(bank
        .first_write(Register::Cr, |v| regs::PLLON.of(v) != 0)
        .is_none());
    assert!(bank
        .first_write(Register::Cfgr, |v| regs::SW.of(v) == regs::SYSCLK_PLL)
        .is_none());
}

#[test]
fn hsi_sourced_pll_keeps_hsi_running() {
    let mut bank = SimBank::at_reset();
    let config = ConfigBuilder::new()
        .with_pll(Pll {
            source: PllSource::Hsi,
            prediv: 16,
            mul: 144,
            sysdiv: PllSysDiv::Div2,
            usbdiv: 3,
        })
        .checked();

    configure_clock(&mut bank, &config);

    assert_eq!(bank.field(regs::SWS), regs::SYSCLK_PLL);
    assert_eq!(bank.field(regs::HSION), 1);
    assert!(bank
        .first_write(Register::Cr, |v| regs::HSEON.of(v) != 0)
        .is_none());
}

#[test]
fn mco_does_not_disturb_the_main_sequence_state() {
    let mut bank = SimBank::at_reset();
    configure_clock(&mut bank, &Config::default());

    let cr = bank.words[Register::Cr as usize];
    let pllcfgr = bank.words[Register::Pllcfgr as usize];
    let cfgr = bank.words[Register::Cfgr as usize];

    configure_mco(&mut bank, &McoConfig::default());

    assert_eq!(bank.words[Register::Cr as usize], cr);
    assert_eq!(bank.words[Register::Pllcfgr as usize], pllcfgr);

    let cfgr_diff = bank.words[Register::Cfgr as usize] ^ cfgr;
    assert_eq!(cfgr_diff & !(regs::MCO1.mask | regs::MCO1PRE.mask), 0);

    assert_eq!(bank.field(regs::MCO1), McoSource::Pll as u32);
    assert_eq!(bank.field(regs::MCO1PRE), McoPrescaler::Div2 as u32);
    assert_eq!(bank.field(regs::GPIOAEN), 1);
    assert_eq!(bank.field(regs::MODER8), regs::GPIO_MODE_ALTERNATE);
    assert_eq!(bank.field(regs::OSPEEDR8), regs::GPIO_SPEED_MEDIUM);
}

#[test]
fn default_profile_frequencies() {
    let freqs = Config::default().clock_freqs();

    assert_eq!(freqs.sysclk, Hertz::mhz(72));
    assert_eq!(freqs.hclk, Hertz::mhz(72));
    assert_eq!(freqs.pclk1, Hertz::mhz(36));
    assert_eq!(freqs.clk48, Some(Hertz::mhz(48)));
}

#[test]
fn check_rejects_insufficient_flash_latency() {
    // 72 MHz HCLK needs at least 2 wait states
    let result = catch_unwind(|| ConfigBuilder::new().with_flash_latency(1).check());
    assert!(result.is_err());
}

#[test]
fn check_rejects_wrong_usb_divider() {
    let result = catch_unwind(|| {
        ConfigBuilder::new()
            .with_pll(Pll {
                source: PllSource::Hse,
                prediv: 4,
                mul: 72,
                sysdiv: PllSysDiv::Div2,
                usbdiv: 4,
            })
            .check()
    });
    assert!(result.is_err());

    // the same divider is fine once USB is not requested
    ConfigBuilder::new()
        .with_pll(Pll {
            source: PllSource::Hse,
            prediv: 4,
            mul: 72,
            sysdiv: PllSysDiv::Div2,
            usbdiv: 4,
        })
        .with_usb(false)
        .check();
}

#[test]
fn check_rejects_missing_hse() {
    let mut builder = ConfigBuilder::new();
    builder.hse = None;
    let result = catch_unwind(move || builder.check());
    assert!(result.is_err());
}
