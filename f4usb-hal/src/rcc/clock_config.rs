//! Clock configuration and the ordered bring-up sequence.

use super::regs::{self, Field, Register};
use super::{
    AhbPrescaler, ApbPrescaler, Clocks, McoConfig, Pll, PllSource, PllSysDiv, RegisterBank,
    HSI_FREQ, USB_FREQ,
};
use crate::time::Hertz;

/// Clock configuration.
///
/// Defaults are the 72 MHz USB profile from the 8 MHz crystal:
/// - SYSCLK = 8 MHz / 4 * 72 / 2 = 72 MHz, 2 flash wait states
/// - HCLK = 72 MHz (AHB /1)
/// - PCLK1 = 36 MHz (APB1 /2)
/// - CLK48 = 144 MHz VCO / 3 = 48 MHz for USB
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    /// External crystal frequency, when one is fitted.
    pub hse: Option<Hertz>,
    /// Main PLL settings.
    pub pll: Pll,
    /// AHB prescaler
    pub ahb_pre: AhbPrescaler,
    /// APB1 prescaler
    pub apb1_pre: ApbPrescaler,
    /// Flash wait states for the target HCLK.
    pub flash_latency: u8,
    /// Whether the 48 MHz USB clock is required.
    ///
    /// When `true` (default), `check()` validates that the PLL Q output
    /// is exactly 48 MHz.
    pub usb: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub const fn new() -> Self {
        Self {
            hse: Some(Hertz(8_000_000)),
            pll: Pll {
                source: PllSource::Hse,
                prediv: 4,
                mul: 72,
                sysdiv: PllSysDiv::Div2,
                usbdiv: 3,
            },
            ahb_pre: AhbPrescaler::Div1,
            apb1_pre: ApbPrescaler::Div2,
            flash_latency: 2,
            usb: true,
        }
    }

    pub const fn with_hse(mut self, hse: Hertz) -> Self {
        self.hse = Some(hse);
        self
    }

    pub const fn with_pll(mut self, pll: Pll) -> Self {
        self.pll = pll;
        self
    }

    pub const fn with_ahb_pre(mut self, ahb_pre: AhbPrescaler) -> Self {
        self.ahb_pre = ahb_pre;
        self
    }

    pub const fn with_apb1_pre(mut self, apb1_pre: ApbPrescaler) -> Self {
        self.apb1_pre = apb1_pre;
        self
    }

    pub const fn with_flash_latency(mut self, flash_latency: u8) -> Self {
        self.flash_latency = flash_latency;
        self
    }

    pub const fn with_usb(mut self, usb: bool) -> Self {
        self.usb = usb;
        self
    }

    /// Validate the clock configuration.
    ///
    /// Panics with a descriptive message if the configuration is invalid.
    /// Use inside `const { }` blocks to get compile-time errors.
    ///
    /// Note: Uses `::core::panic!` to bypass defmt's panic override,
    /// which is not const-compatible.
    pub const fn check(&self) {
        if matches!(self.pll.source, PllSource::Hse) && self.hse.is_none() {
            ::core::panic!("PLL source is set to HSE, but hse is None");
        }

        if self.pll.prediv < 2 || self.pll.prediv > 63 {
            ::core::panic!("PLLM outside its valid range (2..=63)");
        }
        if self.pll.mul < 50 || self.pll.mul > 432 {
            ::core::panic!("PLLN outside its valid range (50..=432)");
        }
        if self.pll.usbdiv < 2 || self.pll.usbdiv > 15 {
            ::core::panic!("PLLQ outside its valid range (2..=15)");
        }

        let input_hz = self.get_pll_input_freq_hz();
        if input_hz < 1_000_000 || input_hz > 2_000_000 {
            ::core::panic!("PLL input frequency outside 1-2 MHz, adjust PLLM");
        }

        let vco_hz = self.get_vco_freq_hz();
        if vco_hz < 100_000_000 || vco_hz > 432_000_000 {
            ::core::panic!("VCO frequency outside 100-432 MHz, adjust PLLN");
        }

        let sysclk_hz = self.get_sysclk_freq_hz();
        if sysclk_hz > 84_000_000 {
            ::core::panic!("sysclk frequency exceeds maximum limit (84 MHz)");
        }

        let hclk_hz = self.get_hclk_freq_hz();
        let pclk1_hz = hclk_hz / self.apb1_pre.divisor();
        if pclk1_hz > 42_000_000 {
            ::core::panic!("PCLK1 exceeds APB1 limit (42 MHz), increase apb1_pre");
        }

        // 30 MHz of HCLK per wait state (3.3 V supply range)
        if self.flash_latency > 7 {
            ::core::panic!("flash latency exceeds maximum value (7)");
        }
        if hclk_hz > 30_000_000 * (self.flash_latency as u32 + 1) {
            ::core::panic!("flash latency too low for HCLK, instruction fetch would fail");
        }

        if self.usb && vco_hz / self.pll.usbdiv as u32 != USB_FREQ.0 {
            ::core::panic!("PLL Q output is not exactly 48 MHz, USB timing would be invalid");
        }
    }

    /// Validate and return a [`Config`]. Use in `const { }` blocks for
    /// compile-time checking.
    ///
    /// ```rust,ignore
    /// const { rcc::ConfigBuilder::new().with_apb1_pre(ApbPrescaler::Div2).checked() }
    /// ```
    pub const fn checked(self) -> Config {
        self.check();
        Config(self)
    }

    pub(crate) const fn get_pll_input_freq_hz(&self) -> u32 {
        let source_hz = match self.pll.source {
            PllSource::Hsi => HSI_FREQ.0,
            PllSource::Hse => match self.hse {
                Some(hse) => hse.0,
                None => ::core::panic!("HSE frequency is not configured"),
            },
        };
        source_hz / self.pll.prediv as u32
    }

    pub(crate) const fn get_vco_freq_hz(&self) -> u32 {
        self.get_pll_input_freq_hz() * self.pll.mul as u32
    }

    pub(crate) const fn get_sysclk_freq_hz(&self) -> u32 {
        self.get_vco_freq_hz() / self.pll.sysdiv.divisor()
    }

    pub(crate) const fn get_hclk_freq_hz(&self) -> u32 {
        self.get_sysclk_freq_hz() / self.ahb_pre.divisor()
    }

    /// The frequencies this configuration produces once applied.
    pub(crate) const fn clock_freqs(&self) -> Clocks {
        let hclk = self.get_hclk_freq_hz();
        Clocks {
            sysclk: Hertz(self.get_sysclk_freq_hz()),
            hclk: Hertz(hclk),
            pclk1: Hertz(hclk / self.apb1_pre.divisor()),
            clk48: if self.usb {
                Some(Hertz(self.get_vco_freq_hz() / self.pll.usbdiv as u32))
            } else {
                None
            },
        }
    }
}

/// A validated clock configuration.
///
/// Can only be constructed via [`ConfigBuilder::checked()`], which
/// validates at compile time when used inside a `const { }` block.
#[derive(Debug, Clone, Copy)]
pub struct Config(pub(crate) ConfigBuilder);

impl Config {
    pub(crate) const fn clock_freqs(&self) -> Clocks {
        self.0.clock_freqs()
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::new().checked()
    }
}

// =============================================================================
// Bring-up sequence
// =============================================================================

/// Spin until `field` reads `expect`.
///
/// Unbounded on purpose: before clocks are stable there is no timer or
/// interrupt infrastructure to fall back on, and a status bit that never
/// asserts is an unrecoverable hardware fault. Hanging here is the safe
/// failure mode.
fn wait_for<B: RegisterBank>(bank: &B, field: Field, expect: u32) {
    while field.of(bank.read(field.reg)) != expect {}
}

fn set<B: RegisterBank>(bank: &mut B, field: Field, value: u32) {
    bank.modify(field.reg, field.mask, field.bits(value));
}

/// Switch the system clock away from the PLL so the PLL can be disabled
/// and reprogrammed.
///
/// No-op when the PLL is not the active source. Falls back to HSE when it
/// is already stable, HSI otherwise.
fn switch_away_from_pll<B: RegisterBank>(bank: &mut B) {
    if regs::SWS.of(bank.read(Register::Cfgr)) != regs::SYSCLK_PLL {
        return;
    }
    let fallback = if regs::HSERDY.of(bank.read(Register::Cr)) != 0 {
        regs::SYSCLK_HSE
    } else {
        regs::SYSCLK_HSI
    };
    set(bank, regs::SW, fallback);
    wait_for(bank, regs::SWS, fallback);
}

/// Bring the system clock from its current state to the configured PLL
/// output.
///
/// The order below is the correctness contract; every wait is a blocking
/// spin on the hardware status bit:
///
/// 1. flash wait states for the target frequency, before raising it
/// 2. external reference on, wait stable
/// 3. PLL off (switching the system clock away first if needed), then all
///    PLL fields in one transaction — they are writable only while the
///    PLL is disabled
/// 4. PLL on, wait stable
/// 5. bus prescalers, then the system clock switch request
/// 6. wait until the status field confirms the switch took effect
/// 7. default oscillator off, now that nothing uses it
pub fn configure_clock<B: RegisterBank>(bank: &mut B, config: &Config) {
    let config = &config.0;

    set(bank, regs::LATENCY, config.flash_latency as u32);

    if matches!(config.pll.source, PllSource::Hse) {
        set(bank, regs::HSEON, 1);
        wait_for(bank, regs::HSERDY, 1);
    }

    // Re-runs find the PLL enabled and selected; get off it before
    // touching its configuration.
    switch_away_from_pll(bank);
    set(bank, regs::PLLON, 0);

    let mask = regs::PLLM.mask | regs::PLLN.mask | regs::PLLP.mask | regs::PLLQ.mask
        | regs::PLLSRC.mask;
    let bits = regs::PLLM.bits(config.pll.prediv as u32)
        | regs::PLLN.bits(config.pll.mul as u32)
        | regs::PLLP.bits(config.pll.sysdiv.to_bits())
        | regs::PLLQ.bits(config.pll.usbdiv as u32)
        | regs::PLLSRC.bits(config.pll.source.to_bits());
    bank.modify(Register::Pllcfgr, mask, bits);

    set(bank, regs::PLLON, 1);
    wait_for(bank, regs::PLLRDY, 1);

    // Prescalers before the switch, so APB1 never sees more than its
    // rated maximum.
    set(bank, regs::HPRE, config.ahb_pre.to_bits());
    set(bank, regs::PPRE1, config.apb1_pre.to_bits());
    set(bank, regs::SW, regs::SYSCLK_PLL);

    // SW is only the request; SWS is the effective source.
    wait_for(bank, regs::SWS, regs::SYSCLK_PLL);

    if !matches!(config.pll.source, PllSource::Hsi) {
        set(bank, regs::HSION, 0);
    }

    debug!("rcc: system clock switched to PLL output");
}

/// Route a clock to the MCO1 pin (PA8) for scope debugging.
///
/// Independent of [`configure_clock`]: it touches only the MCO fields of
/// `CFGR` and the PA8 pin configuration. Output is meaningful once the
/// selected source is running.
pub fn configure_mco<B: RegisterBank>(bank: &mut B, mco: &McoConfig) {
    let mask = regs::MCO1.mask | regs::MCO1PRE.mask;
    let bits =
        regs::MCO1.bits(mco.source as u32) | regs::MCO1PRE.bits(mco.prescaler as u32);
    bank.modify(Register::Cfgr, mask, bits);

    // PA8 in alternate-function mode, medium speed
    set(bank, regs::GPIOAEN, 1);
    set(bank, regs::OSPEEDR8, regs::GPIO_SPEED_MEDIUM);
    set(bank, regs::MODER8, regs::GPIO_MODE_ALTERNATE);

    debug!("rcc: MCO1 enabled on PA8");
}
