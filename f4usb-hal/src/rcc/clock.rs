//! Clock types, constants, and global state.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::time::Hertz;

// =============================================================================
// Global Clock State
// =============================================================================

/// Whether `CLOCK_FREQS` has been initialized by `set_freqs()`.
static CLOCK_FREQS_INIT: AtomicBool = AtomicBool::new(false);

/// Frequencies recorded at the end of bring-up. Never mutated afterward.
static mut CLOCK_FREQS: Clocks = Clocks::ZERO;

/// Sets the clock frequencies.
///
/// Safety: sets a mutable global; single execution context only.
pub(crate) unsafe fn set_freqs(freqs: Clocks) {
    unsafe { CLOCK_FREQS = freqs };
    CLOCK_FREQS_INIT.store(true, Ordering::Release);
}

/// Get the clock configuration recorded by `init()`.
///
/// # Panics
///
/// Panics if called before `init()`.
pub fn clocks() -> &'static Clocks {
    assert!(
        CLOCK_FREQS_INIT.load(Ordering::Acquire),
        "rcc: clocks() called before init()"
    );
    unsafe { &*core::ptr::addr_of!(CLOCK_FREQS) }
}

// =============================================================================
// Constants
// =============================================================================

/// Internal RC oscillator, the reset-default system clock.
pub const HSI_FREQ: Hertz = Hertz(16_000_000);

/// The frequency the USB peripheral requires on the PLL's Q output.
pub const USB_FREQ: Hertz = Hertz(48_000_000);

// =============================================================================
// PLL / prescaler types
// =============================================================================

/// Input the PLL multiplies: the internal RC oscillator or the external
/// crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllSource {
    Hsi,
    Hse,
}

impl PllSource {
    pub(crate) const fn to_bits(self) -> u32 {
        match self {
            PllSource::Hsi => super::regs::PLLSRC_HSI,
            PllSource::Hse => super::regs::PLLSRC_HSE,
        }
    }
}

/// PLL system-clock output divider (PLLP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllSysDiv {
    Div2 = 0b00,
    Div4 = 0b01,
    Div6 = 0b10,
    Div8 = 0b11,
}

impl PllSysDiv {
    pub(crate) const fn to_bits(self) -> u32 {
        self as u32
    }

    pub(crate) const fn divisor(self) -> u32 {
        (self as u32 + 1) * 2
    }
}

/// Main PLL settings.
///
/// All fields land in `PLLCFGR`, which hardware only accepts while the
/// PLL is disabled. `sysclk = source / prediv * mul / sysdiv`; the Q
/// output `source / prediv * mul / usbdiv` feeds USB and must be 48 MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pll {
    pub source: PllSource,
    /// Input divider M, 2..=63. Input must land in 1..=2 MHz.
    pub prediv: u8,
    /// Multiplier N, 50..=432. VCO output must land in 100..=432 MHz.
    pub mul: u16,
    /// System clock divider P.
    pub sysdiv: PllSysDiv,
    /// USB clock divider Q, 2..=15.
    pub usbdiv: u8,
}

/// AHB prescaler (HPRE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AhbPrescaler {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
    Div64,
    Div128,
    Div256,
    Div512,
}

impl AhbPrescaler {
    pub(crate) const fn to_bits(self) -> u32 {
        match self {
            AhbPrescaler::Div1 => 0b0000,
            AhbPrescaler::Div2 => 0b1000,
            AhbPrescaler::Div4 => 0b1001,
            AhbPrescaler::Div8 => 0b1010,
            AhbPrescaler::Div16 => 0b1011,
            AhbPrescaler::Div64 => 0b1100,
            AhbPrescaler::Div128 => 0b1101,
            AhbPrescaler::Div256 => 0b1110,
            AhbPrescaler::Div512 => 0b1111,
        }
    }

    pub(crate) const fn divisor(self) -> u32 {
        match self {
            AhbPrescaler::Div1 => 1,
            AhbPrescaler::Div2 => 2,
            AhbPrescaler::Div4 => 4,
            AhbPrescaler::Div8 => 8,
            AhbPrescaler::Div16 => 16,
            AhbPrescaler::Div64 => 64,
            AhbPrescaler::Div128 => 128,
            AhbPrescaler::Div256 => 256,
            AhbPrescaler::Div512 => 512,
        }
    }
}

/// APB1 prescaler (PPRE1). APB1 is the low-speed peripheral bus and must
/// stay at or below 42 MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApbPrescaler {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
}

impl ApbPrescaler {
    pub(crate) const fn to_bits(self) -> u32 {
        match self {
            ApbPrescaler::Div1 => 0b000,
            ApbPrescaler::Div2 => 0b100,
            ApbPrescaler::Div4 => 0b101,
            ApbPrescaler::Div8 => 0b110,
            ApbPrescaler::Div16 => 0b111,
        }
    }

    pub(crate) const fn divisor(self) -> u32 {
        match self {
            ApbPrescaler::Div1 => 1,
            ApbPrescaler::Div2 => 2,
            ApbPrescaler::Div4 => 4,
            ApbPrescaler::Div8 => 8,
            ApbPrescaler::Div16 => 16,
        }
    }
}

// =============================================================================
// MCO (debug clock output)
// =============================================================================

/// Clock routed to the MCO1 pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum McoSource {
    Hsi = 0b00,
    Lse = 0b01,
    Hse = 0b10,
    Pll = 0b11,
}

/// MCO1 output divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum McoPrescaler {
    Div1 = 0b000,
    Div2 = 0b100,
    Div3 = 0b101,
    Div4 = 0b110,
    Div5 = 0b111,
}

/// Debug clock output on PA8. Cosmetic: scope aid only, no effect on the
/// rest of the clock tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct McoConfig {
    pub source: McoSource,
    pub prescaler: McoPrescaler,
}

impl Default for McoConfig {
    fn default() -> Self {
        Self {
            source: McoSource::Pll,
            prescaler: McoPrescaler::Div2,
        }
    }
}

// =============================================================================
// Clocks struct
// =============================================================================

/// Clock frequencies after bring-up.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    pub sysclk: Hertz,
    // AHB
    pub hclk: Hertz,
    // APB1
    pub pclk1: Hertz,
    /// PLL Q output (None when USB is not configured).
    pub clk48: Option<Hertz>,
}

impl Clocks {
    const ZERO: Self = Self {
        sysclk: Hertz(0),
        hclk: Hertz(0),
        pclk1: Hertz(0),
        clk48: None,
    };
}
