//! Register and bit-field map for the clock bring-up network.
//!
//! Every (register, field) pair the sequencer touches, as named
//! constants. Field encodings follow the STM32F4 reference manual; the
//! memory-mapped addresses live in [`super::Mmio`], and the reset values
//! below are what the simulated bank starts from.

/// Registers touched during clock bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// RCC clock control: oscillator and PLL enables with ready flags.
    Cr,
    /// RCC PLL configuration. Fields are writable only while the PLL is
    /// disabled.
    Pllcfgr,
    /// RCC clock configuration: system clock switch, prescalers, MCO1.
    Cfgr,
    /// RCC AHB1 peripheral clock enable.
    Ahb1enr,
    /// Flash access control: instruction wait states.
    FlashAcr,
    /// GPIOA pin mode (PA8 carries MCO1).
    GpioaModer,
    /// GPIOA output speed (PA8 carries MCO1).
    GpioaOspeedr,
}

/// One bit-field: its owning register, mask, and least-significant-bit
/// position.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub reg: Register,
    pub mask: u32,
    pub shift: u32,
}

impl Field {
    const fn new(reg: Register, mask: u32, shift: u32) -> Self {
        Self { reg, mask, shift }
    }

    /// Position a field value within its register word.
    pub const fn bits(self, value: u32) -> u32 {
        (value << self.shift) & self.mask
    }

    /// Extract this field's value from a register word.
    pub const fn of(self, word: u32) -> u32 {
        (word & self.mask) >> self.shift
    }
}

// RCC_CR
pub const HSION: Field = Field::new(Register::Cr, 1 << 0, 0);
pub const HSIRDY: Field = Field::new(Register::Cr, 1 << 1, 1);
pub const HSEON: Field = Field::new(Register::Cr, 1 << 16, 16);
pub const HSERDY: Field = Field::new(Register::Cr, 1 << 17, 17);
pub const PLLON: Field = Field::new(Register::Cr, 1 << 24, 24);
pub const PLLRDY: Field = Field::new(Register::Cr, 1 << 25, 25);

// RCC_PLLCFGR
pub const PLLM: Field = Field::new(Register::Pllcfgr, 0x3f, 0);
pub const PLLN: Field = Field::new(Register::Pllcfgr, 0x1ff << 6, 6);
pub const PLLP: Field = Field::new(Register::Pllcfgr, 0x3 << 16, 16);
pub const PLLSRC: Field = Field::new(Register::Pllcfgr, 1 << 22, 22);
pub const PLLQ: Field = Field::new(Register::Pllcfgr, 0xf << 24, 24);

// RCC_CFGR
pub const SW: Field = Field::new(Register::Cfgr, 0x3, 0);
pub const SWS: Field = Field::new(Register::Cfgr, 0x3 << 2, 2);
pub const HPRE: Field = Field::new(Register::Cfgr, 0xf << 4, 4);
pub const PPRE1: Field = Field::new(Register::Cfgr, 0x7 << 10, 10);
pub const MCO1: Field = Field::new(Register::Cfgr, 0x3 << 21, 21);
pub const MCO1PRE: Field = Field::new(Register::Cfgr, 0x7 << 24, 24);

// RCC_AHB1ENR
pub const GPIOAEN: Field = Field::new(Register::Ahb1enr, 1 << 0, 0);

// FLASH_ACR
pub const LATENCY: Field = Field::new(Register::FlashAcr, 0xf, 0);

// GPIOA, PA8
pub const MODER8: Field = Field::new(Register::GpioaModer, 0x3 << 16, 16);
pub const OSPEEDR8: Field = Field::new(Register::GpioaOspeedr, 0x3 << 16, 16);

/// System clock switch encodings, shared by `SW` (request) and `SWS`
/// (effective source).
pub const SYSCLK_HSI: u32 = 0b00;
pub const SYSCLK_HSE: u32 = 0b01;
pub const SYSCLK_PLL: u32 = 0b10;

/// `PLLSRC` encodings.
pub const PLLSRC_HSI: u32 = 0;
pub const PLLSRC_HSE: u32 = 1;

/// GPIO `MODERx` / `OSPEEDRx` encodings used for the MCO1 pin.
pub const GPIO_MODE_ALTERNATE: u32 = 0b10;
pub const GPIO_SPEED_MEDIUM: u32 = 0b01;

/// Reset values. HSI is on and already stable out of reset; everything
/// else is off.
pub const CR_RESET: u32 = 0x0000_0083;
pub const PLLCFGR_RESET: u32 = 0x2400_3010;
pub const CFGR_RESET: u32 = 0x0000_0000;
