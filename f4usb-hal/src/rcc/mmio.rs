//! Production register bank: volatile access to the memory-mapped
//! peripheral addresses.

use super::regs::Register;
use super::RegisterBank;

const RCC_BASE: usize = 0x4002_3800;
const FLASH_BASE: usize = 0x4002_3c00;
const GPIOA_BASE: usize = 0x4002_0000;

/// The real register bank.
///
/// Zero-sized; every access is a volatile read or write at the fixed
/// peripheral address.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// The caller must be the sole owner of the clock, flash and GPIOA
    /// control registers while this value lives: a concurrent writer
    /// (another `Mmio`, or an interrupt handler) breaks the
    /// read-modify-write transactions.
    pub unsafe fn take() -> Self {
        Self { _private: () }
    }

    fn address(reg: Register) -> *mut u32 {
        let addr = match reg {
            Register::Cr => RCC_BASE,
            Register::Pllcfgr => RCC_BASE + 0x04,
            Register::Cfgr => RCC_BASE + 0x08,
            Register::Ahb1enr => RCC_BASE + 0x30,
            Register::FlashAcr => FLASH_BASE,
            Register::GpioaModer => GPIOA_BASE,
            Register::GpioaOspeedr => GPIOA_BASE + 0x08,
        };
        addr as *mut u32
    }
}

impl RegisterBank for Mmio {
    fn read(&self, reg: Register) -> u32 {
        unsafe { Self::address(reg).read_volatile() }
    }

    fn write(&mut self, reg: Register, value: u32) {
        unsafe { Self::address(reg).write_volatile(value) }
    }
}
