//! Reset-to-run clock bring-up.
//!
//! The sequencer is generic over [`RegisterBank`] so it can run against a
//! simulated bank on the host; firmware binds it to the memory-mapped
//! registers with [`Mmio`].

mod clock;
mod clock_config;
mod mmio;
pub mod regs;
#[cfg(test)]
mod tests;

pub use clock::*;
pub use clock_config::{configure_clock, configure_mco, Config, ConfigBuilder};
pub use mmio::Mmio;

use regs::Register;

/// Raw access to the clock-control register network.
///
/// One implementor owns the oscillator, PLL, prescaler, flash wait-state,
/// and MCO pin registers for the duration of bring-up.
pub trait RegisterBank {
    fn read(&self, reg: Register) -> u32;

    fn write(&mut self, reg: Register, value: u32);

    /// Replace the masked bits of `reg` in one read-modify-write
    /// transaction.
    fn modify(&mut self, reg: Register, mask: u32, bits: u32) {
        let word = self.read(reg);
        self.write(reg, (word & !mask) | (bits & mask));
    }
}

/// Run the bring-up sequence and record the resulting frequencies.
pub(crate) fn init<B: RegisterBank>(bank: &mut B, config: Config) {
    configure_clock(bank, &config);

    let freqs = config.clock_freqs();
    debug!(
        "rcc: sysclk {} Hz, hclk {} Hz, pclk1 {} Hz",
        freqs.sysclk.0, freqs.hclk.0, freqs.pclk1.0
    );
    unsafe { set_freqs(freqs) };
}
