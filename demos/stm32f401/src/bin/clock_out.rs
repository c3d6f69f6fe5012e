//! Routes the PLL output to PA8 (MCO1) so the 72 MHz bring-up can be
//! checked with a scope: expect 36 MHz on the pin with the /2 prescaler.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt::info;
use defmt_rtt as _;
use panic_probe as _;

use f4usb_hal::rcc::{self, McoConfig};

#[entry]
fn main() -> ! {
    let mut bank = f4usb_hal::init(Default::default());

    rcc::configure_mco(&mut bank, &McoConfig::default());
    info!("PLL/2 on PA8");

    loop {
        cortex_m::asm::nop();
    }
}
