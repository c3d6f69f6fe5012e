//! USB device firmware skeleton: clock bring-up to 72 MHz, then the
//! steady-state poll loop. The protocol stack behind `UsbStack` is a
//! placeholder here.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt::info;
use defmt_rtt as _;
use panic_probe as _;
use static_cell::StaticCell;

use f4usb_hal::rcc::{self, ConfigBuilder};
use f4usb_hal::usbd::{UsbHandle, UsbService, UsbStack, OUT_BUFFER_WORDS};

static OUT_BUFFER: StaticCell<[u32; OUT_BUFFER_WORDS]> = StaticCell::new();

/// Stand-in for the real protocol stack.
struct NullStack;

impl UsbStack for NullStack {
    fn initialize(&mut self, _handle: &mut UsbHandle<'_>) {
        info!("usb stack initialized");
    }

    fn poll(&mut self) {}
}

#[entry]
fn main() -> ! {
    let mut config = f4usb_hal::Config::default();
    // 72 MHz from the 8 MHz crystal, validated at compile time
    config.rcc = const { ConfigBuilder::new().checked() };
    f4usb_hal::init(config);

    info!("clock configuration complete");
    let clocks = rcc::clocks();
    info!("sysclk {} Hz, pclk1 {} Hz", clocks.sysclk.0, clocks.pclk1.0);

    let service = UsbService::new(NullStack, OUT_BUFFER.init([0; OUT_BUFFER_WORDS]));
    service.run()
}
