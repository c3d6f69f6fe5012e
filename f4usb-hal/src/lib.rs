#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod rcc;
pub mod time;
pub mod usbd;

use core::sync::atomic::{AtomicBool, Ordering};

/// Firmware configuration passed when initializing.
pub mod config {
    use crate::rcc;

    /// Firmware configuration passed when initializing.
    #[non_exhaustive]
    pub struct Config {
        pub rcc: rcc::Config,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                rcc: rcc::Config::default(),
            }
        }
    }
}
pub use config::Config;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Bring the device from its reset state to the configured clock tree.
///
/// Runs the full clock bring-up sequence on the memory-mapped register
/// bank and records the resulting frequencies for [`rcc::clocks()`].
/// Peripheral initialization must wait until this returns: bus clocks are
/// not at their final frequency before then.
///
/// Returns the register bank, for auxiliary configuration such as
/// [`rcc::configure_mco`].
///
/// # Panics
///
/// Panics if called more than once.
pub fn init(config: Config) -> rcc::Mmio {
    assert!(
        !INITIALIZED.swap(true, Ordering::AcqRel),
        "init called more than once"
    );

    // Sole owner: the flag above guarantees no second bank exists.
    let mut bank = unsafe { rcc::Mmio::take() };
    rcc::init(&mut bank, config.rcc);
    bank
}
