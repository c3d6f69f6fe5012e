//! Device bring-up and the steady-state service loop.
//!
//! The USB protocol stack itself is an external collaborator behind
//! [`UsbStack`]; this module owns the working buffer and the handle,
//! initializes the stack exactly once, and then hands it non-blocking
//! poll ticks forever.

#[cfg(test)]
mod tests;

/// Size of the endpoint working buffer, in words.
pub const OUT_BUFFER_WORDS: usize = 8;

/// Handle handed to the device stack.
///
/// Carries the reference to the working buffer for data exchange. The
/// buffer itself lives in the caller — a static in firmware — and
/// outlives every stack operation.
pub struct UsbHandle<'d> {
    out_buffer: &'d mut [u32; OUT_BUFFER_WORDS],
}

impl<'d> UsbHandle<'d> {
    pub fn new(out_buffer: &'d mut [u32; OUT_BUFFER_WORDS]) -> Self {
        Self { out_buffer }
    }

    /// The working buffer, for the stack's data exchange.
    pub fn out_buffer(&mut self) -> &mut [u32; OUT_BUFFER_WORDS] {
        self.out_buffer
    }
}

/// The externally-implemented USB device stack.
///
/// `initialize` has no error value: a stack that cannot come up halts or
/// signals fault through its own mechanism. `poll` is one cooperative
/// service tick — it must be cheap and non-blocking, because it is called
/// from a tight loop.
pub trait UsbStack {
    fn initialize(&mut self, handle: &mut UsbHandle<'_>);

    fn poll(&mut self);
}

/// One-time device bring-up plus the unbounded poll loop.
pub struct UsbService<'d, S: UsbStack> {
    stack: S,
    handle: UsbHandle<'d>,
}

impl<'d, S: UsbStack> UsbService<'d, S> {
    /// Bind the working buffer to a new service around `stack`.
    pub fn new(stack: S, out_buffer: &'d mut [u32; OUT_BUFFER_WORDS]) -> Self {
        Self {
            stack,
            handle: UsbHandle::new(out_buffer),
        }
    }

    /// Initialize the device stack. Call once, after clock bring-up.
    pub fn start(&mut self) {
        info!("usbd: program entry");
        self.stack.initialize(&mut self.handle);
    }

    /// One cooperative service tick.
    pub fn tick(&mut self) {
        self.stack.poll();
    }

    /// Initialize, then poll forever.
    ///
    /// Never returns; power-off is the only exit.
    pub fn run(mut self) -> ! {
        self.start();
        loop {
            self.tick();
        }
    }
}
