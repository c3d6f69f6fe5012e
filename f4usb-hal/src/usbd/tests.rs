use std::cell::RefCell;
use std::rc::Rc;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Initialize,
    Poll,
}

/// Records the calls the service makes, in order.
struct ScriptedStack {
    events: Rc<RefCell<Vec<Event>>>,
}

impl UsbStack for ScriptedStack {
    fn initialize(&mut self, handle: &mut UsbHandle<'_>) {
        // prove the handle carries the caller's buffer
        handle.out_buffer()[0] = 0xdead_beef;
        self.events.borrow_mut().push(Event::Initialize);
    }

    fn poll(&mut self) {
        self.events.borrow_mut().push(Event::Poll);
    }
}

#[test]
fn initialize_runs_once_before_any_poll() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut buffer = [0u32; OUT_BUFFER_WORDS];
    let mut service = UsbService::new(
        ScriptedStack {
            events: events.clone(),
        },
        &mut buffer,
    );

    service.start();
    for _ in 0..64 {
        service.tick();
    }

    let events = events.borrow();
    assert_eq!(events[0], Event::Initialize);
    assert_eq!(
        events.iter().filter(|e| **e == Event::Initialize).count(),
        1
    );
    assert_eq!(events.iter().filter(|e| **e == Event::Poll).count(), 64);
}

#[test]
fn stack_writes_land_in_the_working_buffer() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut buffer = [0u32; OUT_BUFFER_WORDS];

    {
        let mut service = UsbService::new(ScriptedStack { events }, &mut buffer);
        service.start();
        service.tick();
    }

    assert_eq!(buffer[0], 0xdead_beef);
}
