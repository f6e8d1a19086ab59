// The host-provided byte pipe. `TransportDriver` never touches a socket
// directly -- it drives a `RawChannel` impl through open/send/close/poll and
// layers status tracking, heartbeat and backoff on top. `LoopbackChannel` is
// an in-memory pair for tests and the demo binary, in the spirit of
// submerge-net's VecDeque-backed IOQueues.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use nmeshed_base::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum RawEvent {
    Opened,
    Bytes(Vec<u8>),
    Closed { code: u16 },
}

pub trait RawChannel {
    fn open(&mut self, url: &str) -> Result<(), Error>;
    fn send(&mut self, bytes: &[u8]) -> Result<(), Error>;
    fn close(&mut self, code: u16);
    fn poll(&mut self) -> Option<RawEvent>;
}

type Queue = Rc<RefCell<VecDeque<Vec<u8>>>>;

pub struct LoopbackChannel {
    outgoing: Queue,
    incoming: Queue,
    opened: bool,
    just_opened: bool,
}

impl LoopbackChannel {
    pub fn pair() -> (LoopbackChannel, LoopbackChannel) {
        let a_to_b: Queue = Rc::new(RefCell::new(VecDeque::new()));
        let b_to_a: Queue = Rc::new(RefCell::new(VecDeque::new()));
        (
            LoopbackChannel {
                outgoing: a_to_b.clone(),
                incoming: b_to_a.clone(),
                opened: false,
                just_opened: false,
            },
            LoopbackChannel {
                outgoing: b_to_a,
                incoming: a_to_b,
                opened: false,
                just_opened: false,
            },
        )
    }
}

impl RawChannel for LoopbackChannel {
    fn open(&mut self, _url: &str) -> Result<(), Error> {
        self.opened = true;
        self.just_opened = true;
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if !self.opened {
            return Err(nmeshed_base::err("channel not open"));
        }
        self.outgoing.borrow_mut().push_back(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self, _code: u16) {
        self.opened = false;
    }

    fn poll(&mut self) -> Option<RawEvent> {
        if self.just_opened {
            self.just_opened = false;
            return Some(RawEvent::Opened);
        }
        self.incoming.borrow_mut().pop_front().map(RawEvent::Bytes)
    }
}
