// Exercises a full two-participant session over an in-process loopback
// transport: connects both sides, lets them race writes to the same key,
// and prints the converged state once both queues drain.

use std::rc::Rc;

use nmeshed::{Config, FixedJitter, LoopbackChannel, MemoryStore, PersistentStore, WallClock, Workspace};
use nmeshed_base::FakeClock;

fn print_state(label: &str, ws: &Workspace<LoopbackChannel, FixedJitter>) {
    println!("{label}: title = {:?}", ws.get("doc:1/title").map(|b| String::from_utf8_lossy(&b).into_owned()));
}

fn main() {
    let wall: Rc<dyn WallClock> = Rc::new(FakeClock::new(1_000));
    let (chan_a, chan_b) = LoopbackChannel::pair();

    let store_a: Rc<dyn PersistentStore> = Rc::new(MemoryStore::new());
    let store_b: Rc<dyn PersistentStore> = Rc::new(MemoryStore::new());

    let mut alice = Workspace::new(
        Config::new("demo-workspace", "demo-token").with_participant_id("alice"),
        store_a,
        wall.clone(),
        chan_a,
        FixedJitter(0.5),
    )
    .expect("valid config");

    let mut bob = Workspace::new(
        Config::new("demo-workspace", "demo-token").with_participant_id("bob"),
        store_b,
        wall.clone(),
        chan_b,
        FixedJitter(0.5),
    )
    .expect("valid config");

    alice.connect(0).expect("connect");
    bob.connect(0).expect("connect");

    for now in 0..5 {
        alice.tick(now).expect("tick");
        bob.tick(now).expect("tick");
    }

    alice.set("doc:1/title", Some(b"Alice's draft".to_vec())).unwrap();
    bob.set("doc:1/title", Some(b"Bob's draft".to_vec())).unwrap();

    for now in 5..15 {
        alice.tick(now).expect("tick");
        bob.tick(now).expect("tick");
    }

    print_state("alice", &alice);
    print_state("bob", &bob);

    alice.destroy();
    bob.destroy();
}
