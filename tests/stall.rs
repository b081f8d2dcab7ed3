mod util;

use specpoll::{Direction, NoExternalActivity, Poller, PollerConfig};
use std::cell::Cell;
use std::rc::Rc;

/// S3: a callback that simulates `EAGAIN` moves its direction from ACTIVE to
/// POLLED; the next tick's kernel wait picks it up once it actually becomes
/// writable.
#[test]
fn stalled_write_transitions_from_active_to_polled() {
    util::init();
    let (read_fd, write_fd) = util::nonblocking_pipe();
    let mut poller = Poller::init(PollerConfig::default()).unwrap();

    let calls = Rc::new(Cell::new(0u32));
    let calls_cb = Rc::clone(&calls);
    poller
        .register(write_fd, move |p: &mut Poller, fd| {
            calls_cb.set(calls_cb.get() + 1);
            p.set_polled(fd, Direction::Write);
        })
        .unwrap();
    poller.set_active(write_fd, Direction::Write);

    // First tick: driven speculatively; the callback downgrades to POLLED_W.
    poller.poll(1, &NoExternalActivity).unwrap();
    assert!(poller.is_set(write_fd, Direction::Write));
    assert_eq!(calls.get(), 1);

    // Second tick: the pipe's write end is writable, so the kernel reports
    // it without this crate ever re-marking it ACTIVE.
    let stats = poller.poll(1, &NoExternalActivity).unwrap();
    assert_eq!(stats.events_dispatched, 1);
    assert_eq!(calls.get(), 2);

    util::close_fd(read_fd);
    util::close_fd(write_fd);
}
