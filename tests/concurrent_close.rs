mod util;

use specpoll::{Direction, NoExternalActivity, Poller, PollerConfig};
use std::cell::Cell;
use std::rc::Rc;

/// S5: a fd closed mid-tick by an earlier callback must never be dispatched
/// later in that same tick. Kernel-event dispatch always completes before
/// the SpecList drive begins, so closing a SpecList-only fd from within the
/// kernel-event phase deterministically pre-empts it.
#[test]
fn fd_closed_before_its_turn_is_never_dispatched() {
    util::init();
    let mut poller = Poller::init(PollerConfig::default()).unwrap();
    let (read_a, write_a) = util::nonblocking_pipe();
    let (read_b, write_b) = util::nonblocking_pipe();

    let b_invoked = Rc::new(Cell::new(false));
    let b_invoked_cb = Rc::clone(&b_invoked);

    poller
        .register(read_b, move |_p: &mut Poller, _fd| {
            b_invoked_cb.set(true);
        })
        .unwrap();
    // fd B only carries ACTIVE interest, so it is driven by the SpecList
    // phase, strictly after the kernel-event phase below.
    poller.set_active(read_b, Direction::Read);

    poller
        .register(read_a, move |p: &mut Poller, fd| {
            let _ = util::try_read_byte(fd);
            p.close_notify(read_b);
        })
        .unwrap();
    poller.set_polled(read_a, Direction::Read);

    util::write_byte(write_a, b'x');

    poller.poll(1, &NoExternalActivity).unwrap();

    assert!(!b_invoked.get(), "fd closed mid-tick must not be dispatched");
    assert!(!poller.is_set(read_b, Direction::Read));

    util::close_fd(read_a);
    util::close_fd(write_a);
    util::close_fd(read_b);
    util::close_fd(write_b);
}
