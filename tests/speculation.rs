mod util;

use specpoll::{Direction, NoExternalActivity, Poller, PollerConfig};
use std::cell::Cell;
use std::rc::Rc;

/// S2: an fd that is only ACTIVE (never POLLED) is driven through the
/// SpecList on its own, with no kernel event involved at all.
#[test]
fn active_fd_is_driven_without_kernel_event() {
    util::init();
    let (read_fd, write_fd) = util::nonblocking_pipe();
    let mut poller = Poller::init(PollerConfig::default()).unwrap();

    let invoked = Rc::new(Cell::new(false));
    let invoked_cb = Rc::clone(&invoked);
    poller
        .register(read_fd, move |_p: &mut Poller, _fd| {
            invoked_cb.set(true);
        })
        .unwrap();
    poller.set_active(read_fd, Direction::Read);

    let stats = poller.poll(1, &NoExternalActivity).unwrap();

    assert_eq!(
        stats.events_dispatched, 0,
        "nothing was written to the pipe, the kernel has nothing to report"
    );
    assert!(
        invoked.get(),
        "the SpecList drive must run the callback speculatively"
    );

    util::close_fd(read_fd);
    util::close_fd(write_fd);
}
