pub use orientation::Orientation;
pub use trail::OrientationTrail;

mod orientation;
mod trail;

use std::cell::RefCell;
use std::rc::Rc;

/// An orientation shared between animations within the single-threaded
/// frame loop. The timeline's prepare pass collapses each shared value
/// exactly once per tick before any animation steps.
pub type SharedOrientation = Rc<RefCell<Orientation>>;

pub fn shared_orientation() -> SharedOrientation {
    Rc::new(RefCell::new(Orientation::new()))
}
