mod frame_view;
pub mod player_app;
pub mod scrub_app;

use std::cell::RefCell;
use std::rc::Rc;

pub use player_app::PlayerApp;
pub use scrub_app::ScrubApp;

use crate::scrubber::SessionEnd;

/// How the window's session ended, read back once the event loop returns.
pub type SharedOutcome = Rc<RefCell<Option<SessionEnd>>>;
