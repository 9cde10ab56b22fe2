//! Injected collaborators and the account session that ties storage to the
//! recurrence materializer.

pub mod clock;
pub mod ids;
pub mod session;
pub mod utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use session::{AccountSession, SessionLoad};
