pub mod body;
pub mod encoder;
pub mod session;

pub use encoder::{StreamEncoder, PART_OVERHEAD, STREAM_CONTENT_TYPE};
pub use session::{PullOutcome, SessionState, StreamSession};
