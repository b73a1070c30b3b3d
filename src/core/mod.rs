pub mod error;
pub mod message;
pub mod queue;

pub use error::QueueError;
pub use message::Message;
pub use queue::QueueStore;
