pub mod clock;
pub mod dispatcher;
pub mod messages;
pub mod stdio;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dispatcher::{failure_response, ExportService, ServiceSettings};
pub use messages::{Ack, Request, Response, StatusReport};
pub use stdio::MessageBus;
