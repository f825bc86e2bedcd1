pub mod dispatcher;

pub use dispatcher::{dispatch_handler, Dispatcher};
