pub mod dispatcher;
pub mod events;

pub use dispatcher::DispatchError;
