//! Order router adapters.

mod passthrough;

pub use passthrough::PassthroughOrderRouter;
