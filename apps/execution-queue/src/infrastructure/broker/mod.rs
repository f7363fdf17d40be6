//! Broker adapters.

mod mock;

pub use mock::MockBrokerGateway;
