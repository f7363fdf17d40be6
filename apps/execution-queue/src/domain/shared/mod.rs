//! Shared kernel - value objects used across domain areas.

mod value_objects;

pub use value_objects::{JobId, OrderClass, OrderSide, OrderType, Symbol, TimeInForce};
