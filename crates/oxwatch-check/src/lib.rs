//! Monitored hosts and services.
//!
//! A [`Host`] or [`Service`] is composed of a [`CheckState`], an
//! [`Acknowledgement`], the downtime counters from `oxwatch-downtime` and
//! the notification state from `oxwatch-notify`. It implements the
//! capability traits those crates need, so the generic engine code never
//! has to know which kind of object it works on.

pub mod acknowledgement;
pub mod check_state;
pub mod object;
pub mod registry;


pub use acknowledgement::Acknowledgement;
pub use check_state::{CheckState, StateTransition};
pub use object::{Host, MonitoredObject, Service};
pub use registry::ObjectRegistry;
