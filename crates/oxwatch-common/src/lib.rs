//! Shared vocabulary for the oxwatch engine crates.
//!
//! Object identity, host/service state values, notification types and
//! option masks live in [`types`]. The contracts the engine expects from
//! its surroundings (timer queue, comment store, time periods) live in
//! [`traits`]. Offsets from user input are added with [`time::add_secs`].

pub mod time;
pub mod traits;
pub mod types;


use types::ObjectKey;

/// The capability every monitored object exposes to the generic engine code.
///
/// Hosts and services implement this directly; the downtime and
/// notification crates extend it with their own capability traits.
pub trait Checkable {
    /// The unique key identifying this object.
    fn key(&self) -> &ObjectKey;

    /// Whether the current state is the "OK"/"UP" value.
    fn is_ok(&self) -> bool;

    fn is_host(&self) -> bool {
        self.key().is_host()
    }
}
