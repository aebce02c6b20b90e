//! Application core boundary.
//!
//! [`ports`] declares every trait the domain consumes; [`events`] is the
//! vocabulary the domain uses to talk to the remote collector.  Nothing in
//! here touches hardware.

pub mod events;
pub mod ports;
