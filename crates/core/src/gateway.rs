//! Outbound seams the core drives but does not implement

use crate::events::ServerEvent;
use crate::models::ConnectionId;
use crate::presence::GraceTimers;

/// Message delivery, provided by the transport
pub trait Gateway {
    /// Deliver to one connection
    fn send(&mut self, conn: ConnectionId, event: ServerEvent);

    /// Deliver to every connection subscribed to `room`
    fn broadcast(&mut self, room: &str, event: ServerEvent);

    fn subscribe(&mut self, conn: ConnectionId, room: &str);

    fn unsubscribe(&mut self, conn: ConnectionId, room: &str);
}

/// Everything a handler may touch outside the core
pub trait Effects: Gateway + GraceTimers {}

impl<T: Gateway + GraceTimers> Effects for T {}
