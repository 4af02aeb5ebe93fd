//! Event delivery

use std::sync::mpsc::Sender;

use tracing::debug;

use crate::connector::DispatchEvent;

/// Receiver of connector events
pub trait EventSink {
    fn emit(&mut self, event: DispatchEvent);
}

impl<F> EventSink for F
where
    F: FnMut(DispatchEvent),
{
    fn emit(&mut self, event: DispatchEvent) {
        self(event)
    }
}

impl EventSink for Vec<DispatchEvent> {
    fn emit(&mut self, event: DispatchEvent) {
        self.push(event);
    }
}

impl EventSink for Sender<DispatchEvent> {
    fn emit(&mut self, event: DispatchEvent) {
        if self.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}
