// Copyright 2026 the Atrium Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use log;

/// A generic, thread-safe event channel.
///
/// The bus is generic over the transported event type so this crate stays
/// decoupled from the event enums defined by higher-level crates. Senders and
/// receivers are cheap clones of the underlying flume endpoints; dropping the
/// bus itself does not close the channel while clones are alive.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a new bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Publishes an event.
    ///
    /// Returns `false` (after logging) if every receiver has been dropped;
    /// publishing is never an error the caller must handle.
    pub fn publish(&self, event: T) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("Event dropped: all receivers disconnected.");
                false
            }
        }
    }

    /// Returns a sender handle for producers elsewhere in the system.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a receiver handle. Each clone competes for events; use one
    /// receiver per consuming loop.
    pub fn subscribe(&self) -> flume::Receiver<T> {
        self.receiver.clone()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
