//! One outstanding send per interface.
//!
//! Each interface has a slot that is either idle or carrying exactly one
//! packet. Submitting to a busy slot drops the packet; nothing is queued.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::link::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Sending,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("interface {0} is busy, packet dropped")]
    Busy(usize),
    #[error("no interface {0}")]
    NoInterface(usize),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SendStats {
    pub sent: u64,
    pub failed: u64,
    pub busy_drops: u64,
}

struct Shared {
    transport: Arc<dyn Transport>,
    slots: Vec<Mutex<SlotState>>,
    stats: Mutex<SendStats>,
}

/// Returns the slot to `Idle` however the send task ends.
struct SlotRelease {
    shared: Arc<Shared>,
    interface: usize,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        if let Some(slot) = self.shared.slots.get(self.interface) {
            *slot.lock() = SlotState::Idle;
        }
    }
}

pub struct SendScheduler {
    shared: Arc<Shared>,
}

impl SendScheduler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let slots = (0..transport.num_interfaces())
            .map(|_| Mutex::new(SlotState::Idle))
            .collect();
        Self {
            shared: Arc::new(Shared {
                transport,
                slots,
                stats: Mutex::new(SendStats::default()),
            }),
        }
    }

    /// Hand `packet` to the transport on `interface` in the background.
    ///
    /// Fails immediately with [`SubmitError::Busy`] if the interface is
    /// still sending an earlier packet. The returned handle resolves once
    /// the send has finished and the slot is idle again.
    pub fn submit(&self, interface: usize, packet: Vec<u8>) -> Result<JoinHandle<()>, SubmitError> {
        let slot = self
            .shared
            .slots
            .get(interface)
            .ok_or(SubmitError::NoInterface(interface))?;

        {
            let mut state = slot.lock();
            if *state == SlotState::Sending {
                self.shared.stats.lock().busy_drops += 1;
                log::debug!("Interface {} busy, dropping packet", interface);
                return Err(SubmitError::Busy(interface));
            }
            *state = SlotState::Sending;
        }

        let release = SlotRelease {
            shared: self.shared.clone(),
            interface,
        };

        Ok(tokio::spawn(async move {
            let shared = release.shared.clone();
            match shared.transport.send(interface, &packet).await {
                Ok(()) => shared.stats.lock().sent += 1,
                Err(e) => {
                    shared.stats.lock().failed += 1;
                    log::warn!("Send on interface {} failed: {}", interface, e);
                }
            }
            drop(release);
        }))
    }

    pub fn state(&self, interface: usize) -> Option<SlotState> {
        self.shared.slots.get(interface).map(|slot| *slot.lock())
    }

    pub fn stats(&self) -> SendStats {
        *self.shared.stats.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::MockTransport;
    use crate::link::Delivery;

    #[tokio::test]
    async fn second_submit_on_busy_interface_is_dropped() {
        let (transport, gate) = MockTransport::gated(2);
        let transport = Arc::new(transport);
        let scheduler = SendScheduler::new(transport.clone());

        let first = scheduler.submit(0, vec![1]).unwrap();
        assert_eq!(scheduler.state(0), Some(SlotState::Sending));
        assert!(matches!(
            scheduler.submit(0, vec![2]),
            Err(SubmitError::Busy(0))
        ));

        // Other interfaces have their own slot.
        let other = scheduler.submit(1, vec![3]).unwrap();

        gate.add_permits(2);
        first.await.unwrap();
        other.await.unwrap();

        assert_eq!(scheduler.state(0), Some(SlotState::Idle));
        assert_eq!(scheduler.state(1), Some(SlotState::Idle));
        assert_eq!(
            scheduler.stats(),
            SendStats {
                sent: 2,
                failed: 0,
                busy_drops: 1
            }
        );

        let mut sent = transport.sent();
        sent.sort_by_key(|d| d.interface);
        assert_eq!(
            sent,
            vec![
                Delivery {
                    interface: 0,
                    bytes: vec![1]
                },
                Delivery {
                    interface: 1,
                    bytes: vec![3]
                },
            ]
        );
    }

    #[tokio::test]
    async fn slot_reusable_after_send_completes() {
        let transport = Arc::new(MockTransport::new(1));
        let scheduler = SendScheduler::new(transport.clone());

        scheduler.submit(0, vec![1]).unwrap().await.unwrap();
        scheduler.submit(0, vec![2]).unwrap().await.unwrap();

        assert_eq!(scheduler.stats().sent, 2);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn failed_send_releases_slot() {
        let transport = Arc::new(MockTransport::new(1).failing_on(0));
        let scheduler = SendScheduler::new(transport);

        scheduler.submit(0, vec![1]).unwrap().await.unwrap();

        assert_eq!(scheduler.state(0), Some(SlotState::Idle));
        assert_eq!(
            scheduler.stats(),
            SendStats {
                sent: 0,
                failed: 1,
                busy_drops: 0
            }
        );
    }

    #[tokio::test]
    async fn unknown_interface() {
        let scheduler = SendScheduler::new(Arc::new(MockTransport::new(1)));
        assert!(matches!(
            scheduler.submit(4, vec![1]),
            Err(SubmitError::NoInterface(4))
        ));
        assert_eq!(scheduler.state(4), None);
    }
}
