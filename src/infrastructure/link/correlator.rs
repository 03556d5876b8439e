//! Command/Response Correlator
//!
//! BLE notifications carry no request id, so replies are matched to requests
//! by opcode alone. Each opcode has one lane:
//!
//! ```text
//! Idle ──send_and_wait──▶ Pending ──reply────▶ Fulfilled ─┐
//!                            │ ────timeout──▶ TimedOut  ─┼──▶ Idle
//!                            └────disconnect▶ Cancelled ─┘
//! ```
//!
//! At most one wait per opcode exists at a time. The lane table lock is only
//! held for table access, never across an `.await`, so frame delivery from the
//! transport's callback context never blocks on a waiting caller.

use super::channel::CommandChannel;
use super::codec::{self, Frame};
use super::error::{FrameError, LinkError};
use super::transport::Transport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

/// What to do when a wait is requested on an opcode that is already pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Fail the new request with `RequestAlreadyPending`
    #[default]
    Reject,
    /// Fail the stale request with `Superseded` and track the new one
    Replace,
}

type Slot = oneshot::Sender<Result<Vec<u8>, LinkError>>;

struct PendingWait {
    ticket: u64,
    created_at: Instant,
    slot: Slot,
}

/// Outcome of handing one inbound frame to the correlator
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Matched { opcode: u8, latency: Duration },
    /// No lane was waiting on this opcode; the frame took no part in correlation
    Unmatched(Frame),
    Malformed(FrameError),
}

#[derive(Debug, Default)]
struct Counters {
    frames_sent: AtomicU64,
    waits_started: AtomicU64,
    replies_matched: AtomicU64,
    timeouts: AtomicU64,
    cancelled: AtomicU64,
    unmatched_frames: AtomicU64,
    malformed_frames: AtomicU64,
}

/// Point-in-time copy of the correlator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    pub frames_sent: u64,
    pub waits_started: u64,
    pub replies_matched: u64,
    pub timeouts: u64,
    pub cancelled: u64,
    pub unmatched_frames: u64,
    pub malformed_frames: u64,
}

pub struct Correlator {
    transport: Arc<dyn Transport>,
    lanes: Mutex<HashMap<u8, PendingWait>>,
    next_ticket: AtomicU64,
    conflict: ConflictPolicy,
    closed: AtomicBool,
    counters: Counters,
}

impl Correlator {
    pub fn new(transport: Arc<dyn Transport>, conflict: ConflictPolicy) -> Self {
        Self {
            transport,
            lanes: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
            conflict,
            closed: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    fn lanes(&self) -> MutexGuard<'_, HashMap<u8, PendingWait>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn link_up(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.transport.is_connected()
    }

    /// Encode and transmit a frame without waiting for anything
    pub fn send(&self, opcode: u8, payload: &[u8]) -> Result<(), LinkError> {
        if !self.link_up() {
            return Err(LinkError::LinkUnavailable);
        }
        let frame = codec::encode(opcode, payload);
        self.transport.transmit(&frame)?;
        self.counters.frames_sent.fetch_add(1, Ordering::Relaxed);
        trace!("Sent frame: {:02X?}", frame);
        Ok(())
    }

    pub async fn send_and_wait(
        &self,
        opcode: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, LinkError> {
        self.send_and_expect(opcode, opcode, payload, timeout).await
    }

    /// Send a request and suspend until a frame on `reply_opcode` arrives,
    /// the timeout elapses, or the link goes away
    pub async fn send_and_expect(
        &self,
        opcode: u8,
        reply_opcode: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, LinkError> {
        if !self.link_up() {
            return Err(LinkError::LinkUnavailable);
        }

        let (ticket, reply) = self.register(reply_opcode)?;
        let _lane = LaneGuard {
            correlator: self,
            opcode: reply_opcode,
            ticket,
        };

        // a disconnect sweep may have run between the check above and registration
        if !self.link_up() {
            return Err(LinkError::LinkUnavailable);
        }
        self.send(opcode, payload)?;

        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(LinkError::LinkUnavailable),
            Err(_) => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "No reply for opcode {:#04x} within {:?}",
                    reply_opcode, timeout
                );
                Err(LinkError::ResponseTimeout {
                    opcode: reply_opcode,
                    timeout,
                })
            }
        }
    }

    fn register(
        &self,
        opcode: u8,
    ) -> Result<(u64, oneshot::Receiver<Result<Vec<u8>, LinkError>>), LinkError> {
        let mut lanes = self.lanes();

        let occupied = lanes
            .get(&opcode)
            .map(|wait| !wait.slot.is_closed())
            .unwrap_or(false);
        if occupied {
            match self.conflict {
                ConflictPolicy::Reject => {
                    warn!("Request already pending for opcode {:#04x}", opcode);
                    return Err(LinkError::RequestAlreadyPending(opcode));
                }
                ConflictPolicy::Replace => {
                    if let Some(stale) = lanes.remove(&opcode) {
                        debug!("Superseding pending request for opcode {:#04x}", opcode);
                        self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                        let _ = stale.slot.send(Err(LinkError::Superseded(opcode)));
                    }
                }
            }
        }

        let (slot, reply) = oneshot::channel();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        lanes.insert(
            opcode,
            PendingWait {
                ticket,
                created_at: Instant::now(),
                slot,
            },
        );
        self.counters.waits_started.fetch_add(1, Ordering::Relaxed);
        Ok((ticket, reply))
    }

    /// Route one inbound frame. Safe to call from any thread, concurrently
    /// with caller-side operations.
    pub fn on_frame(&self, bytes: &[u8]) -> Delivery {
        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                self.counters.malformed_frames.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping malformed frame {:02X?}: {}", bytes, e);
                return Delivery::Malformed(e);
            }
        };

        let opcode = frame.opcode();
        let pending = self.lanes().remove(&opcode);
        let Some(wait) = pending else {
            self.counters.unmatched_frames.fetch_add(1, Ordering::Relaxed);
            debug!("No pending request for opcode {:#04x}, dropping frame", opcode);
            return Delivery::Unmatched(frame);
        };

        let latency = wait.created_at.elapsed();
        match wait.slot.send(Ok(frame.into_payload())) {
            Ok(()) => {
                self.counters.replies_matched.fetch_add(1, Ordering::Relaxed);
                debug!("Reply for opcode {:#04x} after {:?}", opcode, latency);
                Delivery::Matched { opcode, latency }
            }
            Err(returned) => {
                // waiter gave up between lookup and delivery
                self.counters.unmatched_frames.fetch_add(1, Ordering::Relaxed);
                let payload = returned.unwrap_or_default();
                Delivery::Unmatched(Frame::new(opcode, payload))
            }
        }
    }

    /// Fail every pending wait with `LinkUnavailable`. Returns how many were failed.
    pub fn on_disconnect(&self) -> usize {
        let drained: Vec<(u8, PendingWait)> = self.lanes().drain().collect();
        let count = drained.len();
        for (opcode, wait) in drained {
            debug!("Cancelling pending request for opcode {:#04x}", opcode);
            let _ = wait.slot.send(Err(LinkError::LinkUnavailable));
        }
        if count > 0 {
            self.counters
                .cancelled
                .fetch_add(count as u64, Ordering::Relaxed);
            info!("Link lost, failed {} pending request(s)", count);
        }
        count
    }

    /// Tear the correlator down: pending and future requests fail with `LinkUnavailable`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.on_disconnect();
    }

    pub fn is_pending(&self, opcode: u8) -> bool {
        self.lanes().contains_key(&opcode)
    }

    pub fn pending_count(&self) -> usize {
        self.lanes().len()
    }

    pub fn stats(&self) -> CorrelatorStats {
        let c = &self.counters;
        CorrelatorStats {
            frames_sent: c.frames_sent.load(Ordering::Relaxed),
            waits_started: c.waits_started.load(Ordering::Relaxed),
            replies_matched: c.replies_matched.load(Ordering::Relaxed),
            timeouts: c.timeouts.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
            unmatched_frames: c.unmatched_frames.load(Ordering::Relaxed),
            malformed_frames: c.malformed_frames.load(Ordering::Relaxed),
        }
    }
}

/// Returns the lane to `Idle` on every exit path of a wait, including the
/// caller dropping the future
struct LaneGuard<'a> {
    correlator: &'a Correlator,
    opcode: u8,
    ticket: u64,
}

impl Drop for LaneGuard<'_> {
    fn drop(&mut self) {
        let mut lanes = self.correlator.lanes();
        if lanes.get(&self.opcode).map(|w| w.ticket) == Some(self.ticket) {
            lanes.remove(&self.opcode);
        }
    }
}

#[async_trait]
impl CommandChannel for Correlator {
    fn send(&self, opcode: u8, payload: &[u8]) -> Result<(), LinkError> {
        Correlator::send(self, opcode, payload)
    }

    async fn send_and_expect(
        &self,
        opcode: u8,
        reply_opcode: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, LinkError> {
        Correlator::send_and_expect(self, opcode, reply_opcode, payload, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::link::transport::MemoryTransport;
    use tokio::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(2);

    fn setup(
        conflict: ConflictPolicy,
    ) -> (
        Arc<Correlator>,
        Arc<MemoryTransport>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        let (transport, outbound) = MemoryTransport::new();
        let transport = Arc::new(transport);
        let link = Arc::new(Correlator::new(transport.clone(), conflict));
        (link, transport, outbound)
    }

    #[tokio::test]
    async fn test_send_transmits_encoded_frame() {
        let (link, _transport, mut outbound) = setup(ConflictPolicy::Reject);
        link.send(0x18, &[0x06, 0x03]).unwrap();
        assert_eq!(outbound.recv().await.unwrap(), vec![0x18, 0x06, 0x03]);
        assert_eq!(link.pending_count(), 0);
        assert_eq!(link.stats().frames_sent, 1);
    }

    #[tokio::test]
    async fn test_send_fails_when_disconnected() {
        let (link, transport, mut outbound) = setup(ConflictPolicy::Reject);
        transport.set_connected(false);

        assert_eq!(link.send(0x18, &[0x06]), Err(LinkError::LinkUnavailable));
        assert_eq!(
            link.send_and_wait(0x28, &[0x02, 0x01], WAIT).await,
            Err(LinkError::LinkUnavailable)
        );
        assert!(!link.is_pending(0x28));
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_color_sensor_read() {
        let (link, _transport, mut outbound) = setup(ConflictPolicy::Reject);

        let peer = link.clone();
        let responder = tokio::spawn(async move {
            let request = outbound.recv().await.unwrap();
            assert_eq!(request, vec![0x28, 0x02, 0x01]);
            peer.on_frame(&[0x28, 0x02, 0x01, 0x00, 0x07])
        });

        let reply = link
            .send_and_wait(0x28, &[0x02, 0x01], Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(reply, vec![0x02, 0x01, 0x00, 0x07]);
        assert_eq!(reply[3], 0x07);
        assert!(matches!(
            responder.await.unwrap(),
            Delivery::Matched { opcode: 0x28, .. }
        ));
        assert!(!link.is_pending(0x28));
    }

    #[tokio::test]
    async fn test_second_wait_on_same_opcode_is_rejected() {
        let (link, _transport, mut outbound) = setup(ConflictPolicy::Reject);

        let first = tokio::spawn({
            let link = link.clone();
            async move { link.send_and_wait(0x20, &[0x03], WAIT).await }
        });
        outbound.recv().await.unwrap();

        let second = link.send_and_wait(0x20, &[0x04], WAIT).await;
        assert_eq!(second, Err(LinkError::RequestAlreadyPending(0x20)));
        assert!(link.is_pending(0x20));
        assert!(outbound.try_recv().is_err());

        link.on_frame(&[0x20, 0x03, 0x01]);
        assert_eq!(first.await.unwrap().unwrap(), vec![0x03, 0x01]);
    }

    #[tokio::test]
    async fn test_timeout_returns_lane_to_idle() {
        let (link, _transport, mut outbound) = setup(ConflictPolicy::Reject);
        let timeout = Duration::from_millis(50);

        let start = Instant::now();
        let result = link.send_and_wait(0x28, &[0x02, 0x01], timeout).await;
        let elapsed = start.elapsed();

        assert_eq!(
            result,
            Err(LinkError::ResponseTimeout {
                opcode: 0x28,
                timeout
            })
        );
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(500));
        assert!(!link.is_pending(0x28));
        assert_eq!(link.stats().timeouts, 1);

        outbound.recv().await.unwrap();
        let peer = link.clone();
        tokio::spawn(async move {
            outbound.recv().await.unwrap();
            peer.on_frame(&[0x28, 0x02, 0x01, 0x00, 0x2a]);
        });
        let reply = link.send_and_wait(0x28, &[0x02, 0x01], WAIT).await.unwrap();
        assert_eq!(reply[3], 0x2a);
    }

    #[tokio::test]
    async fn test_frames_route_by_opcode() {
        let (link, _transport, mut outbound) = setup(ConflictPolicy::Reject);

        let a = tokio::spawn({
            let link = link.clone();
            async move { link.send_and_wait(0x28, &[0x02, 0x03], WAIT).await }
        });
        let b = tokio::spawn({
            let link = link.clone();
            async move { link.send_and_wait(0x20, &[0x04], WAIT).await }
        });
        outbound.recv().await.unwrap();
        outbound.recv().await.unwrap();

        link.on_frame(&[0x20, 0x04, 0x01]);
        assert_eq!(b.await.unwrap().unwrap(), vec![0x04, 0x01]);
        assert!(link.is_pending(0x28));
        assert!(!a.is_finished());

        link.on_frame(&[0x28, 0x02, 0x03, 0x00, 0x10]);
        assert_eq!(a.await.unwrap().unwrap(), vec![0x02, 0x03, 0x00, 0x10]);
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending_wait() {
        let (link, transport, mut outbound) = setup(ConflictPolicy::Reject);

        let waiter = tokio::spawn({
            let link = link.clone();
            async move { link.send_and_wait(0x28, &[0x02, 0x01], Duration::from_secs(30)).await }
        });
        outbound.recv().await.unwrap();

        transport.set_connected(false);
        assert_eq!(link.on_disconnect(), 1);

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve immediately")
            .unwrap();
        assert_eq!(result, Err(LinkError::LinkUnavailable));
        assert_eq!(link.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_close_rejects_new_requests() {
        let (link, _transport, _outbound) = setup(ConflictPolicy::Reject);
        link.close();
        assert_eq!(link.send(0x85, &[]), Err(LinkError::LinkUnavailable));
        assert_eq!(
            link.send_and_wait(0x85, &[], WAIT).await,
            Err(LinkError::LinkUnavailable)
        );
    }

    #[tokio::test]
    async fn test_replace_policy_supersedes_stale_wait() {
        let (link, _transport, mut outbound) = setup(ConflictPolicy::Replace);

        let stale = tokio::spawn({
            let link = link.clone();
            async move { link.send_and_wait(0x20, &[0x03], WAIT).await }
        });
        outbound.recv().await.unwrap();

        let fresh = tokio::spawn({
            let link = link.clone();
            async move { link.send_and_wait(0x20, &[0x03], WAIT).await }
        });
        outbound.recv().await.unwrap();

        assert_eq!(stale.await.unwrap(), Err(LinkError::Superseded(0x20)));
        assert!(link.is_pending(0x20));

        link.on_frame(&[0x20, 0x03, 0x00]);
        assert_eq!(fresh.await.unwrap().unwrap(), vec![0x03, 0x00]);
    }

    #[tokio::test]
    async fn test_dropped_wait_frees_lane() {
        let (link, _transport, _outbound) = setup(ConflictPolicy::Reject);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            link.send_and_wait(0x28, &[0x02, 0x01], Duration::from_secs(30)),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!link.is_pending(0x28));

        assert!(matches!(
            link.on_frame(&[0x28, 0x02, 0x01, 0x00, 0x07]),
            Delivery::Unmatched(_)
        ));
    }

    #[tokio::test]
    async fn test_reply_on_mapped_opcode() {
        let (link, _transport, mut outbound) = setup(ConflictPolicy::Reject);

        let peer = link.clone();
        tokio::spawn(async move {
            assert_eq!(outbound.recv().await.unwrap(), vec![0x18, 0x06, 0x01]);
            // same opcode as the request: not an answer
            assert!(matches!(peer.on_frame(&[0x18]), Delivery::Unmatched(_)));
            peer.on_frame(&[0x88, 0x00]);
        });

        let reply = link
            .send_and_expect(0x18, 0x88, &[0x06, 0x01], WAIT)
            .await
            .unwrap();
        assert_eq!(reply, vec![0x00]);
    }

    #[test]
    fn test_unsolicited_and_malformed_frames_are_dropped() {
        let (transport, _outbound) = MemoryTransport::new();
        let link = Correlator::new(Arc::new(transport), ConflictPolicy::Reject);

        assert_eq!(
            link.on_frame(&[0x87, 0x01]),
            Delivery::Unmatched(Frame::new(0x87, vec![0x01]))
        );
        assert_eq!(link.on_frame(&[]), Delivery::Malformed(FrameError::Empty));

        let stats = link.stats();
        assert_eq!(stats.unmatched_frames, 1);
        assert_eq!(stats.malformed_frames, 1);
        assert_eq!(stats.replies_matched, 0);
    }
}
