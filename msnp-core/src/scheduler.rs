// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Outbound Scheduler
//!
//! Delays outbound commands per owner so bursts of requests do not hit the
//! server back to back.
//!
//! - Owners (sessions, conversations) register and receive an id. Entries
//!   for unregistered ids are refused at enqueue and dropped at drain.
//!   The registry holds owners weakly: an owner dropped by the host counts
//!   as unregistered and is pruned on the next pass.
//! - A drain pass sends entries that have waited at least the configured
//!   delay, oldest first. With [`DrainPolicy::OnePerOwner`] at most one
//!   entry per owner is sent per pass; the rest wait for the next pass.
//! - With background draining on, the first enqueue starts a named thread
//!   that sleeps for the delay, drains, and exits once the queue is empty.
//!   Tests turn it off and call [`Scheduler::drain_pass`] with their own
//!   clock.

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::protocol::{Command, MessageProcessor};

/// How many ready entries a pass may send per owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Send every ready entry.
    DrainAll,
    /// Send at most one ready entry per owner per pass.
    OnePerOwner,
}

/// A queued outbound command. Immutable once created.
#[derive(Clone)]
pub struct SchedulerQueueObject {
    processor: Arc<dyn MessageProcessor>,
    message: Command,
    owner_id: Uuid,
    created_at: Instant,
}

impl SchedulerQueueObject {
    pub fn new(
        processor: Arc<dyn MessageProcessor>,
        message: Command,
        owner_id: Uuid,
        created_at: Instant,
    ) -> Self {
        SchedulerQueueObject {
            processor,
            message,
            owner_id,
            created_at,
        }
    }

    pub fn processor(&self) -> &Arc<dyn MessageProcessor> {
        &self.processor
    }

    pub fn message(&self) -> &Command {
        &self.message
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

impl std::fmt::Debug for SchedulerQueueObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerQueueObject")
            .field("connection", &self.processor.connection_id())
            .field("message", &self.message.to_string())
            .field("owner_id", &self.owner_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries handed to their processor successfully.
    pub sent: usize,
    /// Entries whose send returned an error (logged, not retried).
    pub failed: usize,
    /// Entries discarded: owner unregistered or processor disconnected.
    pub dropped: usize,
    /// Entries still queued after the pass.
    pub remaining: usize,
}

#[derive(Default)]
struct Registry {
    /// Owner address -> id. The weak handle in `owners` keeps the allocation,
    /// so an address is not reused while its entry exists.
    by_address: HashMap<usize, Uuid>,
    owners: HashMap<Uuid, (usize, Weak<dyn Any + Send + Sync>)>,
}

impl Registry {
    fn is_live(&self, owner_id: Uuid) -> bool {
        self.owners
            .get(&owner_id)
            .is_some_and(|(_, owner)| owner.strong_count() > 0)
    }

    fn remove(&mut self, owner_id: Uuid) -> bool {
        match self.owners.remove(&owner_id) {
            Some((address, _)) => {
                self.by_address.remove(&address);
                true
            }
            None => false,
        }
    }

    /// Forgets owners the host has dropped.
    fn prune(&mut self) -> Vec<Uuid> {
        let dropped: Vec<Uuid> = self
            .owners
            .iter()
            .filter(|(_, (_, owner))| owner.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in &dropped {
            self.remove(*id);
        }
        dropped
    }
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<SchedulerQueueObject>,
    /// A drain thread is alive. Only read or written under the queue lock.
    running: bool,
}

struct SchedulerInner {
    name: String,
    policy: DrainPolicy,
    delay: RwLock<Duration>,
    background: AtomicBool,
    registry: Mutex<Registry>,
    queue: Mutex<QueueState>,
}

/// Delayed, per-owner outbound queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(name: &str, delay: Duration, policy: DrainPolicy) -> Self {
        Scheduler {
            inner: Arc::new(SchedulerInner {
                name: name.to_string(),
                policy,
                delay: RwLock::new(delay),
                background: AtomicBool::new(true),
                registry: Mutex::new(Registry::default()),
                queue: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// General outbound scheduler, draining everything that is ready.
    pub fn message_scheduler(config: &ClientConfig) -> Self {
        let scheduler = Self::new(
            "msnp-message-scheduler",
            config.scheduler_delay(),
            DrainPolicy::DrainAll,
        );
        scheduler.set_background_drain(config.background_drain);
        scheduler
    }

    /// Request-coalescing scheduler: one send per owner per pass.
    pub fn invitation_scheduler(config: &ClientConfig) -> Self {
        let scheduler = Self::new(
            "msnp-invitation-scheduler",
            config.invitation_delay(),
            DrainPolicy::OnePerOwner,
        );
        scheduler.set_background_drain(config.background_drain);
        scheduler
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn policy(&self) -> DrainPolicy {
        self.inner.policy
    }

    pub fn delay(&self) -> Duration {
        *self.inner.delay.read()
    }

    /// Applies from the next sleep of the drain thread.
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.write() = delay;
    }

    pub fn set_background_drain(&self, enabled: bool) {
        self.inner.background.store(enabled, Ordering::SeqCst);
    }

    /// Registers an owner. Registering the same object again returns the
    /// id it already has.
    pub fn register<O>(&self, owner: &Arc<O>) -> Uuid
    where
        O: Any + Send + Sync,
    {
        let address = Arc::as_ptr(owner) as *const () as usize;
        let mut registry = self.inner.registry.lock();
        if let Some(id) = registry.by_address.get(&address) {
            return *id;
        }
        let id = Uuid::new_v4();
        let handle: Weak<O> = Arc::downgrade(owner);
        let handle: Weak<dyn Any + Send + Sync> = handle;
        registry.by_address.insert(address, id);
        registry.owners.insert(id, (address, handle));
        tracing::debug!(scheduler = %self.inner.name, owner = %id, "owner registered");
        id
    }

    /// Unregisters an owner. Its queued entries are dropped on the next pass.
    pub fn unregister(&self, owner_id: Uuid) -> bool {
        if !self.inner.registry.lock().remove(owner_id) {
            return false;
        }
        tracing::debug!(scheduler = %self.inner.name, owner = %owner_id, "owner unregistered");
        true
    }

    pub fn is_registered(&self, owner_id: Uuid) -> bool {
        self.inner.is_registered(owner_id)
    }

    /// Owners currently in the registry, including dropped ones not yet
    /// pruned by a pass.
    pub fn registered_count(&self) -> usize {
        self.inner.registry.lock().owners.len()
    }

    /// Queues `message` for `owner_id`. Returns false (and queues nothing)
    /// if the owner is not registered.
    pub fn enqueue(
        &self,
        processor: Arc<dyn MessageProcessor>,
        message: Command,
        owner_id: Uuid,
    ) -> bool {
        self.enqueue_at(processor, message, owner_id, Instant::now())
    }

    /// [`enqueue`](Self::enqueue) with an explicit creation time.
    pub fn enqueue_at(
        &self,
        processor: Arc<dyn MessageProcessor>,
        message: Command,
        owner_id: Uuid,
        created_at: Instant,
    ) -> bool {
        if !self.inner.is_registered(owner_id) {
            tracing::debug!(
                scheduler = %self.inner.name,
                owner = %owner_id,
                verb = message.verb(),
                "ignoring message for unregistered owner"
            );
            return false;
        }

        let mut queue = self.inner.queue.lock();
        queue
            .entries
            .push_back(SchedulerQueueObject::new(processor, message, owner_id, created_at));

        if self.inner.background.load(Ordering::SeqCst) && !queue.running {
            queue.running = true;
            let inner = Arc::clone(&self.inner);
            let spawned = thread::Builder::new()
                .name(self.inner.name.clone())
                .spawn(move || inner.run());
            if let Err(err) = spawned {
                queue.running = false;
                tracing::error!(scheduler = %self.inner.name, error = %err, "failed to start drain thread");
            }
        }
        true
    }

    /// Runs one drain pass as of `now`.
    pub fn drain_pass(&self, now: Instant) -> DrainReport {
        self.inner.drain_pass(now)
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().entries.len()
    }

    /// Queued entries for one owner.
    pub fn pending_for(&self, owner_id: Uuid) -> usize {
        self.inner
            .queue
            .lock()
            .entries
            .iter()
            .filter(|e| e.owner_id == owner_id)
            .count()
    }

    /// True while a background drain thread is alive.
    pub fn is_running(&self) -> bool {
        self.inner.queue.lock().running
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.inner.name)
            .field("policy", &self.inner.policy)
            .field("delay", &self.delay())
            .field("queued", &self.queue_len())
            .finish()
    }
}

impl SchedulerInner {
    fn is_registered(&self, owner_id: Uuid) -> bool {
        self.registry.lock().is_live(owner_id)
    }

    fn run(self: Arc<Self>) {
        tracing::debug!(scheduler = %self.name, "drain thread started");
        loop {
            let delay = *self.delay.read();
            thread::sleep(delay);
            self.drain_pass(Instant::now());

            let mut queue = self.queue.lock();
            if queue.entries.is_empty() {
                queue.running = false;
                break;
            }
        }
        tracing::debug!(scheduler = %self.name, "drain thread stopped");
    }

    fn drain_pass(&self, now: Instant) -> DrainReport {
        let delay = *self.delay.read();
        let registered: HashSet<Uuid> = {
            let mut registry = self.registry.lock();
            for id in registry.prune() {
                tracing::debug!(scheduler = %self.name, owner = %id, "owner dropped, unregistering");
            }
            registry.owners.keys().copied().collect()
        };
        let mut report = DrainReport::default();

        let ready = {
            let mut queue = self.queue.lock();
            let mut kept = VecDeque::with_capacity(queue.entries.len());
            let mut ready = Vec::new();
            let mut served: HashSet<Uuid> = HashSet::new();

            for entry in queue.entries.drain(..) {
                if !registered.contains(&entry.owner_id) {
                    tracing::debug!(
                        scheduler = %self.name,
                        owner = %entry.owner_id,
                        verb = entry.message.verb(),
                        "dropping message of unregistered owner"
                    );
                    report.dropped += 1;
                    continue;
                }
                if now.saturating_duration_since(entry.created_at) < delay {
                    kept.push_back(entry);
                    continue;
                }
                if self.policy == DrainPolicy::OnePerOwner && served.contains(&entry.owner_id) {
                    kept.push_back(entry);
                    continue;
                }
                if !entry.processor.is_connected() {
                    tracing::warn!(
                        scheduler = %self.name,
                        owner = %entry.owner_id,
                        verb = entry.message.verb(),
                        "dropping message for disconnected processor"
                    );
                    report.dropped += 1;
                    continue;
                }
                served.insert(entry.owner_id);
                ready.push(entry);
            }

            queue.entries = kept;
            report.remaining = queue.entries.len();
            ready
        };

        for entry in ready {
            match entry.processor.send_message(entry.message.clone()) {
                Ok(_) => report.sent += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(
                        scheduler = %self.name,
                        owner = %entry.owner_id,
                        command = %entry.message,
                        error = %err,
                        "scheduled send failed"
                    );
                }
            }
        }

        if report.sent + report.failed + report.dropped > 0 {
            tracing::trace!(
                scheduler = %self.name,
                sent = report.sent,
                failed = report.failed,
                dropped = report.dropped,
                remaining = report.remaining,
                "drain pass"
            );
        }
        report
    }
}
