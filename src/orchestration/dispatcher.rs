//! # Dispatcher
//!
//! Binds pending rides to online drivers and drives each ride through its
//! lifecycle.
//!
//! ## Bind step
//!
//! For one pending ride the dispatcher:
//!
//! 1. reserves a port (or, under `assign_without_port`, carries on without one),
//! 2. atomically claims the earliest-registered online driver, binding it to
//!    the ride,
//! 3. starts the ride's session on the reserved port,
//! 4. moves the ride `pending -> assigned` with a compare-and-set,
//! 5. arms the completion timer.
//!
//! Any failure after a partial acquisition rolls back everything acquired so
//! far: the session is stopped, the driver goes back to online if it is still
//! on_trip for this ride, and the port returns to the pool. The ride itself is never written
//! until step 4, so a failed bind leaves it pending and eligible for a later
//! rematch.
//!
//! ## Completion
//!
//! The ride is completed first, then its session is stopped, its driver
//! released (back to online only when still on_trip) and its port released, in that
//! order, so a port is never reusable while a ride still holds it. A rematch
//! scan then runs from the completing task and observes all of those writes.

use super::completion_scheduler::CompletionScheduler;
use super::types::{BookingOutcome, DispatchAttempt, DriverUpdate, RematchSummary};
use crate::config::PortExhaustionPolicy;
use crate::error::{DispatchError, DispatchResult, EntityKind};
use crate::events::{DispatchEvent, EventPublisher};
use crate::logging::log_error;
use crate::models::{Driver, DriverId, Port, Ride, RideId, UserId};
use crate::registry::{DriverRegistry, RideStore};
use crate::resources::PortPool;
use crate::session::{SessionHandle, SessionManager};
use crate::state_machine::DriverStatus;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Boxed so the completion path can re-enter dispatch without an infinitely sized future
type CompletionTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Compare-and-set attempts before a contended go-online gives up
const STATUS_RETRY_LIMIT: usize = 3;

/// Cheap to clone; clones share one engine
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    drivers: Arc<DriverRegistry>,
    rides: Arc<RideStore>,
    ports: Arc<PortPool>,
    sessions: Arc<dyn SessionManager>,
    scheduler: CompletionScheduler,
    events: EventPublisher,
    exhaustion_policy: PortExhaustionPolicy,
}

impl Dispatcher {
    pub fn new(
        drivers: Arc<DriverRegistry>,
        rides: Arc<RideStore>,
        ports: Arc<PortPool>,
        sessions: Arc<dyn SessionManager>,
        scheduler: CompletionScheduler,
        events: EventPublisher,
        exhaustion_policy: PortExhaustionPolicy,
    ) -> Self {
        info!(
            session_backend = sessions.backend_name(),
            policy = ?exhaustion_policy,
            trip_seconds = scheduler.trip_duration().as_secs(),
            "🚦 DISPATCH: Dispatcher ready"
        );

        Self {
            inner: Arc::new(DispatcherInner {
                drivers,
                rides,
                ports,
                sessions,
                scheduler,
                events,
                exhaustion_policy,
            }),
        }
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.inner.drivers
    }

    pub fn rides(&self) -> &RideStore {
        &self.inner.rides
    }

    pub fn ports(&self) -> &PortPool {
        &self.inner.ports
    }

    pub fn scheduler(&self) -> &CompletionScheduler {
        &self.inner.scheduler
    }

    pub fn events(&self) -> &EventPublisher {
        &self.inner.events
    }

    /// Create a ride and try to bind it straight away.
    ///
    /// Finding no driver is not an error: the ride comes back pending.
    #[instrument(skip(self, origin, destination))]
    pub async fn book(
        &self,
        requester_id: UserId,
        origin: &str,
        destination: &str,
    ) -> DispatchResult<BookingOutcome> {
        validate_route(origin, destination)?;

        let ride = self.inner.rides.create(requester_id, origin, destination).await?;
        let ride_id = ride.ride_id;
        self.inner.events.publish(DispatchEvent::RideRequested {
            ride_id,
            requester_id,
        });

        match self.try_dispatch(ride_id).await? {
            DispatchAttempt::Assigned { ride, driver } => Ok(BookingOutcome {
                ride,
                driver: Some(driver),
                deferred: None,
            }),
            DispatchAttempt::Deferred(reason) => self.current_outcome(ride_id, Some(reason)).await,
            DispatchAttempt::NoDriver => self.current_outcome(ride_id, None).await,
            DispatchAttempt::Skipped { driver_released } => {
                // The released driver may have been missed by a booking that ran meanwhile
                if driver_released {
                    if let Err(e) = self.rematch_pending().await {
                        log_error("dispatcher", "rematch_after_contention", &e.to_string(), None);
                    }
                }
                self.current_outcome(ride_id, None).await
            }
        }
    }

    /// Re-read a ride that was not bound by this call; a concurrent rematch may have taken it
    async fn current_outcome(
        &self,
        ride_id: RideId,
        deferred: Option<DispatchError>,
    ) -> DispatchResult<BookingOutcome> {
        let ride = self.inner.rides.get(ride_id).await?;
        let driver = match ride.driver_id {
            Some(driver_id) => Some(self.inner.drivers.get(driver_id).await?),
            None => None,
        };
        let deferred = deferred.filter(|_| ride.is_pending());

        Ok(BookingOutcome {
            ride,
            driver,
            deferred,
        })
    }

    /// Run the bind step for one ride
    #[instrument(skip(self))]
    pub async fn try_dispatch(&self, ride_id: RideId) -> DispatchResult<DispatchAttempt> {
        let inner = &self.inner;

        if !inner.rides.get(ride_id).await?.is_pending() {
            return Ok(DispatchAttempt::Skipped {
                driver_released: false,
            });
        }

        let port = match inner.ports.allocate() {
            Ok(port) => {
                inner.events.publish(DispatchEvent::PortAllocated { port });
                Some(port)
            }
            Err(exhausted) => match inner.exhaustion_policy {
                PortExhaustionPolicy::HoldPending => {
                    info!(ride_id, "🚧 DISPATCH: no free port, ride held pending");
                    return Ok(DispatchAttempt::Deferred(exhausted));
                }
                PortExhaustionPolicy::AssignWithoutPort => {
                    warn!(ride_id, "⚠️ DISPATCH: no free port, matching without a session");
                    None
                }
            },
        };

        let driver = match inner.drivers.claim_first_available(ride_id).await {
            Ok(Some(driver)) => driver,
            Ok(None) => {
                self.release_port(port);
                debug!(ride_id, "DISPATCH: no driver online, ride stays pending");
                return Ok(DispatchAttempt::NoDriver);
            }
            Err(e) => {
                self.release_port(port);
                return Err(e);
            }
        };
        let driver_id = driver.driver_id;

        let session = match port {
            Some(port) => match inner.sessions.start(ride_id, port).await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    let error = DispatchError::SessionStartFailed {
                        ride_id,
                        port,
                        reason: e.to_string(),
                    };
                    self.roll_back(ride_id, driver_id, Some(port), None, &error)
                        .await;
                    return Ok(DispatchAttempt::Deferred(error));
                }
            },
            None => None,
        };

        let ride = match inner
            .rides
            .assign(ride_id, driver_id, port, session.clone())
            .await
        {
            Ok(ride) => ride,
            Err(e) => {
                let driver_released = self
                    .roll_back(ride_id, driver_id, port, session.as_ref(), &e)
                    .await;
                if e.is_invalid_transition() {
                    return Ok(DispatchAttempt::Skipped { driver_released });
                }
                return Err(e);
            }
        };

        let dispatcher = self.clone();
        inner
            .scheduler
            .schedule(ride_id, move || dispatcher.completion_task(ride_id));

        inner.events.publish(DispatchEvent::RideAssigned {
            ride_id,
            driver_id,
            port,
        });
        info!(
            ride_id,
            driver_id,
            port,
            driver = %driver.name,
            "🚕 DISPATCH: ride assigned"
        );

        Ok(DispatchAttempt::Assigned { ride, driver })
    }

    /// Undo a partial bind. The ride was never written, so it stays pending.
    /// Returns true when the driver went back online.
    async fn roll_back(
        &self,
        ride_id: RideId,
        driver_id: DriverId,
        port: Option<Port>,
        session: Option<&SessionHandle>,
        reason: &DispatchError,
    ) -> bool {
        let inner = &self.inner;

        if let Some(handle) = session {
            if let Err(e) = inner.sessions.stop(handle).await {
                log_error(
                    "dispatcher",
                    "roll_back",
                    &e.to_string(),
                    Some(&format!("ride_id={ride_id} port={}", handle.port)),
                );
            }
        }

        // A driver that went offline meanwhile stays offline
        let driver_released = match inner.drivers.release_from_ride(driver_id, ride_id).await {
            Ok(released) => released,
            Err(e) => {
                log_error(
                    "dispatcher",
                    "roll_back",
                    &e.to_string(),
                    Some(&format!("driver_id={driver_id}")),
                );
                false
            }
        };

        self.release_port(port);

        inner.events.publish(DispatchEvent::AssignmentRolledBack {
            ride_id,
            driver_id,
            reason: reason.to_string(),
        });
        warn!(
            ride_id,
            driver_id,
            port,
            reason = %reason,
            "↩️ DISPATCH: bind rolled back, ride stays pending"
        );

        driver_released
    }

    fn release_port(&self, port: Option<Port>) {
        if let Some(port) = port {
            if self.inner.ports.release(port) {
                self.inner
                    .events
                    .publish(DispatchEvent::PortReleased { port });
            }
        }
    }

    fn completion_task(&self, ride_id: RideId) -> CompletionTask {
        let dispatcher = self.clone();
        Box::pin(async move {
            if let Err(e) = dispatcher.complete_ride(ride_id).await {
                log_error(
                    "completion_scheduler",
                    "complete_ride",
                    &e.to_string(),
                    Some(&format!("ride_id={ride_id}")),
                );
            }
        })
    }

    /// Scan pending rides oldest-first and bind as many as possible.
    ///
    /// The scan stops at the first ride that finds no driver or cannot get its
    /// resources; rides taken by a concurrent scan are skipped. When a skipped
    /// ride hands its claimed driver back, the queue is scanned again so that
    /// driver is not stranded online next to a pending ride.
    #[instrument(skip(self))]
    pub async fn rematch_pending(&self) -> DispatchResult<RematchSummary> {
        let mut summary = RematchSummary::default();

        loop {
            let pending = self.inner.rides.find_pending_ordered().await?;
            let mut rescan = false;

            for ride in pending {
                summary.scanned += 1;
                match self.try_dispatch(ride.ride_id).await? {
                    DispatchAttempt::Assigned { ride, .. } => summary.assigned.push(ride.ride_id),
                    DispatchAttempt::Skipped { driver_released } => rescan |= driver_released,
                    DispatchAttempt::NoDriver => break,
                    DispatchAttempt::Deferred(reason) => {
                        summary.stopped_by = Some(reason);
                        break;
                    }
                }
            }

            if !rescan || summary.stopped_by.is_some() {
                break;
            }
            debug!("DISPATCH: contended bind released a driver, rescanning");
        }

        if summary.assigned.is_empty() {
            debug!(scanned = summary.scanned, "DISPATCH: rematch assigned nothing");
        } else {
            info!(
                scanned = summary.scanned,
                assigned = ?summary.assigned,
                "🔁 DISPATCH: rematch assigned pending rides"
            );
        }

        Ok(summary)
    }

    /// Complete an assigned ride and reclaim its resources.
    ///
    /// Returns `None` when the ride is not assigned, so a late or duplicate
    /// firing never completes a ride twice.
    #[instrument(skip(self))]
    pub async fn complete_ride(&self, ride_id: RideId) -> DispatchResult<Option<Ride>> {
        let inner = &self.inner;

        let ride = match inner.rides.complete(ride_id).await {
            Ok(ride) => ride,
            Err(e) if e.is_invalid_transition() => {
                debug!(ride_id, "COMPLETION: ride not assigned, nothing to do");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        // No-op when called from the timer itself
        inner.scheduler.cancel(ride_id);

        if let Some(handle) = &ride.session {
            if let Err(e) = inner.sessions.stop(handle).await {
                log_error(
                    "dispatcher",
                    "stop_session",
                    &e.to_string(),
                    Some(&format!("ride_id={ride_id} port={}", handle.port)),
                );
            }
        }

        if let Some(driver_id) = ride.driver_id {
            match inner.drivers.release_from_ride(driver_id, ride_id).await {
                Ok(true) => info!(ride_id, driver_id, "🟢 COMPLETION: driver back online"),
                Ok(false) => info!(
                    ride_id,
                    driver_id,
                    "COMPLETION: driver left on_trip during the ride, status kept"
                ),
                Err(e) => log_error(
                    "dispatcher",
                    "release_driver",
                    &e.to_string(),
                    Some(&format!("driver_id={driver_id}")),
                ),
            }
        }

        self.release_port(ride.port);

        inner.events.publish(DispatchEvent::RideCompleted {
            ride_id,
            driver_id: ride.driver_id,
            port: ride.port,
        });
        info!(ride_id, port = ride.port, "🏁 COMPLETION: ride completed");

        if let Err(e) = self.rematch_pending().await {
            log_error("dispatcher", "rematch_after_completion", &e.to_string(), None);
        }

        Ok(Some(ride))
    }

    /// Bring a driver online and offer it the pending queue.
    ///
    /// Rejected while the driver is bound to a ride: on a trip, in the middle
    /// of a bind, or gone offline without its ride having finished.
    #[instrument(skip(self))]
    pub async fn go_online(&self, driver_id: DriverId) -> DispatchResult<DriverUpdate> {
        self.bring_online(driver_id).await?;

        let rematch = match self.rematch_pending().await {
            Ok(summary) => summary,
            Err(e) => {
                log_error("dispatcher", "rematch_after_online", &e.to_string(), None);
                RematchSummary {
                    stopped_by: Some(e),
                    ..RematchSummary::default()
                }
            }
        };

        let driver = self.inner.drivers.get(driver_id).await?;
        Ok(DriverUpdate { driver, rematch })
    }

    async fn bring_online(&self, driver_id: DriverId) -> DispatchResult<()> {
        let drivers = &self.inner.drivers;

        for _ in 0..STATUS_RETRY_LIMIT {
            let current = drivers.get(driver_id).await?;
            match current.status {
                DriverStatus::OnTrip => {
                    return Err(DispatchError::invalid_transition(
                        EntityKind::Driver,
                        driver_id,
                        DriverStatus::OnTrip,
                        DriverStatus::Online,
                    ));
                }
                DriverStatus::Online => {
                    drivers.touch(driver_id).await?;
                    return Ok(());
                }
                DriverStatus::Offline => {
                    // Only an online driver can be claimed, so the binding
                    // cannot appear between this read and the swap below
                    if let Some(ride_id) = current.current_ride {
                        return Err(DispatchError::invalid_transition(
                            EntityKind::Driver,
                            driver_id,
                            format!("offline (still bound to ride {ride_id})"),
                            DriverStatus::Online,
                        ));
                    }
                    if drivers
                        .set_status_if(driver_id, DriverStatus::Offline, DriverStatus::Online)
                        .await?
                    {
                        return Ok(());
                    }
                }
            }
        }

        Err(DispatchError::invalid_transition(
            EntityKind::Driver,
            driver_id,
            "contended",
            DriverStatus::Online,
        ))
    }

    /// Take a driver offline from any state. A running trip keeps its timer.
    #[instrument(skip(self))]
    pub async fn go_offline(&self, driver_id: DriverId) -> DispatchResult<Driver> {
        self.inner
            .drivers
            .set_status(driver_id, DriverStatus::Offline)
            .await
    }

    /// Abort outstanding completion timers
    pub fn shutdown(&self) -> usize {
        self.inner.scheduler.shutdown()
    }
}

fn validate_route(origin: &str, destination: &str) -> DispatchResult<()> {
    let (origin, destination) = (origin.trim(), destination.trim());

    if origin.is_empty() || destination.is_empty() {
        return Err(DispatchError::Validation(
            "origin and destination are required".to_string(),
        ));
    }
    if origin == destination {
        return Err(DispatchError::Validation(
            "origin and destination must differ".to_string(),
        ));
    }
    Ok(())
}
