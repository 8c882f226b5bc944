//! In-memory repositories backed by `parking_lot` locks.
//!
//! Ids are assigned from a counter starting at 1 and never reused, so ascending
//! id order is registration/booking order.

use super::{DriverRegistration, DriverRepository, RideRepository};
use crate::error::{DispatchError, DispatchResult, EntityKind};
use crate::models::{
    Driver, DriverId, NewDriver, NewRide, Port, Ride, RideId, RideUpdate,
};
use crate::state_machine::{DriverStatus, RideStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
struct DriverTable {
    next_id: DriverId,
    drivers: BTreeMap<DriverId, Driver>,
    by_contact: HashMap<String, DriverId>,
}

impl Default for DriverTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            drivers: BTreeMap::new(),
            by_contact: HashMap::new(),
        }
    }
}

impl DriverTable {
    fn get_mut(&mut self, driver_id: DriverId) -> DispatchResult<&mut Driver> {
        self.drivers
            .get_mut(&driver_id)
            .ok_or_else(|| DispatchError::not_found(EntityKind::Driver, driver_id))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDriverRepository {
    table: RwLock<DriverTable>,
}

impl InMemoryDriverRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DriverRepository for InMemoryDriverRepository {
    async fn upsert_by_contact(
        &self,
        driver: NewDriver,
        now: DateTime<Utc>,
    ) -> DispatchResult<DriverRegistration> {
        let mut table = self.table.write();

        if let Some(existing_id) = table.by_contact.get(&driver.contact).copied() {
            let existing = table.get_mut(existing_id)?;
            let previous_status = existing.status;
            existing.status = DriverStatus::Offline;
            existing.location = driver.location;
            return Ok(DriverRegistration {
                driver: existing.clone(),
                previous_status: Some(previous_status),
            });
        }

        let driver_id = table.next_id;
        table.next_id += 1;

        let record = Driver {
            driver_id,
            name: driver.name,
            contact: driver.contact,
            location: driver.location,
            status: DriverStatus::Offline,
            current_ride: None,
            last_seen: now,
            created_at: now,
        };
        table.by_contact.insert(record.contact.clone(), driver_id);
        table.drivers.insert(driver_id, record.clone());

        Ok(DriverRegistration {
            driver: record,
            previous_status: None,
        })
    }

    async fn get(&self, driver_id: DriverId) -> DispatchResult<Option<Driver>> {
        Ok(self.table.read().drivers.get(&driver_id).cloned())
    }

    async fn list(&self) -> DispatchResult<Vec<Driver>> {
        Ok(self.table.read().drivers.values().cloned().collect())
    }

    async fn update_status(
        &self,
        driver_id: DriverId,
        status: DriverStatus,
        seen_at: Option<DateTime<Utc>>,
    ) -> DispatchResult<(DriverStatus, Driver)> {
        let mut table = self.table.write();
        let driver = table.get_mut(driver_id)?;
        let previous = driver.status;
        driver.status = status;
        if let Some(seen_at) = seen_at {
            driver.last_seen = seen_at;
        }
        Ok((previous, driver.clone()))
    }

    async fn compare_and_set_status(
        &self,
        driver_id: DriverId,
        expected: DriverStatus,
        new: DriverStatus,
        seen_at: Option<DateTime<Utc>>,
    ) -> DispatchResult<bool> {
        let mut table = self.table.write();
        let driver = table.get_mut(driver_id)?;
        if driver.status != expected {
            return Ok(false);
        }
        driver.status = new;
        if let Some(seen_at) = seen_at {
            driver.last_seen = seen_at;
        }
        Ok(true)
    }

    async fn touch(&self, driver_id: DriverId, now: DateTime<Utc>) -> DispatchResult<Driver> {
        let mut table = self.table.write();
        let driver = table.get_mut(driver_id)?;
        driver.last_seen = now;
        Ok(driver.clone())
    }

    async fn claim_first_online(&self, ride_id: RideId) -> DispatchResult<Option<Driver>> {
        let mut table = self.table.write();
        let claimed = table
            .drivers
            .values_mut()
            .find(|driver| driver.status == DriverStatus::Online && !driver.is_bound())
            .map(|driver| {
                driver.status = DriverStatus::OnTrip;
                driver.current_ride = Some(ride_id);
                driver.clone()
            });
        Ok(claimed)
    }

    async fn release_from_ride(
        &self,
        driver_id: DriverId,
        ride_id: RideId,
        seen_at: DateTime<Utc>,
    ) -> DispatchResult<bool> {
        let mut table = self.table.write();
        let driver = table.get_mut(driver_id)?;
        if driver.current_ride != Some(ride_id) {
            return Ok(false);
        }

        driver.current_ride = None;
        if driver.status != DriverStatus::OnTrip {
            return Ok(false);
        }
        driver.status = DriverStatus::Online;
        driver.last_seen = seen_at;
        Ok(true)
    }

    async fn demote_stale(&self, cutoff: DateTime<Utc>) -> DispatchResult<Vec<DriverId>> {
        let mut table = self.table.write();
        let demoted = table
            .drivers
            .values_mut()
            .filter(|driver| driver.status == DriverStatus::Online && driver.last_seen < cutoff)
            .map(|driver| {
                driver.status = DriverStatus::Offline;
                driver.driver_id
            })
            .collect();
        Ok(demoted)
    }
}

#[derive(Debug)]
struct RideTable {
    next_id: RideId,
    rides: BTreeMap<RideId, Ride>,
}

impl Default for RideTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            rides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRideRepository {
    table: RwLock<RideTable>,
}

impl InMemoryRideRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RideRepository for InMemoryRideRepository {
    async fn insert(&self, ride: NewRide, now: DateTime<Utc>) -> DispatchResult<Ride> {
        let mut table = self.table.write();
        let ride_id = table.next_id;
        table.next_id += 1;

        let record = Ride {
            ride_id,
            requester_id: ride.requester_id,
            origin: ride.origin,
            destination: ride.destination,
            status: RideStatus::Pending,
            driver_id: None,
            port: None,
            session: None,
            created_at: now,
            assigned_at: None,
            completed_at: None,
        };
        table.rides.insert(ride_id, record.clone());
        Ok(record)
    }

    async fn get(&self, ride_id: RideId) -> DispatchResult<Option<Ride>> {
        Ok(self.table.read().rides.get(&ride_id).cloned())
    }

    async fn list_ordered(&self) -> DispatchResult<Vec<Ride>> {
        Ok(self.table.read().rides.values().cloned().collect())
    }

    async fn list_by_status(&self, status: RideStatus) -> DispatchResult<Vec<Ride>> {
        Ok(self
            .table
            .read()
            .rides
            .values()
            .filter(|ride| ride.status == status)
            .cloned()
            .collect())
    }

    async fn transition(&self, ride_id: RideId, update: RideUpdate) -> DispatchResult<Ride> {
        let mut table = self.table.write();
        let ride = table
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| DispatchError::not_found(EntityKind::Ride, ride_id))?;

        let target = update.event().apply(ride_id, ride.status)?;
        update.apply_to(ride, target);
        Ok(ride.clone())
    }

    async fn find_active_by_port(&self, port: Port) -> DispatchResult<Option<Ride>> {
        Ok(self
            .table
            .read()
            .rides
            .values()
            .find(|ride| ride.holds_port(port))
            .cloned())
    }
}
