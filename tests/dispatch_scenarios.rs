//! End-to-end lifecycle scenarios on tokio's paused clock.

mod common;

use common::*;
use ride_dispatch::{DispatchEvent, DriverStatus, RideStatus};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn two_drivers_one_ride_binds_exactly_one() {
    let engine = engine();
    let asha = engine.online_driver("asha").await;
    let ravi = engine.online_driver("ravi").await;

    let booking = engine
        .service()
        .book_ride(1, "Koramangala", "MG Road")
        .await
        .unwrap();

    assert_eq!(booking.status, RideStatus::Assigned);
    assert_eq!(booking.driver_id, Some(asha));
    assert_eq!(booking.port, Some(TEST_BASE_PORT));
    assert_eq!(engine.driver_status(asha).await, DriverStatus::OnTrip);
    assert_eq!(engine.driver_status(ravi).await, DriverStatus::Online);
    engine.assert_invariants().await;
}

#[tokio::test(start_paused = true)]
async fn ride_waits_until_a_driver_comes_online() {
    let engine = engine();

    let booking = engine.service().book_ride(1, "Indiranagar", "Airport").await.unwrap();
    assert_eq!(booking.status, RideStatus::Pending);
    assert!(booking.port.is_none());
    assert!(engine.system.dispatcher().ports().allocated_ports().is_empty());

    let driver = engine.register_driver("asha").await;
    let online = engine.service().go_online(driver).await.unwrap();

    assert_eq!(online.assigned_rides, vec![booking.ride_id]);
    let ride = engine.ride(booking.ride_id).await;
    assert_eq!(ride.status, RideStatus::Assigned);
    assert_eq!(ride.driver_id, Some(driver));
    assert_eq!(ride.port, Some(TEST_BASE_PORT));
    engine.assert_invariants().await;
}

#[tokio::test(start_paused = true)]
async fn trip_completion_returns_driver_and_frees_port() {
    let engine = engine();
    let driver = engine.online_driver("asha").await;
    let booking = engine.service().book_ride(1, "A", "B").await.unwrap();
    let port = booking.port.unwrap();

    tokio::time::sleep(TRIP - Duration::from_secs(1)).await;
    assert_eq!(engine.ride(booking.ride_id).await.status, RideStatus::Assigned);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let ride = engine.ride(booking.ride_id).await;
    assert_eq!(ride.status, RideStatus::Completed);
    assert_eq!(engine.driver_status(driver).await, DriverStatus::Online);
    assert!(!engine.system.dispatcher().ports().is_in_use(port));
    assert!(engine.sessions.running_ports().is_empty());

    // The freed port goes to the next booking
    let next = engine.service().book_ride(2, "C", "D").await.unwrap();
    assert_eq!(next.port, Some(port));
    engine.assert_invariants().await;
}

#[tokio::test(start_paused = true)]
async fn driver_offline_mid_trip_stays_offline_after_completion() {
    let engine = engine();
    let driver = engine.online_driver("asha").await;
    let booking = engine.service().book_ride(1, "A", "B").await.unwrap();

    tokio::time::sleep(Duration::from_secs(20)).await;
    let offline = engine.service().go_offline(driver).await.unwrap();
    assert_eq!(offline.status, DriverStatus::Offline);

    finish_trip().await;

    assert_eq!(engine.ride(booking.ride_id).await.status, RideStatus::Completed);
    assert_eq!(engine.driver_status(driver).await, DriverStatus::Offline);
    assert!(engine.system.dispatcher().ports().allocated_ports().is_empty());
    engine.assert_invariants().await;
}

#[tokio::test(start_paused = true)]
async fn one_driver_three_rides_serves_them_in_order() {
    let engine = engine();
    let driver = engine.online_driver("asha").await;

    let mut ride_ids = Vec::new();
    for requester in 1..=3 {
        let booking = engine.service().book_ride(requester, "A", "B").await.unwrap();
        ride_ids.push(booking.ride_id);
    }

    assert_eq!(engine.ride(ride_ids[0]).await.status, RideStatus::Assigned);
    assert_eq!(engine.ride(ride_ids[1]).await.status, RideStatus::Pending);
    assert_eq!(engine.ride(ride_ids[2]).await.status, RideStatus::Pending);

    finish_trip().await;

    assert_eq!(engine.ride(ride_ids[0]).await.status, RideStatus::Completed);
    let second = engine.ride(ride_ids[1]).await;
    assert_eq!(second.status, RideStatus::Assigned);
    assert_eq!(second.driver_id, Some(driver));
    assert_eq!(engine.ride(ride_ids[2]).await.status, RideStatus::Pending);
    assert_eq!(
        engine.service().next_pending().await.unwrap().unwrap().ride_id,
        ride_ids[2]
    );
    engine.assert_invariants().await;

    finish_trip().await;
    finish_trip().await;
    let statuses: Vec<_> = engine
        .service()
        .queue()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.status)
        .collect();
    assert_eq!(statuses, vec![RideStatus::Completed; 3]);
}

#[tokio::test(start_paused = true)]
async fn evicted_driver_gets_no_new_rides_until_back_online() {
    let engine = engine();
    let stale = engine.online_driver("stale").await;

    engine.clock.advance_secs(11);
    let available = engine.service().available_drivers().await.unwrap();
    assert!(available.is_empty());
    assert_eq!(engine.driver_status(stale).await, DriverStatus::Offline);

    let booking = engine.service().book_ride(1, "A", "B").await.unwrap();
    assert_eq!(booking.status, RideStatus::Pending);

    let online = engine.service().go_online(stale).await.unwrap();
    assert_eq!(online.assigned_rides, vec![booking.ride_id]);
}

#[tokio::test(start_paused = true)]
async fn heartbeats_keep_a_driver_available() {
    let engine = engine();
    let driver = engine.online_driver("asha").await;

    for _ in 0..5 {
        engine.clock.advance_secs(8);
        engine.service().heartbeat(driver).await.unwrap();
        assert_eq!(engine.service().available_drivers().await.unwrap().len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn lifecycle_events_are_published_in_order() {
    let engine = engine();
    engine.online_driver("asha").await;
    let mut events = engine.system.subscribe();

    let booking = engine.service().book_ride(1, "A", "B").await.unwrap();
    finish_trip().await;

    let mut names = Vec::new();
    while let Ok(published) = events.try_recv() {
        if published.event.ride_id() == Some(booking.ride_id) {
            names.push(published.event.name());
        }
    }
    assert_eq!(
        names,
        vec!["ride.requested", "ride.assigned", "ride.completed"]
    );

    let completed = DispatchEvent::RideCompleted {
        ride_id: booking.ride_id,
        driver_id: booking.driver_id,
        port: booking.port,
    };
    assert_eq!(completed.name(), "ride.completed");
}

#[tokio::test(start_paused = true)]
async fn lookup_by_port_only_sees_active_rides() {
    let engine = engine();
    engine.online_driver("asha").await;
    let booking = engine.service().book_ride(1, "A", "B").await.unwrap();
    let port = booking.port.unwrap();

    let holder = engine.service().ride_by_port(port).await.unwrap();
    assert_eq!(holder.ride_id, booking.ride_id);

    finish_trip().await;
    assert!(engine.service().ride_by_port(port).await.unwrap_err().is_not_found());
}
