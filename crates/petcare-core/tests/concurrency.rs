//! Racing writers: at most one creation per conflicting window, at most one
//! transition out of a given status.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{backends, monday, open_mondays, owner, sitter, walk};
use petcare_core::{BookingFilter, BookingStatus, ConflictReason, CoreError};

const RACERS: usize = 8;

#[test]
fn overlapping_creations_admit_one_winner() {
    for (name, fx) in backends() {
        let app = Arc::new(fx.app);
        open_mondays(&app);
        let barrier = Arc::new(Barrier::new(RACERS));

        let handles: Vec<_> = (0..RACERS)
            .map(|i| {
                let app = app.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    // Every window overlaps 11:00-12:00.
                    let start = monday(10, (i as u32) * 5);
                    app.bookings()
                        .create(&owner(&format!("owner-{i}")), walk(start, monday(12, 0)))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "{name}");
        for result in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(result, CoreError::Conflict(ConflictReason::OverlappingBooking)),
                "{name}: {result}"
            );
        }
        let listed = app.bookings().list(&sitter(), &BookingFilter::sitter("sam")).unwrap();
        assert_eq!(listed.len(), 1, "{name}");
    }
}

#[test]
fn different_sitters_do_not_contend() {
    for (name, fx) in backends() {
        let app = Arc::new(fx.app);
        for i in 0..RACERS {
            let id = format!("sitter-{i}");
            app.availability()
                .set_weekly_rule(
                    &petcare_core::Actor::sitter(id.as_str()),
                    &id,
                    petcare_core::DayOfWeek::Monday,
                    "09:00-17:00".parse().unwrap(),
                    true,
                )
                .unwrap();
        }
        let barrier = Arc::new(Barrier::new(RACERS));
        let handles: Vec<_> = (0..RACERS)
            .map(|i| {
                let app = app.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let mut request = walk(monday(10, 0), monday(12, 0));
                    request.sitter_id = format!("sitter-{i}");
                    app.bookings().create(&owner("olive"), request)
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_ok(), "{name}");
        }
    }
}

#[test]
fn racing_accept_and_reject_apply_once() {
    for (name, fx) in backends() {
        let app = Arc::new(fx.app);
        open_mondays(&app);
        let booking = app
            .bookings()
            .create(&owner("olive"), walk(monday(10, 0), monday(12, 0)))
            .unwrap();
        let barrier = Arc::new(Barrier::new(RACERS));

        let handles: Vec<_> = (0..RACERS)
            .map(|i| {
                let app = app.clone();
                let barrier = barrier.clone();
                let id = booking.id.clone();
                thread::spawn(move || {
                    let target = if i % 2 == 0 {
                        BookingStatus::Accepted
                    } else {
                        BookingStatus::Rejected
                    };
                    barrier.wait();
                    app.bookings().transition(&sitter(), &id, target)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let applied: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(applied.len(), 1, "{name}");
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(err, CoreError::InvalidTransition { .. }), "{name}: {err}");
        }

        let stored = app.bookings().get(&sitter(), &booking.id).unwrap();
        assert_eq!(stored.status, applied[0].status, "{name}");
    }
}

#[test]
fn racing_reviews_store_one() {
    for (name, fx) in backends() {
        let app = Arc::new(fx.app);
        open_mondays(&app);
        let booking = app
            .bookings()
            .create(&owner("olive"), walk(monday(10, 0), monday(12, 0)))
            .unwrap();
        app.bookings().transition(&sitter(), &booking.id, BookingStatus::Accepted).unwrap();
        app.bookings().transition(&sitter(), &booking.id, BookingStatus::Completed).unwrap();

        let barrier = Arc::new(Barrier::new(RACERS));
        let handles: Vec<_> = (0..RACERS)
            .map(|i| {
                let app = app.clone();
                let barrier = barrier.clone();
                let id = booking.id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    app.reviews()
                        .create_review(&owner("olive"), &id, 1 + (i as i64 % 5), "")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{name}");
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(err, CoreError::Duplicate(_)), "{name}: {err}");
        }
        assert_eq!(app.reviews().reviews_for_sitter("sam").unwrap().len(), 1, "{name}");
    }
}
