//! End-to-end booking flows against both store backends.

mod common;

use chrono::NaiveDate;
use common::{backends, monday, open_mondays, owner, sitter, walk};
use petcare_core::{BookingFilter, BookingStatus, ConflictReason, CoreError, ServiceType};

#[test]
fn overlapping_request_for_same_sitter_conflicts() {
    for (name, fx) in backends() {
        let app = &fx.app;
        open_mondays(app);

        let first = app
            .bookings()
            .create(&owner("olive"), walk(monday(10, 0), monday(12, 0)))
            .unwrap();
        assert_eq!(first.status, BookingStatus::Pending, "{name}");

        let err = app
            .bookings()
            .create(&owner("otto"), walk(monday(11, 0), monday(13, 0)))
            .unwrap_err();
        assert!(
            matches!(err, CoreError::Conflict(ConflictReason::OverlappingBooking)),
            "{name}: {err}"
        );
    }
}

#[test]
fn unavailable_override_blocks_weekly_window() {
    for (name, fx) in backends() {
        let app = &fx.app;
        open_mondays(app);
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        app.availability()
            .set_date_override(&sitter(), "sam", date, false, None)
            .unwrap();

        let err = app
            .bookings()
            .create(&owner("olive"), walk(monday(10, 0), monday(12, 0)))
            .unwrap_err();
        assert!(
            matches!(err, CoreError::Conflict(ConflictReason::OutsideAvailability)),
            "{name}: {err}"
        );

        // The next Monday is untouched by the override.
        let week = chrono::Duration::days(7);
        let next = walk(monday(10, 0) + week, monday(12, 0) + week);
        assert!(app.bookings().create(&owner("olive"), next).is_ok(), "{name}");
    }
}

#[test]
fn owner_cannot_accept_own_request() {
    for (name, fx) in backends() {
        let app = &fx.app;
        open_mondays(app);
        let booking = app
            .bookings()
            .create(&owner("olive"), walk(monday(10, 0), monday(12, 0)))
            .unwrap();

        let err = app
            .bookings()
            .transition(&owner("olive"), &booking.id, BookingStatus::Accepted)
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)), "{name}: {err}");
        assert_eq!(
            app.bookings().get(&owner("olive"), &booking.id).unwrap().status,
            BookingStatus::Pending,
            "{name}"
        );
    }
}

#[test]
fn completed_booking_takes_exactly_one_review() {
    for (name, fx) in backends() {
        let app = &fx.app;
        open_mondays(app);
        let booking = app
            .bookings()
            .create(&owner("olive"), walk(monday(10, 0), monday(12, 0)))
            .unwrap();
        app.bookings()
            .transition(&sitter(), &booking.id, BookingStatus::Accepted)
            .unwrap();

        // Not reviewable until completed.
        let early = app.reviews().create_review(&owner("olive"), &booking.id, 5, "");
        assert!(matches!(early, Err(CoreError::InvalidState(_))), "{name}");

        app.bookings()
            .transition(&sitter(), &booking.id, BookingStatus::Completed)
            .unwrap();
        let review = app
            .reviews()
            .create_review(&owner("olive"), &booking.id, 5, "Rex loved it")
            .unwrap();
        assert_eq!(review.sitter_id, "sam", "{name}");

        let err = app
            .reviews()
            .create_review(&owner("olive"), &booking.id, 5, "again")
            .unwrap_err();
        assert!(matches!(err, CoreError::Duplicate(_)), "{name}: {err}");

        let summary = app.reviews().rating_summary("sam").unwrap();
        assert_eq!(summary.count, 1, "{name}");
        assert_eq!(summary.average, Some(5.0), "{name}");
    }
}

#[test]
fn cancelled_and_rejected_bookings_free_the_window() {
    for (name, fx) in backends() {
        let app = &fx.app;
        open_mondays(app);
        let window = || walk(monday(10, 0), monday(12, 0));

        let a = app.bookings().create(&owner("olive"), window()).unwrap();
        app.bookings().cancel(&owner("olive"), &a.id).unwrap();

        let b = app.bookings().create(&owner("otto"), window()).unwrap();
        app.bookings()
            .transition(&sitter(), &b.id, BookingStatus::Rejected)
            .unwrap();

        let c = app.bookings().create(&owner("olive"), window()).unwrap();
        assert_eq!(c.status, BookingStatus::Pending, "{name}");

        // Cancelling a rejected booking is not a legal edge.
        let err = app.bookings().cancel(&owner("otto"), &b.id).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }), "{name}");
    }
}

#[test]
fn listings_follow_creation_order() {
    for (name, fx) in backends() {
        let app = &fx.app;
        open_mondays(app);
        let mut created = Vec::new();
        for (h, who) in [(15, "olive"), (9, "otto"), (12, "olive")] {
            let booking = app
                .bookings()
                .create(&owner(who), walk(monday(h, 0), monday(h + 1, 0)))
                .unwrap();
            created.push(booking.id);
        }
        app.bookings()
            .transition(&sitter(), &created[2], BookingStatus::Accepted)
            .unwrap();

        let for_sam: Vec<_> = app
            .bookings()
            .list(&sitter(), &BookingFilter::sitter("sam"))
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(for_sam, created, "{name}");

        let pending = BookingFilter::owner("olive").with_status(BookingStatus::Pending);
        let olive_pending = app.bookings().list(&owner("olive"), &pending).unwrap();
        assert_eq!(olive_pending.len(), 1, "{name}");
        assert_eq!(olive_pending[0].id, created[0], "{name}");

        let filter = BookingFilter::sitter("sam");
        let again = app.bookings().list(&sitter(), &filter).unwrap();
        assert_eq!(again, app.bookings().list(&sitter(), &filter).unwrap(), "{name}");

        let err = app.bookings().list(&owner("mallory"), &BookingFilter::owner("olive"));
        assert!(matches!(err, Err(CoreError::Forbidden(_))), "{name}");
    }
}

#[test]
fn sitter_offset_moves_the_working_day() {
    for (name, fx) in backends() {
        let app = &fx.app;
        open_mondays(app);
        // Sam is at UTC-05:00: Monday 09:00-17:00 local is 14:00-22:00 UTC.
        app.availability().set_timezone(&sitter(), "sam", -300).unwrap();

        let utc_morning = app
            .bookings()
            .check_conflict("sam", monday(10, 0), monday(12, 0), ServiceType::Walking, None)
            .unwrap();
        assert!(!utc_morning.available, "{name}");

        let local_morning = app
            .bookings()
            .check_conflict("sam", monday(15, 0), monday(17, 0), ServiceType::Walking, None)
            .unwrap();
        assert!(local_morning.available, "{name}");
    }
}

#[test]
fn booking_survives_reopening_the_database() {
    use petcare_core::{Config, PetCare, SqliteStore};
    use std::sync::Arc;

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("petcare.db");
    let id = {
        let app = PetCare::new(Arc::new(SqliteStore::open(&path).unwrap()), Config::default());
        open_mondays(&app);
        app.bookings()
            .create(&owner("olive"), walk(monday(10, 0), monday(12, 0)))
            .unwrap()
            .id
    };

    let app = PetCare::new(Arc::new(SqliteStore::open(&path).unwrap()), Config::default());
    let booking = app.bookings().get(&sitter(), &id).unwrap();
    assert_eq!(booking.start_date, monday(10, 0));
    assert_eq!(booking.price, 25.0);
    assert_eq!(app.availability().weekly_rules("sam").unwrap().len(), 1);
}

#[test]
fn booking_conversation_is_private_to_its_parties() {
    for (name, fx) in backends() {
        let app = &fx.app;
        open_mondays(app);
        let booking = app
            .bookings()
            .create(&owner("olive"), walk(monday(10, 0), monday(12, 0)))
            .unwrap();

        app.messages()
            .post_message(&owner("olive"), &booking.id, "spare key with the neighbour")
            .unwrap();
        app.bookings().cancel(&owner("olive"), &booking.id).unwrap();
        // The thread outlives the booking's live states.
        app.messages()
            .post_message(&sitter(), &booking.id, "sorry to miss Rex")
            .unwrap();

        let thread = app.messages().booking_messages(&owner("olive"), &booking.id).unwrap();
        assert_eq!(thread.len(), 2, "{name}");
        assert_eq!(thread[0].sender_id, "olive", "{name}");
        assert_eq!(thread[1].sender_id, "sam", "{name}");

        let err = app.messages().booking_messages(&owner("mallory"), &booking.id);
        assert!(matches!(err, Err(CoreError::NotFound(_))), "{name}");
    }
}
