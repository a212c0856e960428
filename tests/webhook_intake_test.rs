//! Integration tests for the webhook intake endpoint.
//!
//! These drive the real router with in-memory fakes behind the dispatcher's
//! collaborator traits, so every HTTP-visible property is exercised without a
//! database.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use calbridge::analytics_events::NewAnalyticsEvent;
use calbridge::bookings::{Booking, NewBooking};
use calbridge::signature;
use calbridge::web::AppState;
use calbridge::webhook_deliveries::{NewWebhookDelivery, WebhookDelivery};
use calbridge::webhook_dispatcher::{
    AnalyticsSink, BookingStore, DeliveryJournal, RefundIssuer, WebhookDispatcher,
};

const SECRET: &str = "whsec_integration";

#[derive(Default)]
struct FakeBookingStore {
    bookings: Mutex<Vec<Booking>>,
    fail: bool,
}

#[async_trait]
impl BookingStore for FakeBookingStore {
    async fn create_booking(&self, new_booking: NewBooking) -> Result<Booking> {
        if self.fail {
            anyhow::bail!("connection refused");
        }
        let mut bookings = self.bookings.lock().unwrap();
        // Mirror the unique-uid guard of the real store: a redelivered uid
        // returns the record stored by the first delivery
        if let Some(existing) = bookings.iter().find(|b| b.uid == new_booking.uid) {
            return Ok(existing.clone());
        }
        let booking = Booking {
            id: Uuid::new_v4(),
            booking_id: new_booking.booking_id,
            uid: new_booking.uid,
            title: new_booking.title,
            attendees: new_booking.attendees,
            organizer_id: new_booking.organizer_id,
            organizer_email: new_booking.organizer_email,
            organizer_username: new_booking.organizer_username,
            organizer_name: new_booking.organizer_name,
            start_time: new_booking.start_time,
            end_time: new_booking.end_time,
            duration_minutes: new_booking.duration_minutes,
            event_type_id: new_booking.event_type_id,
            payment_id: new_booking.payment_id,
            mentor_user_id: new_booking.mentor_user_id,
            video_call_url: new_booking.video_call_url,
            raw_payload: new_booking.raw_payload,
            created_at: Utc::now(),
        };
        bookings.push(booking.clone());
        Ok(booking)
    }
}

#[derive(Default)]
struct FakeRefunds {
    refunded: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl RefundIssuer for FakeRefunds {
    async fn issue_refund(&self, payment_id: &str) -> Result<()> {
        if self.fail {
            anyhow::bail!("refund API unavailable");
        }
        self.refunded.lock().unwrap().push(payment_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeAnalytics {
    events: Mutex<Vec<NewAnalyticsEvent>>,
}

#[async_trait]
impl AnalyticsSink for FakeAnalytics {
    async fn emit(&self, new_event: NewAnalyticsEvent) -> Result<()> {
        self.events.lock().unwrap().push(new_event);
        Ok(())
    }
}

#[derive(Default)]
struct FakeJournal {
    records: Mutex<Vec<(String, bool, Option<String>)>>,
    fail: bool,
}

#[async_trait]
impl DeliveryJournal for FakeJournal {
    async fn record(&self, new_delivery: NewWebhookDelivery) -> Result<WebhookDelivery> {
        if self.fail {
            anyhow::bail!("journal table unavailable");
        }
        let delivery = WebhookDelivery {
            id: Uuid::new_v4(),
            trigger_event: new_delivery.trigger_event.clone(),
            payload: new_delivery.payload,
            processed: false,
            processing_error: None,
            created_at: Utc::now(),
        };
        self.records
            .lock()
            .unwrap()
            .push((new_delivery.trigger_event, false, None));
        Ok(delivery)
    }

    async fn mark_processed(&self, _delivery_id: Uuid) -> Result<()> {
        if let Some(last) = self.records.lock().unwrap().last_mut() {
            last.1 = true;
        }
        Ok(())
    }

    async fn mark_failed(&self, _delivery_id: Uuid, error: &str) -> Result<()> {
        if let Some(last) = self.records.lock().unwrap().last_mut() {
            last.1 = true;
            last.2 = Some(error.to_string());
        }
        Ok(())
    }
}

struct Harness {
    store: Arc<FakeBookingStore>,
    refunds: Arc<FakeRefunds>,
    analytics: Arc<FakeAnalytics>,
    journal: Arc<FakeJournal>,
    router: Router,
}

impl Harness {
    fn new() -> Self {
        Self::build(
            FakeBookingStore::default(),
            FakeRefunds::default(),
            FakeJournal::default(),
        )
    }

    fn build(store: FakeBookingStore, refunds: FakeRefunds, journal: FakeJournal) -> Self {
        let store = Arc::new(store);
        let refunds = Arc::new(refunds);
        let analytics = Arc::new(FakeAnalytics::default());
        let journal = Arc::new(journal);

        let dispatcher = Arc::new(WebhookDispatcher::new(
            SECRET.to_string(),
            store.clone(),
            refunds.clone(),
            analytics.clone(),
            journal.clone(),
        ));

        // The read API is not exercised here; the pool never connects
        let manager =
            ConnectionManager::<PgConnection>::new("postgres://localhost/calbridge_unused");
        let pool = Pool::builder().max_size(1).build_unchecked(manager);

        let router = calbridge::build_router(AppState { pool, dispatcher });

        Self {
            store,
            refunds,
            analytics,
            journal,
            router,
        }
    }

    async fn deliver(&self, body: &serde_json::Value) -> (StatusCode, serde_json::Value) {
        let bytes = serde_json::to_vec(body).unwrap();
        let sig = signature::sign(SECRET, &bytes);
        self.send(bytes, Some(&sig)).await
    }

    async fn send(
        &self,
        bytes: Vec<u8>,
        sig: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhooks/cal")
            .header("content-type", "application/json");
        if let Some(sig) = sig {
            builder = builder.header("X-Cal-Signature-256", sig);
        }
        let request = builder.body(Body::from(bytes)).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }
}

fn booking_created_event(uid: &str) -> serde_json::Value {
    serde_json::json!({
        "triggerEvent": "BOOKING_CREATED",
        "payload": {
            "bookingId": 101,
            "uid": uid,
            "title": "Career mentoring",
            "attendees": [
                {"name": "Mentee", "email": "mentee@example.com", "timeZone": "America/New_York"}
            ],
            "startTime": "2026-09-15T14:00:00Z",
            "length": 30,
            "organizer": {
                "id": 55,
                "email": "mentor@example.com",
                "username": "mentor55",
                "name": "A Mentor"
            },
            "eventTypeId": 12,
            "metadata": {"mentorUserId": "user_55", "videoCallUrl": "https://cal.example/video/x"}
        }
    })
}

#[tokio::test]
async fn wrong_signature_is_rejected_without_side_effects() {
    let harness = Harness::new();
    let bytes = serde_json::to_vec(&booking_created_event("uid-1")).unwrap();
    let bad_sig = signature::sign("wrong-secret", &bytes);

    let (status, body) = harness.send(bytes, Some(&bad_sig)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("signature"));
    assert!(harness.store.bookings.lock().unwrap().is_empty());
    assert!(harness.journal.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let harness = Harness::new();
    let bytes = serde_json::to_vec(&booking_created_event("uid-1")).unwrap();

    let (status, _) = harness.send(bytes, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(harness.store.bookings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unparsable_body_is_rejected() {
    let harness = Harness::new();
    let bytes = b"{not json".to_vec();
    let sig = signature::sign(SECRET, &bytes);

    let (status, body) = harness.send(bytes, Some(&sig)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn booking_created_stores_record_with_computed_end_time() {
    let harness = Harness::new();

    let (status, body) = harness.deliver(&booking_created_event("uid-end")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["uid"], "uid-end");
    // 14:00 start + 30 minutes
    assert_eq!(body["startTime"], "2026-09-15T14:00:00+00:00");
    assert_eq!(body["endTime"], "2026-09-15T14:30:00+00:00");
    assert_eq!(body["durationMinutes"], 30);
    assert_eq!(body["mentorUserId"], "user_55");

    let bookings = harness.store.bookings.lock().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(
        (bookings[0].end_time - bookings[0].start_time).num_minutes(),
        30
    );
}

#[tokio::test]
async fn booking_created_missing_attendees_is_rejected() {
    let harness = Harness::new();
    let mut event = booking_created_event("uid-2");
    event["payload"].as_object_mut().unwrap().remove("attendees");

    let (status, body) = harness.deliver(&event).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("validation"));
    assert!(harness.store.bookings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn booking_created_empty_attendees_is_rejected() {
    let harness = Harness::new();
    let mut event = booking_created_event("uid-3");
    event["payload"]["attendees"] = serde_json::json!([]);

    let (status, _) = harness.deliver(&event).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(harness.store.bookings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn booking_store_failure_returns_500() {
    let harness = Harness::build(
        FakeBookingStore {
            fail: true,
            ..Default::default()
        },
        FakeRefunds::default(),
        FakeJournal::default(),
    );

    let (status, body) = harness.deliver(&booking_created_event("uid-4")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("store"));

    // The failure is journaled for postmortem
    let records = harness.journal.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].2.is_some());
}

#[tokio::test]
async fn redelivered_booking_created_stores_exactly_one_record() {
    let harness = Harness::new();
    let event = booking_created_event("uid-dup");

    let (first_status, first_body) = harness.deliver(&event).await;
    let (second_status, second_body) = harness.deliver(&event).await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::CREATED);
    // Redelivery returns the record stored by the first delivery
    assert_eq!(first_body["id"], second_body["id"]);
    assert_eq!(harness.store.bookings.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn no_show_without_payment_id_is_rejected() {
    let harness = Harness::new();
    let event = serde_json::json!({
        "triggerEvent": "AFTER_HOSTS_CAL_VIDEO_NO_SHOW",
        "payload": {"metadata": {"mentorUserId": "user_55"}}
    });

    let (status, body) = harness.deliver(&event).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("payment id"));
    assert!(harness.refunds.refunded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn no_show_with_payment_id_issues_refund() {
    let harness = Harness::new();
    let event = serde_json::json!({
        "triggerEvent": "AFTER_HOSTS_CAL_VIDEO_NO_SHOW",
        "payload": {"metadata": {"paymentId": "pi_noshow_1"}}
    });

    let (status, body) = harness.deliver(&event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(
        *harness.refunds.refunded.lock().unwrap(),
        vec!["pi_noshow_1".to_string()]
    );
}

#[tokio::test]
async fn refund_failure_returns_500_with_refund_message() {
    let harness = Harness::build(
        FakeBookingStore::default(),
        FakeRefunds {
            fail: true,
            ..Default::default()
        },
        FakeJournal::default(),
    );
    let event = serde_json::json!({
        "triggerEvent": "AFTER_HOSTS_CAL_VIDEO_NO_SHOW",
        "payload": {"metadata": {"paymentId": "pi_noshow_2"}}
    });

    let (status, body) = harness.deliver(&event).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // Distinct from the booking-storage message
    assert!(body["error"].as_str().unwrap().contains("refund"));
}

#[tokio::test]
async fn meeting_ended_emits_one_completed_booking_event() {
    let harness = Harness::new();
    let event = serde_json::json!({
        "triggerEvent": "MEETING_ENDED",
        "payload": {"metadata": {"mentorUserId": "user_77", "actorUserId": "user_12"}}
    });

    let (status, body) = harness.deliver(&event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let events = harness.analytics.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "completed_booking");
    assert_eq!(events[0].target_user_id, "user_77");
    assert_eq!(events[0].actor_user_id.as_deref(), Some("user_12"));
}

#[tokio::test]
async fn meeting_ended_without_mentor_emits_nothing() {
    let harness = Harness::new();
    let event = serde_json::json!({
        "triggerEvent": "MEETING_ENDED",
        "payload": {"metadata": {}}
    });

    let (status, _) = harness.deliver(&event).await;

    assert_eq!(status, StatusCode::OK);
    assert!(harness.analytics.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn log_only_kinds_are_acknowledged() {
    let harness = Harness::new();
    for kind in [
        "BOOKING_CANCELLED",
        "MEETING_STARTED",
        "RECORDING_READY",
        "RECORDING_TRANSCRIPTION_GENERATED",
    ] {
        let event = serde_json::json!({"triggerEvent": kind, "payload": {}});
        let (status, body) = harness.deliver(&event).await;
        assert_eq!(status, StatusCode::OK, "kind {kind}");
        assert_eq!(body["received"], true);
    }
    assert!(harness.store.bookings.lock().unwrap().is_empty());
    assert!(harness.refunds.refunded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unrecognized_kind_is_acknowledged_not_rejected() {
    let harness = Harness::new();
    let event = serde_json::json!({"triggerEvent": "SOME_FUTURE_EVENT", "payload": {}});

    let (status, body) = harness.deliver(&event).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn status_endpoint_reports_service_and_uptime() {
    let harness = Harness::new();
    let request = Request::builder()
        .method("GET")
        .uri("/status")
        .body(Body::empty())
        .unwrap();

    let response = harness.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["service"], "calbridge");
    assert!(json["data"]["uptimeSeconds"].is_u64());
}

#[tokio::test]
async fn journal_failure_does_not_change_the_response() {
    let harness = Harness::build(
        FakeBookingStore::default(),
        FakeRefunds::default(),
        FakeJournal {
            fail: true,
            ..Default::default()
        },
    );

    let (status, body) = harness.deliver(&booking_created_event("uid-journal")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["uid"], "uid-journal");
    assert_eq!(harness.store.bookings.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn deliveries_are_journaled_with_outcome() {
    let harness = Harness::new();

    harness.deliver(&booking_created_event("uid-j1")).await;
    let no_show = serde_json::json!({
        "triggerEvent": "AFTER_HOSTS_CAL_VIDEO_NO_SHOW",
        "payload": {"metadata": {}}
    });
    harness.deliver(&no_show).await;

    let records = harness.journal.records.lock().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].0, "BOOKING_CREATED");
    assert!(records[0].1);
    assert!(records[0].2.is_none());
    assert_eq!(records[1].0, "AFTER_HOSTS_CAL_VIDEO_NO_SHOW");
    assert!(records[1].1);
    assert!(records[1].2.is_some());
}
