use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::scheduling::router::schedule_router;
use crate::scheduling::service::CancelTarget;

fn post(uri: &str, body: serde_json::Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&body).expect("serializable body"),
        ))
        .expect("request builds")
}

fn get(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::get(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

fn delete(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::delete(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn slot_registration_round_trips_over_http() {
    let router = schedule_router(service());

    let response = router
        .oneshot(post(
            "/api/v1/schedule/slots",
            json!({
                "day_of_week": 1,
                "start_time": "09:00:00",
                "end_time": "10:00:00",
                "max_capacity": 2,
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("day_of_week"), Some(&json!(1)));
    assert_eq!(payload.get("active"), Some(&json!(true)));
    assert!(payload.get("id").is_some());
}

#[tokio::test]
async fn invalid_slot_specs_are_bad_requests() {
    let router = schedule_router(service());

    let response = router
        .oneshot(post(
            "/api/v1/schedule/slots",
            json!({
                "day_of_week": 7,
                "start_time": "09:00:00",
                "end_time": "10:00:00",
                "max_capacity": 2,
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload.get("error").is_some());
}

#[tokio::test]
async fn enrollment_conflicts_map_to_conflict_status() {
    let service = service();
    let slot = monday_slot(&service, 1);
    let alice = student(&service, "Alice");
    let bruno = student(&service, "Bruno");
    let router = schedule_router(service.clone());

    let first = router
        .clone()
        .oneshot(post(
            "/api/v1/schedule/enrollments",
            json!({ "student_id": alice.id.0, "slot_id": slot.id.0 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::CREATED);

    let duplicate = router
        .clone()
        .oneshot(post(
            "/api/v1/schedule/enrollments",
            json!({ "student_id": alice.id.0, "slot_id": slot.id.0 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let full = router
        .oneshot(post(
            "/api/v1/schedule/enrollments",
            json!({ "student_id": bruno.id.0, "slot_id": slot.id.0 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(full.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_students_are_not_found() {
    let router = schedule_router(service());

    let response = router
        .oneshot(get("/api/v1/schedule/students/999"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn absence_requests_need_exactly_one_target() {
    let service = service();
    let slot = monday_slot(&service, 2);
    let alice = student(&service, "Alice");
    let enrollment = service.enroll(alice.id, slot.id).expect("enrollment succeeds");
    let router = schedule_router(service);
    let uri = format!("/api/v1/schedule/enrollments/{}/absences", enrollment.id.0);

    let neither = router
        .clone()
        .oneshot(post(&uri, json!({})))
        .await
        .expect("route executes");
    assert_eq!(neither.status(), StatusCode::BAD_REQUEST);

    let both = router
        .clone()
        .oneshot(post(&uri, json!({ "count": 1, "date": "2025-06-30" })))
        .await
        .expect("route executes");
    assert_eq!(both.status(), StatusCode::BAD_REQUEST);

    let by_count = router
        .oneshot(post(&uri, json!({ "count": 2 })))
        .await
        .expect("route executes");
    assert_eq!(by_count.status(), StatusCode::OK);
    let payload = read_json_body(by_count).await;
    assert_eq!(payload.get("credits_granted"), Some(&json!(2)));
    assert_eq!(
        payload.get("cancelled_dates"),
        Some(&json!(["2025-06-30", "2025-07-07"]))
    );
}

#[tokio::test]
async fn availability_reflects_absences_per_date() {
    let service = service();
    let slot = monday_slot(&service, 2);
    let alice = student(&service, "Alice");
    let enrollment = service.enroll(alice.id, slot.id).expect("enrollment succeeds");
    service
        .cancel_upcoming(enrollment.id, CancelTarget::Date(next_monday()))
        .expect("cancellation succeeds");
    let router = schedule_router(service);

    let uri = format!(
        "/api/v1/schedule/slots/{}/availability?date=2025-06-30",
        slot.id.0
    );
    let response = router
        .oneshot(get(&uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("seats_available"), Some(&json!(2)));
}

#[tokio::test]
async fn makeup_booking_round_trips_over_http() {
    let service = service();
    let monday = monday_slot(&service, 5);
    let tuesday = tuesday_slot(&service, 5);
    let bruno = student(&service, "Bruno");
    grant_credit(&service, &bruno, &monday, next_monday());
    let router = schedule_router(service);

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/schedule/makeups",
            json!({
                "student_id": bruno.id.0,
                "slot_id": tuesday.id.0,
                "date": "2025-06-24",
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("kind"), Some(&json!("booked")));
    let makeup_id = payload
        .get("makeup")
        .and_then(|m| m.get("id"))
        .and_then(serde_json::Value::as_u64)
        .expect("booking id");

    let cancelled = router
        .oneshot(delete(&format!("/api/v1/schedule/makeups/{makeup_id}")))
        .await
        .expect("route executes");
    assert_eq!(cancelled.status(), StatusCode::OK);
}

#[tokio::test]
async fn credit_exhaustion_is_a_bad_request() {
    let service = service();
    let tuesday = tuesday_slot(&service, 5);
    let bruno = student(&service, "Bruno");
    let router = schedule_router(service);

    let response = router
        .oneshot(post(
            "/api/v1/schedule/makeups",
            json!({
                "student_id": bruno.id.0,
                "slot_id": tuesday.id.0,
                "date": "2025-06-24",
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_no_class_days_conflict() {
    let router = schedule_router(service());
    let body = json!({ "date": "2025-12-25", "reason": "holiday" });

    let first = router
        .clone()
        .oneshot(post("/api/v1/schedule/calendar/no-class-days", body.clone()))
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = router
        .oneshot(post("/api/v1/schedule/calendar/no-class-days", body))
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn slot_listing_embeds_per_date_seats() {
    let service = service();
    let slot = monday_slot(&service, 3);
    let alice = student(&service, "Alice");
    service.enroll(alice.id, slot.id).expect("enrollment succeeds");
    let router = schedule_router(service);

    let response = router
        .oneshot(get("/api/v1/schedule/slots"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let listings = payload.as_array().expect("array of slots");
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].get("seats_occupied"), Some(&json!(1)));
    let upcoming = listings[0]
        .get("upcoming")
        .and_then(serde_json::Value::as_array)
        .expect("upcoming dates");
    assert_eq!(upcoming.len(), 4);
    assert_eq!(upcoming[0].get("seats_available"), Some(&json!(2)));
}

#[tokio::test]
async fn activity_feed_filters_by_query_parameters() {
    let service = service();
    let slot = monday_slot(&service, 5);
    let alice = student(&service, "Alice");
    let bruno = student(&service, "Bruno");
    let enrollment = service.enroll(alice.id, slot.id).expect("enrollment succeeds");
    service.enroll(bruno.id, slot.id).expect("enrollment succeeds");
    service
        .cancel_upcoming(enrollment.id, CancelTarget::Count(1))
        .expect("cancellation succeeds");
    let router = schedule_router(service);

    let response = router
        .clone()
        .oneshot(get(&format!(
            "/api/v1/schedule/activity?student={}&kind=cancelled",
            alice.id.0
        )))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let records = payload.as_array().expect("array of records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("kind"), Some(&json!("cancelled")));

    let limited = router
        .oneshot(get("/api/v1/schedule/activity?limit=2"))
        .await
        .expect("route executes");
    let payload = read_json_body(limited).await;
    assert_eq!(payload.as_array().expect("array").len(), 2);
}
