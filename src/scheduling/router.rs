use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::clock::Clock;
use super::domain::{
    ActivityKind, EnrollmentId, MakeupId, SlotId, SlotSpec, StudentId,
};
use super::error::ScheduleError;
use super::service::{ActivityQuery, CancelTarget, ScheduleService, SlotUpdate};

/// Router builder exposing the scheduling engine over HTTP.
pub fn schedule_router<C>(service: Arc<ScheduleService<C>>) -> Router
where
    C: Clock + 'static,
{
    Router::new()
        .route(
            "/api/v1/schedule/slots",
            post(register_slot_handler::<C>).get(list_slots_handler::<C>),
        )
        .route(
            "/api/v1/schedule/slots/:slot_id",
            patch(update_slot_handler::<C>),
        )
        .route(
            "/api/v1/schedule/slots/:slot_id/occurrences",
            get(occurrences_handler::<C>),
        )
        .route(
            "/api/v1/schedule/slots/:slot_id/availability",
            get(availability_handler::<C>),
        )
        .route(
            "/api/v1/schedule/students",
            post(register_student_handler::<C>),
        )
        .route(
            "/api/v1/schedule/students/:student_id",
            get(student_overview_handler::<C>),
        )
        .route(
            "/api/v1/schedule/enrollments",
            post(enroll_handler::<C>),
        )
        .route(
            "/api/v1/schedule/enrollments/:enrollment_id",
            delete(cancel_enrollment_handler::<C>),
        )
        .route(
            "/api/v1/schedule/enrollments/:enrollment_id/absences",
            post(cancel_upcoming_handler::<C>),
        )
        .route(
            "/api/v1/schedule/makeups",
            post(book_makeup_handler::<C>),
        )
        .route(
            "/api/v1/schedule/makeups/:makeup_id",
            delete(cancel_makeup_handler::<C>),
        )
        .route(
            "/api/v1/schedule/calendar/no-class-days",
            post(add_no_class_day_handler::<C>).get(list_no_class_days_handler::<C>),
        )
        .route(
            "/api/v1/schedule/calendar/no-class-days/:date",
            delete(remove_no_class_day_handler::<C>),
        )
        .route("/api/v1/schedule/activity", get(activity_handler::<C>))
        .with_state(service)
}

/// One status per error family: missing resources 404, bookings that collide
/// with existing state 409, everything else a caller mistake 400.
fn error_response(error: ScheduleError) -> Response {
    let status = match error {
        ScheduleError::NotFound { .. } => StatusCode::NOT_FOUND,
        ScheduleError::DuplicateEnrollment
        | ScheduleError::AlreadyCancelled(_)
        | ScheduleError::AlreadyBooked
        | ScheduleError::AlreadyEnrolled
        | ScheduleError::CapacityExceeded => StatusCode::CONFLICT,
        ScheduleError::InvalidRange { .. }
        | ScheduleError::PastDate(_)
        | ScheduleError::SlotInactive
        | ScheduleError::InactiveEnrollment
        | ScheduleError::NoCredit => StatusCode::BAD_REQUEST,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn register_slot_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    axum::Json(spec): axum::Json<SlotSpec>,
) -> Response
where
    C: Clock + 'static,
{
    match service.register_slot(spec) {
        Ok(slot) => (StatusCode::CREATED, axum::Json(slot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_slot_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Path(slot_id): Path<u64>,
    axum::Json(update): axum::Json<SlotUpdate>,
) -> Response
where
    C: Clock + 'static,
{
    match service.update_slot(SlotId(slot_id), update) {
        Ok(slot) => (StatusCode::OK, axum::Json(slot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_slots_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
) -> Response
where
    C: Clock + 'static,
{
    (StatusCode::OK, axum::Json(service.list_slots())).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct OccurrencesParams {
    count: Option<usize>,
    enrollment: Option<u64>,
}

pub(crate) async fn occurrences_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Path(slot_id): Path<u64>,
    Query(params): Query<OccurrencesParams>,
) -> Response
where
    C: Clock + 'static,
{
    let exclude = params.enrollment.map(EnrollmentId);
    match service.list_upcoming_occurrences(SlotId(slot_id), exclude, params.count) {
        Ok(dates) => (StatusCode::OK, axum::Json(json!({ "dates": dates }))).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvailabilityParams {
    date: NaiveDate,
}

pub(crate) async fn availability_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Path(slot_id): Path<u64>,
    Query(params): Query<AvailabilityParams>,
) -> Response
where
    C: Clock + 'static,
{
    match service.seats_available(SlotId(slot_id), params.date) {
        Ok(seats) => (
            StatusCode::OK,
            axum::Json(json!({
                "date": params.date,
                "seats_available": seats,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterStudentRequest {
    name: String,
}

pub(crate) async fn register_student_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    axum::Json(request): axum::Json<RegisterStudentRequest>,
) -> Response
where
    C: Clock + 'static,
{
    let student = service.register_student(request.name);
    (StatusCode::CREATED, axum::Json(student)).into_response()
}

pub(crate) async fn student_overview_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Path(student_id): Path<u64>,
) -> Response
where
    C: Clock + 'static,
{
    match service.student_overview(StudentId(student_id)) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollRequest {
    student_id: u64,
    slot_id: u64,
}

pub(crate) async fn enroll_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    axum::Json(request): axum::Json<EnrollRequest>,
) -> Response
where
    C: Clock + 'static,
{
    match service.enroll(StudentId(request.student_id), SlotId(request.slot_id)) {
        Ok(enrollment) => (StatusCode::CREATED, axum::Json(enrollment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_enrollment_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Path(enrollment_id): Path<u64>,
) -> Response
where
    C: Clock + 'static,
{
    match service.cancel_enrollment(EnrollmentId(enrollment_id)) {
        Ok(enrollment) => (StatusCode::OK, axum::Json(enrollment)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Body of an absence request: exactly one of `count` or `date`.
#[derive(Debug, Deserialize)]
pub(crate) struct CancelUpcomingRequest {
    count: Option<u32>,
    date: Option<NaiveDate>,
}

pub(crate) async fn cancel_upcoming_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Path(enrollment_id): Path<u64>,
    axum::Json(request): axum::Json<CancelUpcomingRequest>,
) -> Response
where
    C: Clock + 'static,
{
    let target = match (request.count, request.date) {
        (Some(count), None) => CancelTarget::Count(count),
        (None, Some(date)) => CancelTarget::Date(date),
        _ => {
            return error_response(ScheduleError::invalid_range(
                "body",
                "provide exactly one of count or date",
            ))
        }
    };
    match service.cancel_upcoming(EnrollmentId(enrollment_id), target) {
        Ok(dates) => (
            StatusCode::OK,
            axum::Json(json!({
                "cancelled_dates": dates,
                "credits_granted": dates.len(),
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookMakeupRequest {
    student_id: u64,
    slot_id: u64,
    date: NaiveDate,
}

pub(crate) async fn book_makeup_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    axum::Json(request): axum::Json<BookMakeupRequest>,
) -> Response
where
    C: Clock + 'static,
{
    match service.book_makeup(
        StudentId(request.student_id),
        SlotId(request.slot_id),
        request.date,
    ) {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_makeup_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Path(makeup_id): Path<u64>,
) -> Response
where
    C: Clock + 'static,
{
    match service.cancel_makeup(MakeupId(makeup_id)) {
        Ok(makeup) => (StatusCode::OK, axum::Json(makeup)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddNoClassDayRequest {
    date: NaiveDate,
    reason: Option<String>,
}

pub(crate) async fn add_no_class_day_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    axum::Json(request): axum::Json<AddNoClassDayRequest>,
) -> Response
where
    C: Clock + 'static,
{
    match service.add_no_class_day(request.date, request.reason) {
        Ok(day) => (StatusCode::CREATED, axum::Json(day)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_no_class_day_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Path(date): Path<NaiveDate>,
) -> Response
where
    C: Clock + 'static,
{
    match service.remove_no_class_day(date) {
        Ok(day) => (StatusCode::OK, axum::Json(day)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NoClassDayParams {
    year: i32,
    month: u32,
}

pub(crate) async fn list_no_class_days_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Query(params): Query<NoClassDayParams>,
) -> Response
where
    C: Clock + 'static,
{
    match service.list_no_class_days(params.year, params.month) {
        Ok(days) => (StatusCode::OK, axum::Json(days)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivityParams {
    student: Option<u64>,
    kind: Option<ActivityKind>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    limit: Option<usize>,
}

pub(crate) async fn activity_handler<C>(
    State(service): State<Arc<ScheduleService<C>>>,
    Query(params): Query<ActivityParams>,
) -> Response
where
    C: Clock + 'static,
{
    let query = ActivityQuery {
        student_id: params.student.map(StudentId),
        kind: params.kind,
        from: params.from,
        to: params.to,
        limit: params.limit,
    };
    (StatusCode::OK, axum::Json(service.list_activity(query))).into_response()
}
