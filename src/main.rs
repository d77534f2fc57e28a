use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use ola_scheduler::config::AppConfig;
use ola_scheduler::error::AppError;
use ola_scheduler::scheduling::{
    day_name, schedule_router, ActivityQuery, CancelTarget, Clock, FixedClock, MakeupOutcome,
    ScheduleService, ScheduleStore, SlotSpec, WorkshopClock,
};
use ola_scheduler::telemetry;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Ola Workshop Scheduler",
    about = "Run the workshop class scheduling service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk the enrollment and makeup lifecycles against a seeded week
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug, Default)]
struct DemoArgs {
    /// Pin the demo clock to a date (YYYY-MM-DD) at 08:00 workshop time
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let service = Arc::new(ScheduleService::new(
        Arc::new(ScheduleStore::new()),
        Arc::new(WorkshopClock),
        config.schedule.clone(),
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(schedule_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "workshop scheduler ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    match args.today {
        Some(today) => {
            let eight = NaiveTime::from_hms_opt(8, 0, 0).expect("valid time");
            walk_lifecycles(FixedClock::at(today, eight))
        }
        None => walk_lifecycles(WorkshopClock),
    }
}

/// Seed two slots and three students, then exercise every lifecycle once,
/// narrating the seat counts along the way.
fn walk_lifecycles<C>(clock: C) -> Result<(), AppError>
where
    C: Clock + 'static,
{
    let clock = Arc::new(clock);
    let service = ScheduleService::new(
        Arc::new(ScheduleStore::new()),
        clock.clone(),
        ola_scheduler::config::ScheduleConfig {
            default_occurrence_count: 4,
        },
    );

    println!("Workshop scheduling demo");
    println!("Local time: {}", clock.now_local().format("%Y-%m-%d %H:%M"));

    let nine = NaiveTime::from_hms_opt(9, 0, 0).expect("valid time");
    let ten = NaiveTime::from_hms_opt(10, 0, 0).expect("valid time");
    let six_pm = NaiveTime::from_hms_opt(18, 0, 0).expect("valid time");
    let half_seven_pm = NaiveTime::from_hms_opt(19, 30, 0).expect("valid time");

    let monday = service
        .register_slot(SlotSpec {
            day_of_week: 1,
            start_time: nine,
            end_time: ten,
            max_capacity: 2,
        })?;
    let wednesday = service
        .register_slot(SlotSpec {
            day_of_week: 3,
            start_time: six_pm,
            end_time: half_seven_pm,
            max_capacity: 1,
        })?;

    for slot in [&monday, &wednesday] {
        println!(
            "Registered slot: {} {}-{} ({} seats)",
            day_name(slot.day_of_week),
            slot.start_time.format("%H:%M"),
            slot.end_time.format("%H:%M"),
            slot.max_capacity,
        );
    }

    let ana = service.register_student("Ana");
    let bruno = service.register_student("Bruno");
    let carla = service.register_student("Carla");

    let enrollment = service.enroll(ana.id, monday.id)?;
    service.enroll(bruno.id, monday.id)?;
    println!("\nEnrolled Ana and Bruno into the Monday slot (capacity 2)");

    match service.enroll(carla.id, monday.id) {
        Err(err) => println!("Carla's enrollment rejected: {err}"),
        Ok(_) => println!("Carla's enrollment unexpectedly succeeded"),
    }

    println!("\nUpcoming Monday dates");
    for date in service.list_upcoming_occurrences(monday.id, None, None)? {
        let seats = service.seats_available(monday.id, date)?;
        println!("- {date}: {seats} seat(s) free");
    }

    let cancelled = service.cancel_upcoming(enrollment.id, CancelTarget::Count(1))?;
    println!("\nAna cancelled {} upcoming date(s): {cancelled:?}", cancelled.len());

    let makeup_date = service
        .list_upcoming_occurrences(wednesday.id, None, Some(1))?
        .first()
        .copied();
    if let Some(date) = makeup_date {
        match service.book_makeup(ana.id, wednesday.id, date)? {
            MakeupOutcome::Booked { makeup } => {
                println!("Ana booked a makeup in the Wednesday slot on {}", makeup.date);
            }
            MakeupOutcome::Restored { date, .. } => {
                println!("Ana restored her own occurrence on {date}");
            }
        }
    }

    println!("\nActivity log (newest first)");
    for record in service.list_activity(ActivityQuery::default()) {
        println!(
            "- {} student={} slot={} at {}",
            record.kind.label(),
            record.student_id.0,
            record.slot_id.0,
            record.timestamp.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
