//! HTTP adapter
//!
//! actix-web routes in front of the route function, plus a small bottle
//! surface for launching, inspecting and cancelling journeys.

use crate::error::DriftError;
use crate::route_function::{FunctionResponse, RouteFunction};
use crate::store::JourneyStore;
use crate::types::{Journey, Point};
use actix_web::dev::Service;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct AppState {
    pub route_function: Arc<RouteFunction>,
    pub journeys: Arc<dyn JourneyStore>,
}

#[derive(Debug, Deserialize)]
struct LaunchRequest {
    origin: Point,
}

/// Register every route on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/route-function", web::post().to(route_function))
        .route("/api/bottles", web::post().to(launch_bottle))
        .route("/api/bottles/{id}", web::get().to(show_bottle))
        .route("/api/bottles/{id}", web::delete().to(cancel_bottle));
}

/// Bind and run until the server is stopped.
pub async fn serve(state: AppState, bind: &str) -> Result<(), DriftError> {
    let app_state = web::Data::new(state);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap_fn(|req, srv| {
                debug!("Incoming request: {} {}", req.method(), req.uri());
                srv.call(req)
            })
            .configure(configure)
    })
    .bind(bind)
    .map_err(|e| DriftError::Server(format!("Failed to bind {}: {}", bind, e)))?;

    info!(bind = %bind, "HTTP adapter listening");
    server
        .run()
        .await
        .map_err(|e| DriftError::Server(e.to_string()))
}

fn respond(response: FunctionResponse) -> HttpResponse {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(response.body)
}

fn error_response(err: &DriftError) -> HttpResponse {
    respond(FunctionResponse::error(err))
}

/// Empty bodies reach the route function as `null` so they are reported
/// as missing inputs.
fn parse_body(body: &[u8]) -> Result<Value, DriftError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| DriftError::Validation(format!("Invalid JSON body: {}", e)))
}

async fn route_function(body: web::Bytes, data: web::Data<AppState>) -> HttpResponse {
    match parse_body(&body) {
        Ok(value) => respond(data.route_function.invoke(&value).await),
        Err(e) => error_response(&e),
    }
}

async fn launch_bottle(body: web::Bytes, data: web::Data<AppState>) -> HttpResponse {
    let request: LaunchRequest = match parse_body(&body).and_then(|value| {
        serde_json::from_value(value)
            .map_err(|e| DriftError::Validation(format!("Invalid launch request: {}", e)))
    }) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    let journey = Journey::new(Uuid::new_v4().to_string(), Utc::now(), request.origin);
    if let Err(e) = data.journeys.upsert(&journey) {
        warn!(bottle_id = %journey.id(), error = %e, "Failed to persist new bottle");
        return error_response(&DriftError::StoreUnavailable(e.to_string()));
    }
    info!(
        bottle_id = %journey.id(),
        lon = request.origin.lon,
        lat = request.origin.lat,
        "Bottle launched"
    );

    respond(data.route_function.invoke(&journey.to_json()).await)
}

async fn show_bottle(id: web::Path<String>, data: web::Data<AppState>) -> HttpResponse {
    match data.journeys.get(&id) {
        Ok(Some(journey)) => HttpResponse::Ok().json(journey.to_json()),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "error": format!("Bottle {} not found", id.as_str())
        })),
        Err(e) => error_response(&DriftError::StoreUnavailable(e.to_string())),
    }
}

async fn cancel_bottle(id: web::Path<String>, data: web::Data<AppState>) -> HttpResponse {
    match data.journeys.remove(&id) {
        Ok(true) => {
            info!(bottle_id = %id.as_str(), "Bottle cancelled");
            HttpResponse::NoContent().finish()
        }
        Ok(false) => HttpResponse::NotFound().json(json!({
            "error": format!("Bottle {} not found", id.as_str())
        })),
        Err(e) => error_response(&DriftError::StoreUnavailable(e.to_string())),
    }
}
