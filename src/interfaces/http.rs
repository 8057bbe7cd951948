//! JSON-over-HTTP surface of the reservation service.
//!
//! Every route except `/health` needs `Authorization: Bearer <token>`; the
//! bearer is resolved through the configured [`IdentityProvider`].

use crate::application::dashboard::dashboard;
use crate::application::reservation::{BookingProgress, ReservationService};
use crate::domain::booking::BookingRequest;
use crate::domain::ids::{BookingRequestId, RoomId, UserId};
use crate::domain::money::MinorUnits;
use crate::domain::payment::{PaymentAbort, PaymentCallback};
use crate::domain::ports::IdentityProvider;
use crate::error::ReservationError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReservationService>,
    pub identity: Arc<dyn IdentityProvider>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/token-payment", post(token_payment))
        .route("/booking-requests", post(open_booking_request))
        .route("/booking-requests/active", get(active_booking_requests))
        .route(
            "/booking-requests/{id}",
            get(get_booking_request).patch(save_progress),
        )
        .route("/booking-requests/{id}/drop", put(schedule_drop))
        .route("/booking-requests/{id}/abort", post(report_payment_abort))
        .with_state(state)
}

impl IntoResponse for ReservationError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = json!({
            "success": false,
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(body)).into_response()
    }
}

/// The authenticated caller.
pub struct Caller(pub UserId);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ReservationError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ReservationError::Unauthorized)?;
        state.identity.authenticate(bearer).await.map(Caller)
    }
}

fn bad_json(rejection: JsonRejection) -> ReservationError {
    ReservationError::BadRequest(rejection.body_text())
}

fn bad_path(rejection: PathRejection) -> ReservationError {
    ReservationError::BadRequest(rejection.body_text())
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
enum TokenPaymentRequest {
    CreateOrder {
        booking_request_id: BookingRequestId,
        room_id: RoomId,
    },
    VerifyPayment {
        booking_request_id: BookingRequestId,
        room_id: RoomId,
        razorpay_payment_id: String,
        razorpay_order_id: String,
        razorpay_signature: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderCreated {
    success: bool,
    razorpay_order_id: String,
    razorpay_key_id: String,
    amount: MinorUnits,
    currency: String,
}

async fn token_payment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<TokenPaymentRequest>, JsonRejection>,
) -> Result<Response, ReservationError> {
    let Json(request) = payload.map_err(bad_json)?;
    match request {
        TokenPaymentRequest::CreateOrder {
            booking_request_id,
            room_id,
        } => {
            let ticket = state
                .service
                .create_order(booking_request_id, room_id, &caller)
                .await?;
            Ok(Json(OrderCreated {
                success: true,
                razorpay_order_id: ticket.order_id,
                razorpay_key_id: ticket.key_id,
                amount: ticket.amount,
                currency: ticket.currency,
            })
            .into_response())
        }
        TokenPaymentRequest::VerifyPayment {
            booking_request_id,
            room_id,
            razorpay_payment_id,
            razorpay_order_id,
            razorpay_signature,
        } => {
            if razorpay_payment_id.is_empty()
                || razorpay_order_id.is_empty()
                || razorpay_signature.is_empty()
            {
                return Err(ReservationError::BadRequest(
                    "Missing Razorpay verification fields".to_string(),
                ));
            }
            let callback = PaymentCallback {
                payment_id: razorpay_payment_id,
                order_id: razorpay_order_id,
                signature: razorpay_signature,
            };
            state
                .service
                .verify_payment(booking_request_id, room_id, &callback, &caller)
                .await?;
            Ok(Json(json!({ "success": true })).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenBookingRequest {
    room_id: RoomId,
}

async fn open_booking_request(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<OpenBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingRequest>), ReservationError> {
    let Json(body) = payload.map_err(bad_json)?;
    let request = state
        .service
        .open_booking_request(body.room_id, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn get_booking_request(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<BookingRequestId>, PathRejection>,
) -> Result<Json<BookingRequest>, ReservationError> {
    let Path(id) = path.map_err(bad_path)?;
    Ok(Json(state.service.booking_request(id, &caller).await?))
}

async fn active_booking_requests(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<serde_json::Value>, ReservationError> {
    let entries = dashboard(&state.service, &caller, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "bookingRequests": entries })))
}

async fn save_progress(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<BookingRequestId>, PathRejection>,
    payload: Result<Json<BookingProgress>, JsonRejection>,
) -> Result<Json<BookingRequest>, ReservationError> {
    let Path(id) = path.map_err(bad_path)?;
    let Json(progress) = payload.map_err(bad_json)?;
    Ok(Json(state.service.save_progress(id, &caller, progress).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DropSchedule {
    drop_date: NaiveDate,
    #[serde(default)]
    drop_time: Option<NaiveTime>,
}

async fn schedule_drop(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<BookingRequestId>, PathRejection>,
    payload: Result<Json<DropSchedule>, JsonRejection>,
) -> Result<Json<BookingRequest>, ReservationError> {
    let Path(id) = path.map_err(bad_path)?;
    let Json(body) = payload.map_err(bad_json)?;
    let request = state
        .service
        .schedule_drop(id, &caller, body.drop_date, body.drop_time)
        .await?;
    Ok(Json(request))
}

async fn report_payment_abort(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<BookingRequestId>, PathRejection>,
    payload: Result<Json<PaymentAbort>, JsonRejection>,
) -> Result<Json<BookingRequest>, ReservationError> {
    let Path(id) = path.map_err(bad_path)?;
    let Json(abort) = payload.map_err(bad_json)?;
    Ok(Json(
        state.service.report_payment_abort(id, &caller, abort).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::RoomStore;
    use crate::domain::room::Room;
    use crate::infrastructure::identity::DevIdentityProvider;
    use crate::infrastructure::in_memory::{InMemoryBookingRequestStore, InMemoryRoomStore};
    use crate::infrastructure::sandbox::SandboxGateway;
    use crate::infrastructure::signature::SignatureVerifier;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    async fn app() -> (Router, Room) {
        let rooms = InMemoryRoomStore::new();
        let room = Room::new(RoomId::new(), UserId::new("owner"), "Loft", dec!(12000));
        rooms.insert(room.clone()).await.unwrap();
        let service = ReservationService::new(
            Box::new(InMemoryBookingRequestStore::new()),
            Box::new(rooms),
            Box::new(SandboxGateway::new("rzp_test_key", "secret").unwrap()),
            SignatureVerifier::new("secret").unwrap(),
        );
        let state = AppState {
            service: Arc::new(service),
            identity: Arc::new(DevIdentityProvider),
        };
        (router(state), room)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_bearer_is_unauthorized() {
        let (app, _) = app().await;
        let response = app
            .oneshot(
                Request::post("/token-payment")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":"create_order"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn test_unknown_action_is_bad_request() {
        let (app, _) = app().await;
        let response = app
            .oneshot(
                Request::post("/token-payment")
                    .header("authorization", "Bearer renter")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":"refund"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["kind"], "bad_request");
    }

    #[tokio::test]
    async fn test_create_order_over_http() {
        let (app, room) = app().await;
        let opened = app
            .clone()
            .oneshot(
                Request::post("/booking-requests")
                    .header("authorization", "Bearer renter")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "roomId": room.id }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(opened.status(), StatusCode::CREATED);
        let request = body_json(opened).await;

        let payload = json!({
            "action": "create_order",
            "bookingRequestId": request["id"],
            "roomId": room.id,
        });
        let response = app
            .oneshot(
                Request::post("/token-payment")
                    .header("authorization", "Bearer renter")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["amount"], 1_200_000);
        assert_eq!(body["currency"], "INR");
        assert_eq!(body["razorpayKeyId"], "rzp_test_key");
        assert!(body["razorpayOrderId"].as_str().unwrap().starts_with("order_"));
    }

    #[tokio::test]
    async fn test_other_renter_is_forbidden() {
        let (app, room) = app().await;
        let opened = app
            .clone()
            .oneshot(
                Request::post("/booking-requests")
                    .header("authorization", "Bearer alice")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "roomId": room.id }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let request = body_json(opened).await;

        let response = app
            .oneshot(
                Request::get(format!("/booking-requests/{}", request["id"].as_str().unwrap()))
                    .header("authorization", "Bearer mallory")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_malformed_id_is_json_bad_request() {
        let (app, _) = app().await;
        let response = app
            .oneshot(
                Request::get("/booking-requests/not-a-uuid")
                    .header("authorization", "Bearer renter")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "bad_request");
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
