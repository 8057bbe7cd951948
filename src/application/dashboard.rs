//! Read-side projection for the renter dashboard.

use crate::application::reservation::ReservationService;
use crate::domain::booking::{BookingRequest, BookingStatus, Stage};
use crate::domain::ids::{BookingRequestId, RoomId, UserId};
use crate::error::{ReservationError, Result};
use crate::wizard::step::WizardStep;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// How long a banner stays up after creation, and after a past drop.
pub fn banner_grace() -> TimeDelta {
    TimeDelta::hours(24)
}

/// The "finish your booking" banner for one unpaid request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub booking_request_id: BookingRequestId,
    pub room_id: RoomId,
    pub status: BookingStatus,
    pub amount: Decimal,
    pub drop_at: Option<NaiveDateTime>,
    /// Where the wizard reopens when the renter taps the banner.
    pub resume_step: WizardStep,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEntry {
    pub request: BookingRequest,
    pub banner: Option<Banner>,
}

/// Projects a request onto its banner, if one should be shown at `now`.
///
/// Drop times carry no zone and are compared as UTC.
pub fn banner_for(
    request: &BookingRequest,
    room_price: Decimal,
    now: DateTime<Utc>,
) -> Option<Banner> {
    if request.token_paid || !BookingStatus::ACTIVE.contains(&request.status) {
        return None;
    }
    if request.stage == Stage::Confirmed {
        return None;
    }

    let now_naive = now.naive_utc();
    let drop_at = request.drop_at();
    let fresh = now - request.created_at < banner_grace();
    let visible = fresh
        || drop_at.is_some_and(|at| at > now_naive || now_naive - at < banner_grace());
    if !visible {
        return None;
    }

    Some(Banner {
        booking_request_id: request.id,
        room_id: request.room_id,
        status: request.status,
        amount: request.token_amount.unwrap_or(room_price),
        drop_at,
        resume_step: resume_step(request, now),
    })
}

/// The step a resumed wizard session starts at.
pub fn resume_step(request: &BookingRequest, now: DateTime<Utc>) -> WizardStep {
    match request.stage {
        Stage::Initiated => return WizardStep::UserType,
        Stage::NotEligible => return WizardStep::NotEligible,
        _ => {}
    }
    match request.drop_at() {
        Some(at) if at > now.naive_utc() => WizardStep::DropConfirmed,
        _ => WizardStep::DropSchedule,
    }
}

/// The caller's active requests, each with its banner.
pub async fn dashboard(
    service: &ReservationService,
    caller: &UserId,
    now: DateTime<Utc>,
) -> Result<Vec<DashboardEntry>> {
    let requests = service.active_booking_requests(caller).await?;
    let mut entries = Vec::with_capacity(requests.len());
    for request in requests {
        let room_price = match service.room(request.room_id).await {
            Ok(room) => room.monthly_price,
            Err(ReservationError::NotFound) => Decimal::ZERO,
            Err(e) => return Err(e),
        };
        let banner = banner_for(&request, room_price, now);
        entries.push(DashboardEntry { request, banner });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::room::Room;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal_macros::dec;

    fn pending(now: DateTime<Utc>) -> BookingRequest {
        let room = Room::new(RoomId::new(), UserId::new("owner"), "Loft", dec!(8000));
        let mut request = BookingRequest::open(&room, UserId::new("renter"), now);
        request.advance(Stage::TokenPending, now).unwrap();
        request
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_fresh_request_shows_banner() {
        let created = at(2030, 1, 10, 9);
        let banner = banner_for(&pending(created), dec!(9999), created + TimeDelta::hours(3)).unwrap();
        assert_eq!(banner.amount, dec!(8000));
        assert_eq!(banner.resume_step, WizardStep::DropSchedule);
    }

    #[test]
    fn test_stale_request_without_drop_is_hidden() {
        let created = at(2030, 1, 10, 9);
        assert!(banner_for(&pending(created), dec!(8000), created + TimeDelta::hours(25)).is_none());
    }

    #[test]
    fn test_future_drop_keeps_banner_and_resumes_confirmed() {
        let created = at(2030, 1, 10, 9);
        let mut request = pending(created);
        request
            .schedule_drop(
                NaiveDate::from_ymd_opt(2030, 1, 20).unwrap(),
                NaiveTime::from_hms_opt(17, 30, 0),
                created,
            )
            .unwrap();

        let banner = banner_for(&request, dec!(8000), at(2030, 1, 15, 0)).unwrap();
        assert_eq!(banner.resume_step, WizardStep::DropConfirmed);

        let just_after = banner_for(&request, dec!(8000), at(2030, 1, 21, 9)).unwrap();
        assert_eq!(just_after.resume_step, WizardStep::DropSchedule);

        assert!(banner_for(&request, dec!(8000), at(2030, 1, 22, 0)).is_none());
    }

    #[test]
    fn test_confirmed_and_ineligible_have_no_banner() {
        let now = at(2030, 1, 10, 9);
        let mut confirmed = pending(now);
        confirmed.confirm(now).unwrap();
        assert!(banner_for(&confirmed, dec!(8000), now).is_none());

        let mut short = pending(now);
        short.advance(Stage::NotEligible, now).unwrap();
        assert!(banner_for(&short, dec!(8000), now).is_none());
    }

    #[test]
    fn test_resume_step_by_stage() {
        let now = at(2030, 1, 10, 9);
        let room = Room::new(RoomId::new(), UserId::new("owner"), "Loft", dec!(8000));
        let mut request = BookingRequest::open(&room, UserId::new("renter"), now);
        assert_eq!(resume_step(&request, now), WizardStep::UserType);

        request.advance(Stage::NotEligible, now).unwrap();
        assert_eq!(resume_step(&request, now), WizardStep::NotEligible);

        request.advance(Stage::TokenPending, now).unwrap();
        assert_eq!(resume_step(&request, now), WizardStep::DropSchedule);
    }

    #[test]
    fn test_missing_token_amount_uses_room_price() {
        let now = at(2030, 1, 10, 9);
        let mut request = pending(now);
        request.token_amount = None;
        assert_eq!(banner_for(&request, dec!(7500), now).unwrap().amount, dec!(7500));
    }
}
