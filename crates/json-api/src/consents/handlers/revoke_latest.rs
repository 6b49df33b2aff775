//! Revoke Latest Consent Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use consent_app::domain::consents::{outcomes::RevocationOutcome, records::ConsentStatus};

use crate::{
    consents::{ConsentResponse, into_status_error},
    extensions::*,
    observability::record_transition,
    state::State,
};

const NO_ACTIVE_CONSENT: &str = "NO_ACTIVE_CONSENT";

/// Revoke Latest Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct RevokeLatestRequest {
    pub user_id: String,
    pub purpose: String,
}

/// Revocation Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RevocationResponse {
    /// `REVOKED`, or `NO_ACTIVE_CONSENT` when there was nothing to revoke
    pub status: String,

    pub consent: Option<ConsentResponse>,
}

impl From<RevocationOutcome> for RevocationResponse {
    fn from(outcome: RevocationOutcome) -> Self {
        match outcome {
            RevocationOutcome::Revoked(consent) => RevocationResponse {
                status: consent.status.as_str().to_string(),
                consent: Some(consent.into()),
            },
            RevocationOutcome::NoActiveConsent => RevocationResponse {
                status: NO_ACTIVE_CONSENT.to_string(),
                consent: None,
            },
        }
    }
}

/// Revoke Latest Consent Handler
///
/// Revokes whichever version is currently active for the user and purpose.
#[endpoint(
    tags("consents"),
    summary = "Revoke Active Consent",
    responses(
        (status_code = StatusCode::OK, description = "Revoked, or nothing to revoke"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<RevokeLatestRequest>,
    depot: &mut Depot,
) -> Result<Json<RevocationResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let RevokeLatestRequest { user_id, purpose } = json.into_inner();

    let outcome = state
        .app
        .consents
        .revoke_latest_active(user_id, purpose)
        .await
        .map_err(into_status_error)?;

    if matches!(outcome, RevocationOutcome::Revoked(_)) {
        record_transition(ConsentStatus::Revoked, 1);
    }

    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use consent_app::domain::consents::{ConsentsServiceError, MockConsentsService};
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use crate::test_helpers::{consents_service, make_consent};

    use super::*;

    fn make_service(consents: MockConsentsService) -> Service {
        consents_service(consents, Router::with_path("consents/revoke").post(handler))
    }

    #[tokio::test]
    async fn test_revoke_latest_returns_revoked_consent() -> TestResult {
        let consent = make_consent(ConsentStatus::Revoked);
        let uuid = consent.uuid.into_uuid();

        let mut consents = MockConsentsService::new();

        consents
            .expect_revoke_latest_active()
            .once()
            .withf(|user, purpose| user == "user-1" && purpose == "marketing")
            .return_once(move |_, _| Ok(RevocationOutcome::Revoked(consent)));

        consents.expect_revoke().never();

        let mut res = TestClient::post("http://example.com/consents/revoke")
            .json(&json!({ "user_id": "user-1", "purpose": "marketing" }))
            .send(&make_service(consents))
            .await;

        let body: RevocationResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.status, "REVOKED");
        assert_eq!(body.consent.map(|consent| consent.uuid), Some(uuid));

        Ok(())
    }

    #[tokio::test]
    async fn test_nothing_to_revoke_is_not_an_error() -> TestResult {
        let mut consents = MockConsentsService::new();

        consents
            .expect_revoke_latest_active()
            .once()
            .return_once(|_, _| Ok(RevocationOutcome::NoActiveConsent));

        let mut res = TestClient::post("http://example.com/consents/revoke")
            .json(&json!({ "user_id": "user-1", "purpose": "marketing" }))
            .send(&make_service(consents))
            .await;

        let body: RevocationResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.status, "NO_ACTIVE_CONSENT");
        assert!(body.consent.is_none(), "no consent should be returned");

        Ok(())
    }

    #[tokio::test]
    async fn test_blank_purpose_returns_400() -> TestResult {
        let mut consents = MockConsentsService::new();

        consents.expect_revoke_latest_active().once().return_once(|_, _| {
            Err(ConsentsServiceError::InvalidInput(
                "purpose cannot be empty".to_string(),
            ))
        });

        let res = TestClient::post("http://example.com/consents/revoke")
            .json(&json!({ "user_id": "user-1", "purpose": "" }))
            .send(&make_service(consents))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
