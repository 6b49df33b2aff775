//! Create Consent Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{
    http::header::LOCATION,
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use consent_app::domain::consents::data::NewConsent;

use crate::{
    consents::{ConsentResponse, into_status_error},
    extensions::*,
    observability::record_transition,
    state::State,
};

/// Create Consent Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateConsentRequest {
    pub user_id: String,
    pub purpose: String,
    pub data_types: Vec<String>,

    /// RFC 3339 instant the consent lapses at
    pub valid_until: String,
}

impl CreateConsentRequest {
    fn into_new_consent(self) -> Result<NewConsent, StatusError> {
        let valid_until = self
            .valid_until
            .parse::<Timestamp>()
            .or_400("could not parse \"valid_until\"")?;

        Ok(NewConsent {
            user_id: self.user_id,
            purpose: self.purpose,
            data_types: self.data_types,
            valid_until,
        })
    }
}

/// Consent Created Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ConsentCreatedResponse {
    pub consent: ConsentResponse,

    /// Single-use token approving or rejecting the request; absent when auto-approved
    pub approval_token: Option<String>,
}

/// Create Consent Handler
///
/// Records the next consent version for the user and purpose.
#[endpoint(
    tags("consents"),
    summary = "Create Consent",
    responses(
        (status_code = StatusCode::CREATED, description = "Consent created"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
        (status_code = StatusCode::CONFLICT, description = "Concurrent change, retry"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<CreateConsentRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<ConsentCreatedResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let new_consent = json.into_inner().into_new_consent()?;

    let consent = state
        .app
        .consents
        .create(new_consent)
        .await
        .map_err(into_status_error)?;

    record_transition(consent.status, 1);

    res.add_header(LOCATION, format!("/consents/{}", consent.uuid), true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::CREATED);

    let approval_token = consent
        .approval_token
        .as_ref()
        .map(|token| token.as_str().to_owned());

    Ok(Json(ConsentCreatedResponse {
        consent: consent.into(),
        approval_token,
    }))
}

#[cfg(test)]
mod tests {
    use consent_app::domain::consents::{
        ConsentsServiceError, MockConsentsService, records::ConsentStatus,
    };
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use crate::test_helpers::{consents_service, make_consent};

    use super::*;

    fn make_service(consents: MockConsentsService) -> Service {
        consents_service(consents, Router::with_path("consents").post(handler))
    }

    fn body() -> serde_json::Value {
        json!({
            "user_id": "user-1",
            "purpose": "marketing",
            "data_types": ["email", "phone"],
            "valid_until": "2099-01-01T00:00:00Z",
        })
    }

    #[tokio::test]
    async fn test_create_consent_returns_201_with_token() -> TestResult {
        let consent = make_consent(ConsentStatus::Requested);
        let uuid = consent.uuid;

        let mut consents = MockConsentsService::new();

        consents
            .expect_create()
            .once()
            .withf(|new| {
                new.user_id == "user-1"
                    && new.purpose == "marketing"
                    && new.data_types == ["email", "phone"]
                    && new.valid_until.to_string() == "2099-01-01T00:00:00Z"
            })
            .return_once(move |_| Ok(consent));

        consents.expect_approve_by_token().never();

        let mut res = TestClient::post("http://example.com/consents")
            .json(&body())
            .send(&make_service(consents))
            .await;

        let body: ConsentCreatedResponse = res.take_json().await?;
        let location = res.headers().get("location").and_then(|v| v.to_str().ok());

        assert_eq!(res.status_code, Some(StatusCode::CREATED));
        assert_eq!(location, Some(format!("/consents/{uuid}").as_str()));
        assert_eq!(body.consent.uuid, uuid.into_uuid());
        assert_eq!(body.consent.status, "REQUESTED");
        assert!(body.approval_token.is_some(), "expected an approval token");

        Ok(())
    }

    #[tokio::test]
    async fn test_auto_approved_consent_has_no_token() -> TestResult {
        let mut consent = make_consent(ConsentStatus::Active);
        consent.approval_token = None;
        consent.approval_expires_at = None;

        let mut consents = MockConsentsService::new();

        consents
            .expect_create()
            .once()
            .return_once(move |_| Ok(consent));

        let mut res = TestClient::post("http://example.com/consents")
            .json(&body())
            .send(&make_service(consents))
            .await;

        let body: ConsentCreatedResponse = res.take_json().await?;

        assert_eq!(body.consent.status, "ACTIVE");
        assert_eq!(body.approval_token, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_input_returns_400() -> TestResult {
        let mut consents = MockConsentsService::new();

        consents.expect_create().once().return_once(|_| {
            Err(ConsentsServiceError::InvalidInput(
                "data_types cannot be empty".to_string(),
            ))
        });

        let res = TestClient::post("http://example.com/consents")
            .json(&body())
            .send(&make_service(consents))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_unparseable_valid_until_returns_400() -> TestResult {
        let mut consents = MockConsentsService::new();

        consents.expect_create().never();

        let res = TestClient::post("http://example.com/consents")
            .json(&json!({
                "user_id": "user-1",
                "purpose": "marketing",
                "data_types": ["email"],
                "valid_until": "next tuesday",
            }))
            .send(&make_service(consents))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_fields_are_rejected() -> TestResult {
        let mut consents = MockConsentsService::new();

        consents.expect_create().never();

        let res = TestClient::post("http://example.com/consents")
            .json(&json!({
                "user_id": "user-1",
                "purpose": "marketing",
                "data_types": ["email"],
                "valid_until": "2099-01-01T00:00:00Z",
                "status": "ACTIVE",
            }))
            .send(&make_service(consents))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
