//! Consent History Handler

use std::sync::Arc;

use salvo::{oapi::extract::QueryParam, prelude::*};

use crate::{
    consents::{ConsentResponse, into_status_error},
    extensions::*,
    state::State,
};

/// Consent History Handler
///
/// Returns every version for a user and purpose, oldest first.
#[endpoint(
    tags("consents"),
    summary = "List Consent Versions",
    responses(
        (status_code = StatusCode::OK, description = "Consent history"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad Request"),
    ),
)]
pub(crate) async fn handler(
    user_id: QueryParam<String, true>,
    purpose: QueryParam<String, true>,
    depot: &mut Depot,
) -> Result<Json<Vec<ConsentResponse>>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let consents = state
        .app
        .consents
        .history(user_id.into_inner(), purpose.into_inner())
        .await
        .map_err(into_status_error)?;

    Ok(Json(consents.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use consent_app::domain::consents::{MockConsentsService, records::ConsentStatus};
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::test_helpers::{consents_service, make_consent};

    use super::*;

    fn make_service(consents: MockConsentsService) -> Service {
        consents_service(consents, Router::with_path("consents").get(handler))
    }

    #[tokio::test]
    async fn test_history_lists_versions_in_order() -> TestResult {
        let mut first = make_consent(ConsentStatus::Revoked);
        first.version = 1;

        let mut second = make_consent(ConsentStatus::Active);
        second.version = 2;

        let mut consents = MockConsentsService::new();

        consents
            .expect_history()
            .once()
            .withf(|user, purpose| user == "user-1" && purpose == "marketing")
            .return_once(move |_, _| Ok(vec![first, second]));

        consents.expect_resolve().never();

        let mut res =
            TestClient::get("http://example.com/consents?user_id=user-1&purpose=marketing")
                .send(&make_service(consents))
                .await;

        let body: Vec<ConsentResponse> = res.take_json().await?;
        let versions: Vec<u32> = body.iter().map(|consent| consent.version).collect();

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(versions, [1, 2]);

        Ok(())
    }

    #[tokio::test]
    async fn test_history_requires_user_and_purpose() -> TestResult {
        let mut consents = MockConsentsService::new();

        consents.expect_history().never();

        let res = TestClient::get("http://example.com/consents?user_id=user-1")
            .send(&make_service(consents))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }
}
