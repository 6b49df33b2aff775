//! App Router

use salvo::Router;

use crate::{admin, audit, consents, healthcheck, observability, process};

pub(crate) fn app_router() -> Router {
    Router::new()
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(Router::with_path("metrics").get(observability::metrics_handler))
        .push(
            Router::with_path("consents")
                .get(consents::index::handler)
                .post(consents::create::handler)
                .push(Router::with_path("approve/{token}").post(consents::approve::handler))
                .push(Router::with_path("reject/{token}").post(consents::reject::handler))
                .push(Router::with_path("revoke").post(consents::revoke_latest::handler))
                .push(
                    Router::with_path("{consent}")
                        .get(consents::get::handler)
                        .push(Router::with_path("revoke").post(consents::revoke::handler)),
                ),
        )
        .push(Router::with_path("process").post(process::evaluate::handler))
        .push(
            Router::with_path("audit")
                .hoop(admin::middleware::handler)
                .get(audit::index::handler)
                .push(Router::with_path("verify").get(audit::verify::handler)),
        )
}

#[cfg(test)]
mod tests {
    use consent_app::domain::consents::{
        MockConsentsService,
        outcomes::{ApprovalOutcome, RevocationOutcome},
        records::ConsentStatus,
    };
    use salvo::{
        Service,
        affix_state::inject,
        http::StatusCode,
        test::{ResponseExt, TestClient},
    };
    use serde_json::json;
    use testresult::TestResult;

    use crate::test_helpers::{make_consent, state_with_consents};

    use super::*;

    fn make_service(consents: MockConsentsService) -> Service {
        Service::new(
            Router::new()
                .hoop(inject(state_with_consents(consents)))
                .push(app_router()),
        )
    }

    #[tokio::test]
    async fn test_static_revoke_route_wins_over_consent_id() -> TestResult {
        let mut consents = MockConsentsService::new();

        consents
            .expect_revoke_latest_active()
            .once()
            .return_once(|_, _| Ok(RevocationOutcome::NoActiveConsent));

        consents.expect_revoke().never();
        consents.expect_get().never();

        let res = TestClient::post("http://example.com/consents/revoke")
            .json(&json!({ "user_id": "user-1", "purpose": "marketing" }))
            .send(&make_service(consents))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        Ok(())
    }

    #[tokio::test]
    async fn test_approval_route_reaches_the_token_handler() -> TestResult {
        let consent = make_consent(ConsentStatus::Rejected);

        let mut consents = MockConsentsService::new();

        consents
            .expect_approve_by_token()
            .once()
            .withf(|token| token.as_str() == "abc123")
            .return_once(move |_| Ok(ApprovalOutcome::NoEffect(consent)));

        let res = TestClient::post("http://example.com/consents/approve/abc123")
            .send(&make_service(consents))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        Ok(())
    }

    #[tokio::test]
    async fn test_audit_routes_are_guarded() -> TestResult {
        let res = TestClient::get("http://example.com/audit/verify")
            .send(&make_service(MockConsentsService::new()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        Ok(())
    }

    #[tokio::test]
    async fn test_healthcheck_is_open() -> TestResult {
        let mut res = TestClient::get("http://example.com/healthcheck")
            .send(&make_service(MockConsentsService::new()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert!(
            res.take_string().await?.contains("ok"),
            "expected healthy status"
        );

        Ok(())
    }
}
