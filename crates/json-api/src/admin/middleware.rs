//! Admin API key middleware.

use std::sync::Arc;

use salvo::prelude::*;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::state::State;

pub(crate) const API_KEY_HEADER: &str = "x-api-key";

#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let state = match depot.obtain::<Arc<State>>() {
        Ok(state) => state,
        Err(_error) => {
            res.render(StatusError::internal_server_error());

            return;
        }
    };

    let Some(expected) = state.admin_api_key.as_deref() else {
        warn!("admin route requested but no admin API key is configured");

        res.render(StatusError::unauthorized().brief("Admin API is not configured"));

        return;
    };

    let Some(presented) = extract_api_key(req) else {
        res.render(StatusError::unauthorized().brief("Missing x-api-key header"));

        return;
    };

    if !keys_match(presented, expected) {
        res.render(StatusError::unauthorized().brief("Invalid API key"));

        return;
    }

    ctrl.call_next(req, depot, res).await;
}

fn extract_api_key(req: &Request) -> Option<&str> {
    let key = req.headers().get(API_KEY_HEADER)?.to_str().ok()?.trim();

    (!key.is_empty()).then_some(key)
}

/// Constant-time comparison; unequal lengths never match.
fn keys_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
