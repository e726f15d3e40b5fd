//! Lenient form extraction for provider webhooks

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::warn;

/// Webhook parameters from the query string and the form body.
///
/// Never rejects: the provider must always get a usable reply, so a missing
/// or malformed body just yields fewer fields. Body values win over query
/// values with the same name.
#[derive(Debug, Default, Clone)]
pub struct WebhookForm(pub HashMap<String, String>);

#[async_trait]
impl<S> FromRequest<S> for WebhookForm
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut fields: HashMap<String, String> = req
            .uri()
            .query()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        match Bytes::from_request(req, state).await {
            Ok(body) => fields.extend(url::form_urlencoded::parse(&body).into_owned()),
            Err(e) => warn!("API: Ignoring unreadable webhook body: {}", e),
        }

        Ok(Self(fields))
    }
}
