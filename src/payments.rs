use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};

use crate::error::ApiError;

/// CheckoutSession
///
/// Everything needed to open a hosted checkout session: one card line item
/// plus the metadata the webhook reconciles against later. No local ledger
/// entry exists at this point.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub currency: String,
    pub product_name: String,
    pub product_description: String,
    pub product_image: Option<String>,
    /// Amount in minor units (fils), already validated by the handler.
    pub unit_amount: i64,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

/// PaymentService
///
/// The abstract contract for the payment provider. The concrete client talks
/// to Stripe's Checkout Sessions API; tests use a recording mock to assert
/// that validation happens before any provider call.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Creates a hosted checkout session and returns its id.
    async fn create_checkout_session(&self, session: CheckoutSession) -> Result<String, ApiError>;
}

/// PaymentState
///
/// Shared handle on the payment service. The application state holds an
/// `Option<PaymentState>`: None means the provider was not configured and the
/// checkout endpoints answer 503.
pub type PaymentState = Arc<dyn PaymentService>;

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// StripeClient
///
/// Calls the Checkout Sessions endpoint directly with Stripe's form-encoded
/// wire format (indexed bracket keys for nested fields).
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl PaymentService for StripeClient {
    async fn create_checkout_session(&self, session: CheckoutSession) -> Result<String, ApiError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            (
                "line_items[0][price_data][currency]".into(),
                session.currency,
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                session.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                session.product_name,
            ),
            (
                "line_items[0][price_data][product_data][description]".into(),
                session.product_description,
            ),
            ("line_items[0][quantity]".into(), "1".into()),
            ("success_url".into(), session.success_url),
            ("cancel_url".into(), session.cancel_url),
        ];
        if let Some(image) = session.product_image {
            form.push((
                "line_items[0][price_data][product_data][images][0]".into(),
                image,
            ));
        }
        for (key, value) in session.metadata {
            form.push((format!("metadata[{key}]"), value));
        }

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "Failed to create checkout session".to_string());
            return Err(ApiError::Upstream(message));
        }

        let session: StripeSession = response.json().await?;
        Ok(session.id)
    }
}

/// MockPaymentService
///
/// Records every session it is asked to create, so tests can assert that
/// below-minimum amounts never reach the provider.
#[derive(Default)]
pub struct MockPaymentService {
    pub sessions: Mutex<Vec<CheckoutSession>>,
}

impl MockPaymentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("sessions lock").len()
    }
}

#[async_trait]
impl PaymentService for MockPaymentService {
    async fn create_checkout_session(&self, session: CheckoutSession) -> Result<String, ApiError> {
        let mut sessions = self.sessions.lock().expect("sessions lock");
        sessions.push(session);
        Ok(format!("cs_test_{}", sessions.len()))
    }
}
