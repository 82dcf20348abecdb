//! Cliente de Stripe Checkout
//!
//! Habla con la API REST de Stripe directamente (form-encoded), sin SDK:
//! solo necesitamos crear Checkout Sessions y verificar la firma de los
//! webhooks. El cliente se construye una vez y vive en el AppState.

use hmac::{Hmac, Mac};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;

use crate::config::environment::EnvironmentConfig;
use crate::utils::errors::{AppError, PaymentProviderKind};

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Ventana de tolerancia para el timestamp de la firma del webhook
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    tolerance_secs: i64,
}

impl StripeClient {
    pub fn new(config: &EnvironmentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            secret_key: config.stripe_secret_key.clone(),
            webhook_secret: config.stripe_webhook_secret.clone(),
            tolerance_secs: SIGNATURE_TOLERANCE_SECS,
        }
    }

    /// Crear una Checkout Session de pago único en USD
    ///
    /// El importe viaja en unidades menores (centavos). Los fallos del
    /// proveedor se clasifican para que el caller decida si reintentar.
    pub async fn create_checkout_session(
        &self,
        product_name: &str,
        amount: Decimal,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, AppError> {
        log::info!("💳 Creando Checkout Session: {} (${})", product_name, amount);

        let unit_amount = (amount * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or_else(|| AppError::Internal("Invalid payment amount".to_string()))?;

        let params: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][price_data][currency]", "usd".to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                product_name.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                unit_amount.to_string(),
            ),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
        ];

        let response = self
            .client
            .post(CHECKOUT_SESSIONS_URL)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider {
                kind: PaymentProviderKind::Connectivity,
                message: format!("Could not reach Stripe: {}", e),
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(AppError::PaymentProvider {
                kind: PaymentProviderKind::RateLimited,
                message: "Stripe rate limit exceeded".to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ Stripe respondió {}: {}", status, body);
            return Err(AppError::PaymentProvider {
                kind: PaymentProviderKind::Internal,
                message: format!("Stripe error ({})", status),
            });
        }

        let session: CheckoutSession =
            response.json().await.map_err(|e| AppError::PaymentProvider {
                kind: PaymentProviderKind::Internal,
                message: format!("Invalid Stripe response: {}", e),
            })?;

        log::info!("✅ Checkout Session creada: {}", session.id);
        Ok(session)
    }

    /// Verificar la cabecera Stripe-Signature de un webhook
    ///
    /// La firma esperada es HMAC-SHA256 sobre `"{t}.{body}"` con el secreto
    /// del endpoint; se aceptan varias entradas `v1` (rotación de claves) y
    /// se rechazan timestamps fuera de la ventana de tolerancia.
    pub fn verify_webhook_signature(
        &self,
        signature_header: &str,
        body: &str,
        now_unix: i64,
    ) -> Result<(), AppError> {
        let mut timestamp: Option<i64> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for element in signature_header.split(',') {
            match element.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = value.parse().ok();
                }
                Some(("v1", value)) => {
                    candidates.push(value);
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            AppError::InvalidSignature("Missing timestamp in signature header".to_string())
        })?;

        if candidates.is_empty() {
            return Err(AppError::InvalidSignature(
                "No v1 signatures in header".to_string(),
            ));
        }

        if (now_unix - timestamp).abs() > self.tolerance_secs {
            return Err(AppError::InvalidSignature(
                "Signature timestamp outside tolerance".to_string(),
            ));
        }

        let signed_payload = format!("{}.{}", timestamp, body);

        for candidate in candidates {
            let Ok(candidate_bytes) = hex::decode(candidate) else {
                continue;
            };

            let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
                .map_err(|_| AppError::Internal("Invalid webhook secret".to_string()))?;
            mac.update(signed_payload.as_bytes());

            // verify_slice compara en tiempo constante
            if mac.verify_slice(&candidate_bytes).is_ok() {
                return Ok(());
            }
        }

        Err(AppError::InvalidSignature(
            "Signature does not match".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StripeClient {
        StripeClient::new(&EnvironmentConfig::for_tests())
    }

    fn sign(secret: &str, timestamp: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, body).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_passes() {
        let stripe = client();
        let body = r#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign("whsec_test_123", now, body));

        assert!(stripe.verify_webhook_signature(&header, body, now).is_ok());
    }

    #[test]
    fn test_tampered_body_fails() {
        let stripe = client();
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign("whsec_test_123", now, "original"));

        let result = stripe.verify_webhook_signature(&header, "tampered", now);
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let stripe = client();
        let body = "{}";
        let signed_at = 1_700_000_000;
        let header = format!("t={},v1={}", signed_at, sign("whsec_test_123", signed_at, body));

        // Una hora después de firmarse
        let result = stripe.verify_webhook_signature(&header, body, signed_at + 3600);
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
    }

    #[test]
    fn test_accepts_any_valid_v1_entry() {
        let stripe = client();
        let body = "{}";
        let now = 1_700_000_000;
        let header = format!(
            "t={},v1={},v1={}",
            now,
            "deadbeef",
            sign("whsec_test_123", now, body)
        );

        assert!(stripe.verify_webhook_signature(&header, body, now).is_ok());
    }

    #[test]
    fn test_missing_timestamp_fails() {
        let stripe = client();
        let result = stripe.verify_webhook_signature("v1=abcdef", "{}", 0);
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
    }
}
