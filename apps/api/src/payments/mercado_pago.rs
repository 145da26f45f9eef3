//! Mercado Pago client: the single place that calls the processor's REST API.
//!
//! Webhook redelivery is the retry path, so calls are made once and failures
//! are returned to the caller as-is.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{PaymentDetails, PaymentProcessor, Preference, PreferenceRequest, ProcessorError};

pub const PROCESSOR_NAME: &str = "mercado_pago";

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
    title: &'a str,
    quantity: u32,
    unit_price: f64,
    currency_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PreferencePayer<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct BackUrls {
    success: String,
    failure: String,
    pending: String,
}

#[derive(Debug, Serialize)]
struct PreferenceBody<'a> {
    items: Vec<PreferenceItem<'a>>,
    payer: PreferencePayer<'a>,
    back_urls: BackUrls,
    auto_return: &'a str,
    notification_url: &'a str,
    external_reference: &'a str,
    metadata: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct MercadoPagoClient {
    client: Client,
    api_url: String,
    access_token: String,
}

impl MercadoPagoClient {
    pub fn new(api_url: String, access_token: String) -> Result<Self, ProcessorError> {
        Ok(Self {
            client: Client::builder().build()?,
            api_url,
            access_token,
        })
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ProcessorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Mercado Pago returned {}: {}", status, body);
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ProcessorError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

fn preference_body(request: &PreferenceRequest) -> PreferenceBody<'_> {
    PreferenceBody {
        items: vec![PreferenceItem {
            title: &request.title,
            quantity: 1,
            unit_price: request.unit_price,
            currency_id: &request.currency_id,
        }],
        payer: PreferencePayer {
            email: &request.payer_email,
        },
        back_urls: BackUrls {
            success: format!("{}/checkout/success", request.back_url_base),
            failure: format!("{}/checkout/failure", request.back_url_base),
            pending: format!("{}/checkout/pending", request.back_url_base),
        },
        auto_return: "approved",
        notification_url: &request.notification_url,
        external_reference: &request.external_reference,
        metadata: &request.metadata,
    }
}

#[async_trait]
impl PaymentProcessor for MercadoPagoClient {
    fn name(&self) -> &'static str {
        PROCESSOR_NAME
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, ProcessorError> {
        let url = format!("{}/v1/payments/{}", self.api_url, payment_id);
        debug!("Fetching payment {payment_id} from Mercado Pago");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        PaymentDetails::from_value(Self::read_json(response).await?)
    }

    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, ProcessorError> {
        let url = format!("{}/checkout/preferences", self.api_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&preference_body(request))
            .send()
            .await?;

        let preference: Preference = serde_json::from_value(Self::read_json(response).await?)?;
        debug!("Created Mercado Pago preference {}", preference.id);
        Ok(preference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_request() -> PreferenceRequest {
        PreferenceRequest {
            title: "VIP 1 Mês".into(),
            unit_price: 7.7,
            currency_id: "BRL".into(),
            payer_email: "ana@example.com".into(),
            back_url_base: "https://shop.example".into(),
            notification_url: "https://shop.example/webhook/mercado_pago".into(),
            external_reference: r#"{"planType":"monthly"}"#.into(),
            metadata: json!({ "email": "ana@example.com", "planType": "monthly" }),
        }
    }

    #[test]
    fn test_preference_body_shape() {
        let request = sample_request();
        let body = serde_json::to_value(preference_body(&request)).unwrap();

        assert_eq!(body["items"][0]["quantity"], 1);
        assert_eq!(body["items"][0]["currency_id"], "BRL");
        assert_eq!(body["payer"]["email"], "ana@example.com");
        assert_eq!(body["auto_return"], "approved");
        assert_eq!(
            body["back_urls"]["success"],
            "https://shop.example/checkout/success"
        );
        assert_eq!(
            body["notification_url"],
            "https://shop.example/webhook/mercado_pago"
        );
        assert_eq!(body["metadata"]["planType"], "monthly");
    }

    #[test]
    fn test_client_reports_processor_name() {
        let client = MercadoPagoClient::new("http://localhost".into(), "token".into()).unwrap();
        assert_eq!(client.name(), "mercado_pago");
    }
}
