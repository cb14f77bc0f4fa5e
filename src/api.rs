//! Typed endpoints of the risk service, grouped the way the screens use them.
//! Every call goes through the [`RequestMediator`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::handoff::RiskAssessment;
use crate::mediator::{RequestMediator, Transport};

/// `{ "data": ... }` envelope used by several endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Which account family a credential exchange targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    /// Hospital staff. Super admins also sign in here.
    Hospital,
    Manufacturer,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token response from the credential exchange.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HospitalRegistration {
    pub email: String,
    pub password: String,
    pub hospital_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManufacturerRegistration {
    pub email: String,
    pub password: String,
    pub manufacturer_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskCheckRequest {
    pub manufacturer_name: String,
    pub device_name: String,
    pub country: String,
}

impl RiskCheckRequest {
    #[must_use]
    pub fn new(manufacturer_name: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            manufacturer_name: manufacturer_name.into(),
            device_name: device_name.into(),
            country: "USA".into(),
        }
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub device_id: JsonValue,
    pub feedback_text: String,
    pub rating: u8,
    pub category: String,
}

impl Feedback {
    #[must_use]
    pub fn new(device_id: JsonValue, feedback_text: impl Into<String>, rating: u8) -> Self {
        Self {
            device_id,
            feedback_text: feedback_text.into(),
            rating,
            category: "General".into(),
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// Manufacturer suggestion for the checker's autocomplete.
#[derive(Debug, Clone, Deserialize)]
pub struct ManufacturerSuggestion {
    pub name: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, JsonValue>,
}

/// User or manufacturer account as listed to super admins.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSummary {
    pub email: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(flatten)]
    pub details: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationToggle {
    pub email: String,
    pub is_active: bool,
}

pub struct AuthApi<'a, T> {
    mediator: &'a RequestMediator<T>,
}

pub struct RiskApi<'a, T> {
    mediator: &'a RequestMediator<T>,
}

pub struct DeviceApi<'a, T> {
    mediator: &'a RequestMediator<T>,
}

pub struct ManufacturerApi<'a, T> {
    mediator: &'a RequestMediator<T>,
}

pub struct AdminApi<'a, T> {
    mediator: &'a RequestMediator<T>,
}

impl<T: Transport> RequestMediator<T> {
    #[must_use]
    pub fn auth(&self) -> AuthApi<'_, T> {
        AuthApi { mediator: self }
    }

    #[must_use]
    pub fn risk(&self) -> RiskApi<'_, T> {
        RiskApi { mediator: self }
    }

    #[must_use]
    pub fn devices(&self) -> DeviceApi<'_, T> {
        DeviceApi { mediator: self }
    }

    #[must_use]
    pub fn manufacturer(&self) -> ManufacturerApi<'_, T> {
        ManufacturerApi { mediator: self }
    }

    #[must_use]
    pub fn admin(&self) -> AdminApi<'_, T> {
        AdminApi { mediator: self }
    }

    /// `GET /health`.
    ///
    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn health(&self) -> Result<JsonValue, Error> {
        self.get("/health", &[]).await
    }
}

impl<T: Transport> AuthApi<'_, T> {
    /// Exchange e-mail and password for an access token.
    ///
    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn login(
        &self,
        kind: AccountKind,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, Error> {
        let path = match kind {
            AccountKind::Hospital => "/login",
            AccountKind::Manufacturer => "/login/manufacturer",
        };
        let body = LoginRequest {
            username: email.to_owned(),
            password: password.to_owned(),
        };
        self.mediator.post(path, &body).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn register_hospital(
        &self,
        registration: &HospitalRegistration,
    ) -> Result<JsonValue, Error> {
        self.mediator.post("/register", registration).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn register_manufacturer(
        &self,
        registration: &ManufacturerRegistration,
    ) -> Result<JsonValue, Error> {
        self.mediator.post("/register/manufacturer", registration).await
    }
}

impl<T: Transport> RiskApi<'_, T> {
    /// Evaluate a device's risk.
    ///
    /// # Errors
    ///
    /// See [`RequestMediator::send`]; [`Error::Json`] if the result lacks the device block.
    pub async fn check(&self, request: &RiskCheckRequest) -> Result<RiskAssessment, Error> {
        let envelope: Envelope<RiskAssessment> = self.mediator.post("/risk/check", request).await?;
        Ok(envelope.data)
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn report_failure(&self, report: &JsonValue) -> Result<JsonValue, Error> {
        self.mediator.post("/report_failure", report).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn submit_feedback(&self, feedback: &Feedback) -> Result<JsonValue, Error> {
        self.mediator.post("/continuous_learning", feedback).await
    }
}

impl<T: Transport> DeviceApi<'_, T> {
    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn list(&self, params: &[(&str, &str)]) -> Result<JsonValue, Error> {
        self.mediator.get("/devices", params).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn get(&self, id: &str) -> Result<JsonValue, Error> {
        let path = format!("/devices/{}", urlencoding::encode(id));
        self.mediator.get(&path, &[]).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn manufacturers(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Vec<ManufacturerSuggestion>, Error> {
        let envelope: Envelope<Vec<ManufacturerSuggestion>> =
            self.mediator.get("/devices/manufacturers", params).await?;
        Ok(envelope.data)
    }
}

impl<T: Transport> ManufacturerApi<'_, T> {
    /// Aggregate metrics for the signed-in manufacturer.
    ///
    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn dashboard(&self) -> Result<JsonValue, Error> {
        let envelope: Envelope<JsonValue> =
            self.mediator.get("/manufacturer/dashboard", &[]).await?;
        Ok(envelope.data)
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn devices(&self) -> Result<JsonValue, Error> {
        self.mediator.get("/manufacturer/devices", &[]).await
    }
}

impl<T: Transport> AdminApi<'_, T> {
    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn users(&self) -> Result<Vec<AccountSummary>, Error> {
        self.mediator.get("/admin/users", &[]).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn manufacturers(&self) -> Result<Vec<AccountSummary>, Error> {
        self.mediator.get("/admin/manufacturers", &[]).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn set_user_active(&self, email: &str, is_active: bool) -> Result<JsonValue, Error> {
        let body = ActivationToggle {
            email: email.to_owned(),
            is_active,
        };
        self.mediator.post("/admin/activate_user", &body).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn set_manufacturer_active(
        &self,
        email: &str,
        is_active: bool,
    ) -> Result<JsonValue, Error> {
        let body = ActivationToggle {
            email: email.to_owned(),
            is_active,
        };
        self.mediator.post("/admin/activate_manufacturer", &body).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn delete_user(&self, email: &str) -> Result<(), Error> {
        let path = format!("/admin/delete_user/{}", urlencoding::encode(email));
        self.mediator.delete(&path).await
    }

    /// # Errors
    ///
    /// See [`RequestMediator::send`].
    pub async fn delete_manufacturer(&self, email: &str) -> Result<(), Error> {
        let path = format!("/admin/delete_manufacturer/{}", urlencoding::encode(email));
        self.mediator.delete(&path).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::mediator::{ApiRequest, ApiResponse};
    use crate::session::SessionManager;
    use crate::store::MemoryStore;
    use crate::testing::{RecordingNotifier, ScriptedTransport};

    fn mediator(
        responder: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    ) -> RequestMediator<ScriptedTransport> {
        let notifier = RecordingNotifier::new();
        let session = Arc::new(SessionManager::new(
            Arc::new(MemoryStore::new()),
            notifier.clone(),
        ));
        session.initialize();
        RequestMediator::new(ScriptedTransport::new(responder), session, notifier)
    }

    #[tokio::test]
    async fn login_posts_username_and_password() {
        let mediator = mediator(|_| ApiResponse::json(200, &json!({"access_token": "a.b.c"})));
        let token = mediator
            .auth()
            .login(AccountKind::Manufacturer, "m@x.io", "pw")
            .await
            .unwrap();
        assert_eq!(token.access_token, "a.b.c");

        let sent = &mediator.transport().requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.path, "/login/manufacturer");
        assert_eq!(
            sent.body,
            Some(json!({"username": "m@x.io", "password": "pw"}))
        );
    }

    #[tokio::test]
    async fn risk_check_unwraps_envelope() {
        let mediator = mediator(|_| {
            ApiResponse::json(
                200,
                &json!({"data": {"device": {"id": "d1", "riskClass": "High", "riskPercentage": 88.0}}}),
            )
        });
        let result = mediator
            .risk()
            .check(&RiskCheckRequest::new("Acme", "Pump"))
            .await
            .unwrap();
        assert_eq!(result.device.risk_class, "High");

        let sent = &mediator.transport().requests()[0];
        assert_eq!(
            sent.body,
            Some(json!({"manufacturer_name": "Acme", "device_name": "Pump", "country": "USA"}))
        );
    }

    #[tokio::test]
    async fn feedback_defaults_category() {
        let mediator = mediator(|_| ApiResponse::json(200, &json!({})));
        mediator
            .risk()
            .submit_feedback(&Feedback::new(json!(7), "Accurate", 5))
            .await
            .unwrap();

        let sent = &mediator.transport().requests()[0];
        assert_eq!(sent.path, "/continuous_learning");
        assert_eq!(
            sent.body,
            Some(json!({"deviceId": 7, "feedbackText": "Accurate", "rating": 5, "category": "General"}))
        );
    }

    #[tokio::test]
    async fn admin_delete_encodes_email() {
        let mediator = mediator(|_| ApiResponse::new(204, Vec::new()));
        mediator.admin().delete_user("a+b@c.com").await.unwrap();

        let sent = &mediator.transport().requests()[0];
        assert_eq!(sent.method, Method::DELETE);
        assert_eq!(sent.path, "/admin/delete_user/a%2Bb%40c.com");
    }

    #[tokio::test]
    async fn writes_accept_empty_created_body() {
        let mediator = mediator(|_| ApiResponse::new(201, Vec::new()));
        let registration = HospitalRegistration {
            email: "h@x.io".to_owned(),
            password: "pw".to_owned(),
            hospital_name: "General".to_owned(),
        };

        let registered = mediator.auth().register_hospital(&registration).await.unwrap();
        assert_eq!(registered, JsonValue::Null);
        let toggled = mediator
            .admin()
            .set_user_active("h@x.io", false)
            .await
            .unwrap();
        assert_eq!(toggled, JsonValue::Null);
    }

    #[tokio::test]
    async fn manufacturer_lookup_passes_query() {
        let mediator = mediator(|_| ApiResponse::json(200, &json!({"data": [{"name": "Acme"}]})));
        let found = mediator
            .devices()
            .manufacturers(&[("q", "Ac")])
            .await
            .unwrap();
        assert_eq!(found[0].name, "Acme");
        assert_eq!(
            mediator.transport().requests()[0].query,
            vec![("q".to_owned(), "Ac".to_owned())]
        );
    }

    #[tokio::test]
    async fn activation_toggle_body() {
        let mediator = mediator(|_| ApiResponse::json(200, &json!({"ok": true})));
        mediator
            .admin()
            .set_manufacturer_active("m@x.io", false)
            .await
            .unwrap();
        let sent = &mediator.transport().requests()[0];
        assert_eq!(sent.path, "/admin/activate_manufacturer");
        assert_eq!(sent.body, Some(json!({"email": "m@x.io", "is_active": false})));
    }
}
