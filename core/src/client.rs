//! HTTP request builder and response parser for the provider API.
//!
//! # Design
//! `PortalClient` holds the base URL, the timeout, and two injected
//! services: the `Session` (bearer token source, purged on 401) and the
//! shared `ErrorLog`. Each API call is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The host executes the round-trip in between, or hands a
//! `Transport` to the `fetch_*` helpers.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::diagnostics::ErrorLog;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, TransportError};
use crate::models::{Garantie, ListItem};
use crate::pagination::LoadTicket;
use crate::session::{Session, StoredUser};
use crate::transport::Transport;
use crate::types::{
    CriteriaRequest, Filter, LoginRequest, Page, PasswordChange, ProfileUpdate, Resource,
};

pub const LOGIN_PATH: &str = "/user/login";
pub const LOGOUT_PATH: &str = "/user/logout";
pub const USER_PATH: &str = "/user";
pub const UPDATE_PROFILE_PATH: &str = "/user/update";
pub const CHANGE_PASSWORD_PATH: &str = "/user/changePassword";

const DEFAULT_LOGIN_FAILURE: &str = "Identifiants incorrects";

#[derive(Clone)]
pub struct PortalClient {
    base_url: String,
    timeout: Duration,
    session: Session,
    errors: Arc<ErrorLog>,
}

impl std::fmt::Debug for PortalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PortalClient {
    pub fn new(config: &ApiConfig, session: Session, errors: Arc<ErrorLog>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            session,
            errors,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    // -----------------------------------------------------------------------
    // Generic request
    // -----------------------------------------------------------------------

    /// Build a request for `endpoint`, attaching the stored bearer token.
    ///
    /// A storage failure while reading the token is logged and the request
    /// goes out unauthenticated.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<String>,
        query: Vec<(String, String)>,
    ) -> HttpRequest {
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        let token = self.session.token();
        if let Some(token) = &token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        tracing::debug!(%method, endpoint, authenticated = token.is_some(), "built request");
        HttpRequest {
            method,
            path: format!("{}{}", self.base_url, endpoint),
            endpoint: endpoint.to_string(),
            headers,
            query,
            body,
            timeout: self.timeout,
        }
    }

    fn build_json<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body)
            .map_err(|e| self.record(ApiError::Serialization(e.to_string()), endpoint))?;
        Ok(self.build_request(method, endpoint, Some(body), Vec::new()))
    }

    // -----------------------------------------------------------------------
    // Account endpoints
    // -----------------------------------------------------------------------

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, LOGIN_PATH, input)
    }

    pub fn build_logout(&self) -> HttpRequest {
        self.build_request(HttpMethod::Post, LOGOUT_PATH, None, Vec::new())
    }

    pub fn build_get_profile(&self, user_id: i64) -> HttpRequest {
        self.build_request(HttpMethod::Get, &format!("{USER_PATH}/{user_id}"), None, Vec::new())
    }

    pub fn build_update_profile(&self, input: &ProfileUpdate) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Put, UPDATE_PROFILE_PATH, input)
    }

    pub fn build_change_password(&self, input: &PasswordChange) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, CHANGE_PASSWORD_PATH, input)
    }

    // -----------------------------------------------------------------------
    // Criteria endpoints
    // -----------------------------------------------------------------------

    pub fn build_criteria(
        &self,
        resource: Resource,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_json(HttpMethod::Post, resource.path(), criteria)
    }

    pub fn build_get_prestations(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Prestations, criteria)
    }

    pub fn build_get_prescriptions(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Prescriptions, criteria)
    }

    pub fn build_get_ordonnances(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Ordonnances, criteria)
    }

    pub fn build_get_ordonnance_lignes(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::OrdonnanceLignes, criteria)
    }

    pub fn build_get_garanties(&self, criteria: &CriteriaRequest) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Garanties, criteria)
    }

    pub fn build_get_assures(&self, criteria: &CriteriaRequest) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Assures, criteria)
    }

    pub fn build_get_beneficiaires(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Beneficiaires, criteria)
    }

    pub fn build_get_prestataires(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Prestataires, criteria)
    }

    pub fn build_get_actes(&self, criteria: &CriteriaRequest) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Actes, criteria)
    }

    pub fn build_get_medicaments(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Medicaments, criteria)
    }

    pub fn build_get_ententes_prealables(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::EntentesPrealables, criteria)
    }

    pub fn build_get_factures(&self, criteria: &CriteriaRequest) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Factures, criteria)
    }

    pub fn build_get_statistiques(
        &self,
        criteria: &CriteriaRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.build_criteria(Resource::Statistiques, criteria)
    }

    /// Criteria request for one paginator ticket, with identity taken from
    /// the signed-in user.
    pub fn build_page_request<T: ListItem>(
        &self,
        filter: Option<&Filter>,
        ticket: &LoadTicket,
    ) -> Result<HttpRequest, ApiError> {
        let user = self.session.current_user();
        let criteria = match filter {
            Some(filter) => {
                CriteriaRequest::from_filter(filter, user.as_ref(), ticket.index, ticket.size)
            }
            None => CriteriaRequest {
                user_id: user.as_ref().map(|u| u.id),
                filiale_id: user.as_ref().and_then(|u| u.filiale_id),
                ..CriteriaRequest::window(ticket.index, ticket.size)
            },
        };
        self.build_criteria(T::RESOURCE, &criteria)
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    pub fn parse_list<T: ListItem>(&self, response: HttpResponse) -> Result<Page<T>, ApiError> {
        let page: Page<T::Raw> = self.parse_envelope(response, T::RESOURCE.path())?;
        Ok(page.map(T::from_raw))
    }

    /// Records of any criteria endpoint, left as raw JSON.
    pub fn parse_records(
        &self,
        resource: Resource,
        response: HttpResponse,
    ) -> Result<Page<serde_json::Value>, ApiError> {
        self.parse_envelope(response, resource.path())
    }

    pub fn parse_garanties(&self, response: HttpResponse) -> Result<Vec<Garantie>, ApiError> {
        let page: Page<Garantie> = self.parse_envelope(response, Resource::Garanties.path())?;
        Ok(page.items)
    }

    /// Parse the login answer and persist the returned user and token.
    pub fn parse_login(&self, response: HttpResponse) -> Result<StoredUser, ApiError> {
        let user = self.single_user(response, LOGIN_PATH)?;
        if user.token.as_deref().is_none_or(str::is_empty) {
            return Err(self.record(
                ApiError::Rejected {
                    message: "login response carries no token".to_string(),
                },
                LOGIN_PATH,
            ));
        }
        self.session.save_user(&user).map_err(|e| {
            self.record(ApiError::Unknown(format!("could not persist session: {e}")), LOGIN_PATH)
        })?;
        tracing::info!(user_id = user.id, "signed in");
        Ok(user)
    }

    /// Clear the local session whatever the server answered.
    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        if let Err(e) = self.session.clear() {
            tracing::warn!(error = %e, "could not clear stored session");
        }
        self.check_status(&response, LOGOUT_PATH)
    }

    /// Parse `/user/{id}` or `/user/update`, refreshing the stored profile.
    pub fn parse_profile(&self, response: HttpResponse) -> Result<StoredUser, ApiError> {
        let mut user = self.single_user(response, USER_PATH)?;
        if let Some(current) = self.session.current_user() {
            if current.id == user.id {
                if user.token.is_none() {
                    user.token = current.token;
                }
                if let Err(e) = self.session.save_user(&user) {
                    tracing::warn!(error = %e, "could not refresh stored profile");
                }
            }
        }
        Ok(user)
    }

    pub fn parse_change_password(&self, response: HttpResponse) -> Result<(), ApiError> {
        let _: Page<serde_json::Value> = self.parse_envelope(response, CHANGE_PASSWORD_PATH)?;
        Ok(())
    }

    /// Normalize a failed round-trip reported by the host.
    pub fn fail(&self, err: TransportError, endpoint: &str) -> ApiError {
        self.record(ApiError::from(err), endpoint)
    }

    fn single_user(&self, response: HttpResponse, endpoint: &str) -> Result<StoredUser, ApiError> {
        let page: Page<StoredUser> = self.parse_envelope(response, endpoint)?;
        page.items.into_iter().next().ok_or_else(|| {
            self.record(
                ApiError::Rejected {
                    message: DEFAULT_LOGIN_FAILURE.to_string(),
                },
                endpoint,
            )
        })
    }

    fn parse_envelope<R: DeserializeOwned>(
        &self,
        response: HttpResponse,
        endpoint: &str,
    ) -> Result<Page<R>, ApiError> {
        self.check_status(&response, endpoint)?;
        let page: Page<R> = serde_json::from_str(&response.body)
            .map_err(|e| self.record(ApiError::Deserialization(e.to_string()), endpoint))?;
        if page.has_error {
            let message = page
                .message
                .clone()
                .unwrap_or_else(|| "request rejected".to_string());
            return Err(self.record(ApiError::Rejected { message }, endpoint));
        }
        Ok(page)
    }

    /// Map non-success statuses to `ApiError`, purging credentials on 401.
    fn check_status(&self, response: &HttpResponse, endpoint: &str) -> Result<(), ApiError> {
        if response.is_success() {
            return Ok(());
        }
        let user_id = self.session.current_user().map(|u| u.id);
        let err = match response.status {
            401 => {
                tracing::warn!(endpoint, "401 received, clearing stored credentials");
                if let Err(e) = self.session.clear() {
                    tracing::warn!(error = %e, "could not clear stored credentials");
                }
                ApiError::Unauthorized {
                    body: response.body.clone(),
                }
            }
            404 => ApiError::NotFound,
            status => ApiError::Http {
                status,
                body: response.body.clone(),
            },
        };
        self.errors.handle_api_error(&err, Some(endpoint), user_id);
        Err(err)
    }

    fn record(&self, err: ApiError, endpoint: &str) -> ApiError {
        let user_id = self.session.current_user().map(|u| u.id);
        self.errors.handle_api_error(&err, Some(endpoint), user_id);
        err
    }

    // -----------------------------------------------------------------------
    // Round-trips through a host transport
    // -----------------------------------------------------------------------

    pub fn execute<Tr: Transport + ?Sized>(
        &self,
        transport: &Tr,
        request: HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        let endpoint = request.endpoint.clone();
        transport.execute(request).map_err(|e| self.fail(e, &endpoint))
    }

    pub fn login<Tr: Transport + ?Sized>(
        &self,
        transport: &Tr,
        login: &str,
        password: &str,
    ) -> Result<StoredUser, ApiError> {
        let request = self.build_login(&LoginRequest {
            login: login.to_string(),
            password: password.to_string(),
        })?;
        let response = self.execute(transport, request)?;
        self.parse_login(response)
    }

    pub fn logout<Tr: Transport + ?Sized>(&self, transport: &Tr) -> Result<(), ApiError> {
        match self.execute(transport, self.build_logout()) {
            Ok(response) => self.parse_logout(response),
            Err(err) => {
                if let Err(e) = self.session.clear() {
                    tracing::warn!(error = %e, "could not clear stored session");
                }
                Err(err)
            }
        }
    }

    pub fn fetch_page<T: ListItem, Tr: Transport + ?Sized>(
        &self,
        transport: &Tr,
        filter: Option<&Filter>,
        ticket: &LoadTicket,
    ) -> Result<Page<T>, ApiError> {
        let request = self.build_page_request::<T>(filter, ticket)?;
        let response = self.execute(transport, request)?;
        self.parse_list(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::{Prestation, NON_RENSEIGNE};
    use crate::pagination::Paginator;

    fn client() -> PortalClient {
        PortalClient::new(
            &ApiConfig::new("http://localhost:3000", Duration::from_secs(30)),
            Session::in_memory(),
            Arc::new(ErrorLog::new()),
        )
    }

    fn signed_in() -> PortalClient {
        let c = client();
        c.session()
            .save_user(&StoredUser {
                id: 12,
                login: "clinique".into(),
                nom: None,
                prenom: None,
                email: None,
                token: Some("abc".into()),
                filiale_id: Some(3),
                prestataire_id: Some(77),
                prestataire_libelle: None,
            })
            .unwrap();
        c
    }

    fn body(req: &HttpRequest) -> serde_json::Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn anonymous_request_has_no_authorization() {
        let req = client().build_logout();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/user/logout");
        assert!(req.header("authorization").is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn stored_token_becomes_bearer_header() {
        let req = signed_in().build_get_profile(12);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/user/12");
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));
        assert_eq!(req.timeout, Duration::from_secs(30));
    }

    #[test]
    fn criteria_builders_post_to_fixed_paths() {
        let c = client();
        let criteria = CriteriaRequest::window(0, 10);
        let cases = [
            (c.build_get_prestations(&criteria), "/prestationActe/getByCriteria"),
            (c.build_get_prescriptions(&criteria), "/prescriptionActe/getByCriteria"),
            (c.build_get_ordonnances(&criteria), "/ordonnance/getByCriteria"),
            (c.build_get_garanties(&criteria), "/garantie/getByCriteria"),
            (c.build_get_ententes_prealables(&criteria), "/ententePrealable/getByCriteria"),
            (c.build_get_factures(&criteria), "/facture/getByCriteria"),
        ];
        for (req, path) in cases {
            let req = req.unwrap();
            assert_eq!(req.method, HttpMethod::Post);
            assert_eq!(req.endpoint, path);
            assert_eq!(req.header("content-type"), Some("application/json"));
        }
    }

    #[test]
    fn page_request_uses_session_identity() {
        let c = signed_in();
        let mut paginator = Paginator::<Prestation>::new(10);
        let ticket = paginator.refresh();
        let filter = Filter::new("2025-01-01".parse().unwrap(), "2025-09-30".parse().unwrap())
            .unwrap()
            .with_garantie("PHARMA");
        let req = c.build_page_request::<Prestation>(Some(&filter), &ticket).unwrap();
        let json = body(&req);
        assert_eq!(req.endpoint, "/prestationActe/getByCriteria");
        assert_eq!(json["user_id"], 12);
        assert_eq!(json["filiale_id"], 3);
        assert_eq!(json["data"]["prestataire_id"], 77);
        assert_eq!(json["data"]["garantie"], "PHARMA");
        assert_eq!(json["index"], 0);
        assert_eq!(json["size"], 10);
    }

    #[test]
    fn unauthorized_purges_stored_credentials() {
        let c = signed_in();
        assert!(c.session().is_authenticated());
        let err = c
            .parse_list::<Prestation>(HttpResponse::new(401, "expired"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
        assert!(c.session().current_user().is_none());

        let logged = c.error_log().last().unwrap();
        assert_eq!(logged.code, ErrorCode::Status(401));
        assert_eq!(logged.user_id, Some(12));
        assert_eq!(logged.endpoint.as_deref(), Some("/prestationActe/getByCriteria"));
    }

    #[test]
    fn server_error_keeps_credentials() {
        let c = signed_in();
        let err = c
            .parse_list::<Prestation>(HttpResponse::new(503, "down"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 503, .. }));
        assert!(c.session().is_authenticated());
    }

    #[test]
    fn list_items_are_mapped_with_fallbacks() {
        let c = client();
        let page = c
            .parse_list::<Prestation>(HttpResponse::new(
                200,
                r#"{"items":[{"id":1,"libelleActe":"Radio"},{"id":2}],"count":2}"#,
            ))
            .unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.items[0].acte_libelle, "Radio");
        assert_eq!(page.items[1].beneficiaire_nom, NON_RENSEIGNE);
    }

    #[test]
    fn has_error_envelope_is_rejected() {
        let c = client();
        let err = c
            .parse_list::<Prestation>(HttpResponse::new(
                200,
                r#"{"items":[],"count":0,"hasError":true,"message":"Période invalide"}"#,
            ))
            .unwrap_err();
        assert!(
            matches!(err, ApiError::Rejected { ref message } if message == "Période invalide")
        );
        assert_eq!(c.error_log().len(), 1);
    }

    #[test]
    fn bad_json_is_a_deserialization_error() {
        let err = client()
            .parse_list::<Prestation>(HttpResponse::new(200, "<html>"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn login_persists_user_and_token() {
        let c = client();
        let req = c
            .build_login(&LoginRequest {
                login: "pharma".into(),
                password: "secret".into(),
            })
            .unwrap();
        assert_eq!(body(&req)["login"], "pharma");

        let user = c
            .parse_login(HttpResponse::new(
                200,
                r#"{"items":[{"id":5,"login":"pharma","token":"tok","filialeId":1}],"count":1}"#,
            ))
            .unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(c.session().token().as_deref(), Some("tok"));
        assert!(c.build_logout().header("authorization").is_some());
    }

    #[test]
    fn login_with_no_user_is_rejected() {
        let c = client();
        let err = c
            .parse_login(HttpResponse::new(200, r#"{"items":[],"count":0}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));
        assert!(!c.session().is_authenticated());
    }

    #[test]
    fn logout_clears_session_even_on_server_error() {
        let c = signed_in();
        assert!(c.parse_logout(HttpResponse::new(500, "")).is_err());
        assert!(!c.session().is_authenticated());
    }

    #[test]
    fn profile_refresh_keeps_token() {
        let c = signed_in();
        let user = c
            .parse_profile(HttpResponse::new(
                200,
                r#"{"items":[{"id":12,"login":"clinique","nom":"Clinique Sainte-Anne"}],
                    "count":1}"#,
            ))
            .unwrap();
        assert_eq!(user.token.as_deref(), Some("abc"));
        assert_eq!(
            c.session().current_user().unwrap().nom.as_deref(),
            Some("Clinique Sainte-Anne")
        );
    }

    #[test]
    fn transport_failure_is_normalized_and_logged() {
        let c = client();
        let err = c.fail(TransportError::Connect("refused".into()), "/ordonnance/getByCriteria");
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(c.error_log().last().unwrap().code, ErrorCode::Network);
    }

    #[test]
    fn garanties_parse_into_codes() {
        let garanties = client()
            .parse_garanties(HttpResponse::new(
                200,
                r#"{"items":[{"code":"PHARMA","libelle":"Pharmacie"}],"count":1}"#,
            ))
            .unwrap();
        assert_eq!(garanties[0].code, "PHARMA");
    }
}
