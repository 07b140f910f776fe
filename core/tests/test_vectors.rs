//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use std::sync::Arc;
use std::time::Duration;

use portail_core::{
    ApiConfig, ApiError, ErrorCode, ErrorLog, Filter, HttpMethod, HttpRequest, HttpResponse,
    ListItem, LoadMode, LoadTicket, LoginRequest, Ordonnance, PortalClient, Prescription,
    Prestation, Session, StoredUser,
};
use serde::Serialize;

const BASE_URL: &str = "http://localhost:3000";

fn client() -> PortalClient {
    PortalClient::new(
        &ApiConfig::new(BASE_URL, Duration::from_secs(30)),
        Session::in_memory(),
        Arc::new(ErrorLog::new()),
    )
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &serde_json::Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

fn assert_request(name: &str, req: &HttpRequest, expected: &serde_json::Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(
        req.path,
        format!("{BASE_URL}{}", expected["path"].as_str().unwrap()),
        "{name}: path"
    );

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    let req_body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
    assert_eq!(req_body, expected["body"], "{name}: body");
}

fn assert_error(name: &str, err: &ApiError, expected: &str) {
    match expected {
        "Rejected" => assert!(
            matches!(err, ApiError::Rejected { .. }),
            "{name}: expected Rejected, got {err:?}"
        ),
        "Http" => assert!(
            matches!(err, ApiError::Http { .. }),
            "{name}: expected Http, got {err:?}"
        ),
        "NotFound" => assert!(matches!(err, ApiError::NotFound), "{name}: expected NotFound"),
        other => panic!("{name}: unknown expected_error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Criteria lists
// ---------------------------------------------------------------------------

fn check_list_case<T: ListItem + Serialize + std::fmt::Debug>(c: &PortalClient, case: &serde_json::Value) {
    let name = case["name"].as_str().unwrap();
    let filter: Option<Filter> = serde_json::from_value(case["filter"].clone()).unwrap();
    let page = case["page"].as_u64().unwrap() as u32;
    let size = case["page_size"].as_u64().unwrap() as u32;
    let ticket = LoadTicket {
        page,
        mode: if page == 0 { LoadMode::Replace } else { LoadMode::Append },
        generation: 1,
        index: page * size,
        size,
    };

    // Verify build
    let req = c.build_page_request::<T>(filter.as_ref(), &ticket).unwrap();
    assert_request(name, &req, &case["expected_request"]);

    // Verify parse
    let result = c.parse_list::<T>(simulated(case));
    if let Some(expected_error) = case.get("expected_error") {
        assert_error(name, &result.unwrap_err(), expected_error.as_str().unwrap());
    } else {
        let page = result.unwrap();
        assert_eq!(page.count, case["expected_count"].as_u64().unwrap(), "{name}: count");
        let items = serde_json::to_value(&page.items).unwrap();
        assert_eq!(items, case["expected_result"], "{name}: parsed result");
    }
}

#[test]
fn criteria_test_vectors() {
    let raw = include_str!("../../test-vectors/criteria.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let c = client();
        let user: Option<StoredUser> =
            serde_json::from_value(case["session_user"].clone()).unwrap();
        if let Some(user) = user {
            c.session().save_user(&user).unwrap();
        }

        match case["resource"].as_str().unwrap() {
            "prestations" => check_list_case::<Prestation>(&c, case),
            "prescriptions" => check_list_case::<Prescription>(&c, case),
            "ordonnances" => check_list_case::<Ordonnance>(&c, case),
            other => panic!("unknown resource: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[test]
fn login_test_vectors() {
    let raw = include_str!("../../test-vectors/login.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let c = client();
        let name = case["name"].as_str().unwrap();
        let input: LoginRequest = serde_json::from_value(case["input"].clone()).unwrap();

        // Verify build
        let req = c.build_login(&input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        // Verify parse
        let result = c.parse_login(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            assert_error(name, &result.unwrap_err(), expected_error.as_str().unwrap());
            assert!(!c.session().is_authenticated(), "{name}: no session on failure");
        } else {
            let user = result.unwrap();
            let expected: StoredUser =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(user, expected, "{name}: parsed result");
            assert_eq!(c.session().current_user(), Some(expected), "{name}: stored user");
        }
    }
}

// ---------------------------------------------------------------------------
// Error statuses
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = client();
        c.session()
            .save_user(&StoredUser {
                id: 7,
                login: "pharma.centre".into(),
                nom: None,
                prenom: None,
                email: None,
                token: Some("tok-7".into()),
                filiale_id: Some(2),
                prestataire_id: Some(41),
                prestataire_libelle: None,
            })
            .unwrap();

        let err = c.parse_list::<Prestation>(simulated(case)).unwrap_err();
        let expected_code = case["expected_code"].as_str().unwrap();
        assert_eq!(err.code(), ErrorCode::parse(expected_code), "{name}: code");
        assert_eq!(err.code().to_string(), expected_code, "{name}: code string");

        let info = c.error_log().last().unwrap();
        assert_eq!(info.user_id, Some(7), "{name}: user id");
        assert_eq!(
            info.user_message(),
            case["expected_message"].as_str().unwrap(),
            "{name}: message"
        );
        assert_eq!(
            info.is_recoverable(),
            case["expected_recoverable"].as_bool().unwrap(),
            "{name}: recoverable"
        );
        assert_eq!(
            c.session().is_authenticated(),
            case["expected_session_kept"].as_bool().unwrap(),
            "{name}: session"
        );
    }
}
