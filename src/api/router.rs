//! API router.
//!
//! Returns a composable `Router` with every endpoint nested under `/api/`.
//! Responses are never cached by clients.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{delete, get};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints::{clinic, history, lookups, patients, problems, staff, test_documents};
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// JSON bodies carry base64 uploads, so allow some headroom over the
/// decoded size limit.
const BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    let routes = Router::new()
        .route("/clinic", get(clinic::info))
        // Patients
        .route("/patients", get(patients::list).post(patients::create))
        .route(
            "/patients/:id",
            get(patients::canonical)
                .put(patients::update)
                .delete(patients::delete),
        )
        .route("/patients/:id/detail/:slug", get(patients::detail))
        .route("/patients/:id/report", get(patients::report))
        .route(
            "/patients/:id/relatives",
            get(patients::relatives).put(patients::set_relatives),
        )
        .route("/patients/:id/tests", get(patients::tests))
        // Problems of a patient
        .route(
            "/patients/:id/problems",
            get(problems::opened).post(problems::create),
        )
        .route("/patients/:id/problems/new", get(problems::new_form))
        .route("/patients/:id/history", get(problems::closed))
        // Antecedents
        .route(
            "/patients/:id/history/antecedents",
            get(history::detail).put(history::update),
        )
        .route(
            "/patients/:id/history/antecedents/add",
            get(history::add_form).post(history::create),
        )
        // Search
        .route("/search/patients", get(patients::search))
        .route("/search/problems", get(problems::search))
        // Problems
        .route(
            "/problems/:id",
            get(problems::detail)
                .put(problems::update)
                .delete(problems::delete),
        )
        .route(
            "/problems/:id/connections",
            get(problems::connections).put(problems::set_connections),
        )
        .route("/problems/:id/tests", get(test_documents::list).post(test_documents::upload))
        .route("/tests/:id", delete(test_documents::delete))
        // Lookups
        .route("/lookups/patients", get(lookups::patients))
        .route("/lookups/problems", get(lookups::problems))
        .route("/lookups/patients/objects", get(lookups::patient_objects))
        .route("/lookups/problems/objects", get(lookups::problem_objects))
        // Staff
        .route("/staff", get(staff::list).post(staff::create))
        .route(
            "/staff/:id",
            get(staff::detail).put(staff::update).delete(staff::delete),
        )
        .route("/staff/:id/patients", get(staff::patients))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use base64::Engine;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core_state::tests::test_state;

    struct TestApp {
        core: Arc<CoreState>,
        _dir: tempfile::TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let (core, dir) = test_state();
            Self { core: Arc::new(core), _dir: dir }
        }

        async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
            let builder = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(json) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            api_router(self.core.clone()).oneshot(request).await.unwrap()
        }

        async fn json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let response = self.send(method, uri, body).await;
            let status = response.status();
            let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn create_patient(&self, first: &str, last: &str) -> i64 {
            let (status, body) = self
                .json(
                    "POST",
                    "/api/patients",
                    Some(json!({ "first_name": first, "last_name": last })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body["id"].as_i64().unwrap()
        }

        async fn create_problem(&self, patient_id: i64, wording: &str, closed: bool) -> Value {
            let (status, body) = self
                .json(
                    "POST",
                    &format!("/api/patients/{patient_id}/problems"),
                    Some(json!({ "wording": wording, "closed": closed })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body
        }
    }

    fn location(response: &Response) -> &str {
        response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn every_response_is_not_cacheable() {
        let app = TestApp::new();
        let response = app.send("GET", "/api/clinic", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");

        let response = app.send("GET", "/api/patients/999/report", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    }

    #[tokio::test]
    async fn clinic_info_uses_defaults() {
        let app = TestApp::new();
        let (status, body) = app.json("GET", "/api/clinic", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["app_name"], "OpenClinic");
        assert_eq!(body["clinic"]["name"], "My Clinic");
        assert_eq!(body["clinic"]["phone"], "999 66 66 66");
    }

    #[tokio::test]
    async fn create_patient_then_follow_canonical_redirect() {
        let app = TestApp::new();
        let response = app
            .send(
                "POST",
                "/api/patients",
                Some(json!({ "first_name": "John", "last_name": "Doe", "gender": "male" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let detail = location(&response).to_string();

        let bytes = to_bytes(response.into_body(), 65536).await.unwrap();
        let created: Value = serde_json::from_slice(&bytes).unwrap();
        let id = created["id"].as_i64().unwrap();
        assert_eq!(detail, format!("/api/patients/{id}/detail/john-doe"));
        assert_eq!(created["display_name"], "John Doe");
        assert_eq!(created["age"], 0);

        let response = app.send("GET", &format!("/api/patients/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), detail);

        let (status, body) = app.json("GET", &detail, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gender_description"], "Male");

        // Slug is cosmetic.
        let (status, _) = app
            .json("GET", &format!("/api/patients/{id}/detail/anything"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn canonical_redirect_works_for_non_latin_names() {
        let app = TestApp::new();
        let response = app
            .send(
                "POST",
                "/api/patients",
                Some(json!({ "first_name": "Иван", "last_name": "Петров" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created_at = location(&response).to_string();
        assert!(created_at.ends_with("/detail/ivan-petrov"), "{created_at}");

        let id = created_at.split('/').nth(3).unwrap();
        let response = app.send("GET", &format!("/api/patients/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let detail = location(&response).to_string();
        assert_eq!(detail, created_at);

        let (status, body) = app.json("GET", &detail, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "Иван Петров");
    }

    #[tokio::test]
    async fn invalid_patient_is_unprocessable() {
        let app = TestApp::new();
        let (status, body) = app
            .json(
                "POST",
                "/api/patients",
                Some(json!({
                    "first_name": "Invalid",
                    "last_name": "Patient",
                    "birth_date": "2020-01-01",
                    "decease_date": "2019-01-01"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["message"], "Can not die before birth");
    }

    #[tokio::test]
    async fn missing_patient_is_404() {
        let app = TestApp::new();
        for uri in ["/api/patients/42", "/api/patients/42/relatives", "/api/patients/42/problems"] {
            let (status, body) = app.json("GET", uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"]["code"], "NOT_FOUND");
        }
    }

    #[tokio::test]
    async fn field_search_requires_a_field() {
        let app = TestApp::new();
        app.create_patient("John", "Doe").await;
        app.create_patient("Jane", "doe").await;
        app.create_patient("Bob", "Smith").await;

        let (status, body) = app.json("GET", "/api/patients", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["results"].is_null());

        let (_, body) = app
            .json("GET", "/api/patients?search_type=last_name&search_text=DOE", None)
            .await;
        assert_eq!(body["results"]["total"], 2);

        let (_, body) = app
            .json("GET", "/api/patients?search_type=last_name&search_text=", None)
            .await;
        assert_eq!(body["results"]["total"], 3);

        // Whitespace is part of the searched text.
        let (_, body) = app
            .json("GET", "/api/patients?search_type=last_name&search_text=Doe%20", None)
            .await;
        assert_eq!(body["search_text"], "Doe ");
        assert_eq!(body["results"]["total"], 0);
        let (_, body) = app
            .json("GET", "/api/patients?search_type=last_name&search_text=%20%20", None)
            .await;
        assert_eq!(body["results"]["total"], 0);

        let (status, _) = app
            .json("GET", "/api/patients?search_type=password&search_text=x", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn free_text_search_lists_all_without_query() {
        let app = TestApp::new();
        app.create_patient("John", "Doe").await;
        app.create_patient("Bob", "Smith").await;

        let (_, body) = app.json("GET", "/api/search/patients?q=smi", None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["first_name"], "Bob");

        let (_, body) = app.json("GET", "/api/search/patients", None).await;
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn problems_get_sequential_order_numbers() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;

        let (_, draft) = app
            .json("GET", &format!("/api/patients/{patient}/problems/new"), None)
            .await;
        assert_eq!(draft["order_number"], 1);

        for (i, wording) in ["Cough", "Fever", "Rash"].into_iter().enumerate() {
            let problem = app.create_problem(patient, wording, false).await;
            assert_eq!(problem["order_number"], (i + 1) as i64);
        }
        let (_, draft) = app
            .json("GET", &format!("/api/patients/{patient}/problems/new"), None)
            .await;
        assert_eq!(draft["order_number"], 4);
    }

    #[tokio::test]
    async fn opened_and_closed_listings_split_problems() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        app.create_problem(patient, "Asthma", false).await;
        let flu = app.create_problem(patient, "Flu", true).await;
        assert!(flu["closing_date"].is_string());

        let (_, opened) = app
            .json("GET", &format!("/api/patients/{patient}/problems"), None)
            .await;
        let (_, closed) = app
            .json("GET", &format!("/api/patients/{patient}/history"), None)
            .await;
        assert_eq!(opened["problems"]["total"], 1);
        assert_eq!(opened["problems"]["items"][0]["wording"], "Asthma");
        assert_eq!(closed["problems"]["total"], 1);
        assert_eq!(closed["patient"]["id"], patient);

        // Reopening moves it back.
        let id = flu["id"].as_i64().unwrap();
        let (status, body) = app
            .json("PUT", &format!("/api/problems/{id}"), Some(json!({ "wording": "Flu" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["closing_date"].is_null());
        let (_, opened) = app
            .json("GET", &format!("/api/patients/{patient}/problems"), None)
            .await;
        assert_eq!(opened["problems"]["total"], 2);
    }

    #[tokio::test]
    async fn problem_detail_includes_patient() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        let problem = app.create_problem(patient, "Migraine", false).await;
        let id = problem["id"].as_i64().unwrap();

        let (status, body) = app.json("GET", &format!("/api/problems/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "1: Migraine");
        assert_eq!(body["patient"]["id"], patient);
    }

    #[tokio::test]
    async fn antecedents_redirect_until_created() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        let detail = format!("/api/patients/{patient}/history/antecedents");

        let response = app.send("GET", &detail, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("{detail}/add"));

        let (status, form) = app.json("GET", &format!("{detail}/add"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(form["patient"]["id"], patient);

        let (status, _) = app
            .json("POST", &format!("{detail}/add"), Some(json!({ "habits": "Smoker" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app.json("GET", &detail, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["history"]["habits"], "Smoker");

        let (status, body) = app
            .json("POST", &format!("{detail}/add"), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        let (status, body) = app
            .json("PUT", &detail, Some(json!({ "habits": "Former smoker" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["habits"], "Former smoker");
    }

    #[tokio::test]
    async fn antecedents_of_missing_patient_is_404() {
        let app = TestApp::new();
        let (status, _) = app.json("GET", "/api/patients/9/history/antecedents", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn report_needs_history() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        app.create_problem(patient, "Asthma", false).await;
        app.create_problem(patient, "Flu", true).await;

        let report = format!("/api/patients/{patient}/report");
        let (status, _) = app.json("GET", &report, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        app.json(
            "POST",
            &format!("/api/patients/{patient}/history/antecedents/add"),
            Some(json!({})),
        )
        .await;
        let (status, body) = app.json("GET", &report, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["problems"].as_array().unwrap().len(), 1);
        assert_eq!(body["closed_problems"][0]["wording"], "Flu");
    }

    #[tokio::test]
    async fn relatives_ignore_self_and_are_symmetric() {
        let app = TestApp::new();
        let john = app.create_patient("John", "Doe").await;
        let jane = app.create_patient("Jane", "Doe").await;

        let (status, body) = app
            .json(
                "PUT",
                &format!("/api/patients/{john}/relatives"),
                Some(json!({ "ids": [john, jane] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], jane);

        let (_, body) = app
            .json("GET", &format!("/api/patients/{jane}/relatives"), None)
            .await;
        assert_eq!(body[0]["id"], john);
    }

    #[tokio::test]
    async fn connections_ignore_self() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        let a = app.create_problem(patient, "Anemia", false).await["id"].as_i64().unwrap();
        let b = app.create_problem(patient, "Fatigue", false).await["id"].as_i64().unwrap();

        let (status, body) = app
            .json(
                "PUT",
                &format!("/api/problems/{a}/connections"),
                Some(json!({ "ids": [a, b] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = app
            .json("GET", &format!("/api/problems/{b}/connections"), None)
            .await;
        assert_eq!(body[0]["id"], a);
    }

    #[tokio::test]
    async fn upload_list_and_delete_tests() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        let problem = app.create_problem(patient, "Anemia", false).await["id"].as_i64().unwrap();
        let data = format!(
            "data:application/pdf;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.4 hemogram")
        );

        let (status, test) = app
            .json(
                "POST",
                &format!("/api/problems/{problem}/tests"),
                Some(json!({ "file_name": "hemogram.pdf", "data": data })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(test["document_type"], "application/pdf");
        let stored = app
            .core
            .documents
            .path_of(test["document"].as_str().unwrap())
            .unwrap();
        assert!(stored.exists());

        let (_, listed) = app
            .json("GET", &format!("/api/problems/{problem}/tests"), None)
            .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        let (_, by_patient) = app
            .json("GET", &format!("/api/patients/{patient}/tests"), None)
            .await;
        assert_eq!(by_patient.as_array().unwrap().len(), 1);

        let id = test["id"].as_i64().unwrap();
        let (status, _) = app.json("DELETE", &format!("/api/tests/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!stored.exists());
    }

    #[tokio::test]
    async fn upload_rejects_bad_payloads() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        let problem = app.create_problem(patient, "Anemia", false).await["id"].as_i64().unwrap();
        let uri = format!("/api/problems/{problem}/tests");

        let (status, _) = app
            .json("POST", &uri, Some(json!({ "file_name": "a.pdf", "data": "%%%" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json("POST", &uri, Some(json!({ "file_name": "a.pdf", "data": "" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .json(
                "POST",
                "/api/problems/999/tests",
                Some(json!({ "file_name": "a.pdf", "data": "aGVsbG8=" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_patient_cascades() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        let problem = app.create_problem(patient, "Asthma", false).await["id"].as_i64().unwrap();

        let (status, _) = app.json("DELETE", &format!("/api/patients/{patient}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.json("GET", &format!("/api/problems/{problem}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.json("DELETE", &format!("/api/patients/{patient}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn staff_doctors_and_assignment() {
        let app = TestApp::new();
        let (status, body) = app
            .json(
                "POST",
                "/api/staff",
                Some(json!({ "username": "house", "staff_type": "doctor" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION");

        let (_, doctor) = app
            .json(
                "POST",
                "/api/staff",
                Some(json!({
                    "username": "house",
                    "first_name": "Gregory",
                    "last_name": "House",
                    "staff_type": "doctor",
                    "collegiate_number": "28/1234"
                })),
            )
            .await;
        let (_, admin) = app
            .json("POST", "/api/staff", Some(json!({ "username": "desk" })))
            .await;
        let doctor_id = doctor["id"].as_i64().unwrap();

        let (_, doctors) = app.json("GET", "/api/staff?staff_type=doctor", None).await;
        assert_eq!(doctors.as_array().unwrap().len(), 1);
        assert_eq!(doctors[0]["username"], "house");

        let (status, _) = app
            .json(
                "POST",
                "/api/patients",
                Some(json!({ "first_name": "A", "last_name": "B", "doctor_assigned_id": admin["id"] })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = app
            .json(
                "POST",
                "/api/patients",
                Some(json!({ "first_name": "A", "last_name": "B", "doctor_assigned_id": doctor_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, assigned) = app
            .json("GET", &format!("/api/staff/{doctor_id}/patients"), None)
            .await;
        assert_eq!(assigned.as_array().unwrap().len(), 1);

        let (status, _) = app.json("DELETE", &format!("/api/staff/{doctor_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, assigned) = app.json("GET", "/api/search/patients", None).await;
        assert!(assigned["items"][0]["doctor_assigned_id"].is_null());
    }

    #[tokio::test]
    async fn lookups_match_and_resolve() {
        let app = TestApp::new();
        let zed = app.create_patient("Zed", "Brown").await;
        let amy = app.create_patient("Amy", "Browning").await;

        let (_, found) = app.json("GET", "/api/lookups/patients?q=brown", None).await;
        assert_eq!(found.as_array().unwrap().len(), 2);
        assert_eq!(found[0]["label"], "Amy Browning");

        let (_, empty) = app.json("GET", "/api/lookups/patients?q=", None).await;
        assert!(empty.as_array().unwrap().is_empty());

        let (_, resolved) = app
            .json("GET", &format!("/api/lookups/patients/objects?ids={zed},{amy}"), None)
            .await;
        assert_eq!(resolved[0]["first_name"], "Amy");
        assert_eq!(resolved[1]["first_name"], "Zed");

        let (status, _) = app
            .json("GET", "/api/lookups/problems/objects?ids=1,x", None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        app.create_problem(zed, "Back pain", false).await;
        let (_, found) = app.json("GET", "/api/lookups/problems?q=BACK", None).await;
        assert_eq!(found[0]["label"], "1: Back pain");
    }

    #[tokio::test]
    async fn problem_field_search() {
        let app = TestApp::new();
        let patient = app.create_patient("John", "Doe").await;
        app.create_problem(patient, "Chronic back pain", false).await;
        app.create_problem(patient, "Flu", true).await;

        let (_, body) = app.json("GET", "/api/search/problems", None).await;
        assert!(body["results"].is_null());

        let (_, body) = app
            .json(
                "GET",
                "/api/search/problems?search_type_problem=wording&search_text_problem=back",
                None,
            )
            .await;
        assert_eq!(body["results"]["total"], 1);
    }
}
