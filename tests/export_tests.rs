//! End-to-end export runs against a mocked WeatherXM API.
//!
//! The exporter is blocking, so each test drives it from a plain `#[test]`
//! and only uses a Tokio runtime to start and configure the mock server.

use chrono::NaiveDate;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};
use wxm_export::{
    ApiError, Client, Credentials, ExportConfig, ExportError, RunContext, Station, run,
};

// =============================================================================
// Test Helpers
// =============================================================================

const TOKEN: &str = "tok-123";

struct Harness {
    server: MockServer,
    dir: TempDir,
    rt: Runtime,
}

impl Harness {
    fn new() -> Self {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        Self {
            server,
            dir: tempfile::tempdir().unwrap(),
            rt,
        }
    }

    fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    fn verify(&self) {
        self.rt.block_on(self.server.verify());
    }

    fn config(&self) -> ExportConfig {
        ExportConfig {
            url: format!("{}/api/v1", self.server.uri()),
            output_dir: self.dir.path().join("data"),
            verify: true,
            progress: false,
        }
    }

    fn run(&self, today: NaiveDate) -> Result<wxm_export::ExportSummary, ExportError> {
        let config = self.config();
        let client = Client::new(&config).unwrap();
        let ctx = RunContext::new(&client, &config, today);
        run(&ctx, &credentials())
    }

    fn data_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }

    fn read_station(&self, id: &str) -> Value {
        let text = std::fs::read_to_string(self.data_dir().join(format!("{id}.json"))).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}

fn credentials() -> Credentials {
    Credentials::new("alice@example.com", "correct horse")
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn login_ok() -> Mock {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({
            "username": "alice@example.com",
            "password": "correct horse"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": TOKEN, "refreshToken": "refresh-456"})),
        )
}

fn me_ok() -> Mock {
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "user-1", "email": "alice@example.com"})),
        )
}

fn devices(body: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path("/api/v1/me/devices"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

fn two_devices() -> Value {
    json!([
        {
            "id": "st-1",
            "name": "Garden",
            "location": {"lat": 52.37, "lon": 4.89},
            "label": "01:02:03",
            "attributes": {"firmware": "1.2.3"}
        },
        {
            "id": "st-2",
            "name": "Rooftop",
            "location": {"lat": 51.92, "lon": 4.48},
            "current_weather": {"temperature": 8.1}
        }
    ])
}

fn history(id: &str, body: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/me/devices/{id}/history")))
        .and(header("authorization", "Bearer tok-123"))
        .and(query_param("fromDate", "2024-03-07"))
        .and(query_param("toDate", "2024-03-14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

fn never(mock: Mock) -> Mock {
    mock.expect(0)
}

// =============================================================================
// Successful runs
// =============================================================================

#[test]
fn writes_one_file_per_station_with_history() {
    let h = Harness::new();
    h.mount(login_ok().expect(1));
    h.mount(me_ok().expect(1));
    h.mount(devices(two_devices()).expect(1));
    h.mount(
        history("st-1", json!([{"date": "2024-03-07", "hourly": [{"temperature": 7.5}]}]))
            .expect(1),
    );
    h.mount(history("st-2", json!({"days": 8, "unknown_field": [1, 2]})).expect(1));

    let summary = h.run(today()).unwrap();

    assert_eq!(summary.user_id, "user-1");
    assert_eq!(
        summary.files,
        vec![h.data_dir().join("st-1.json"), h.data_dir().join("st-2.json")]
    );

    let entries = std::fs::read_dir(h.data_dir()).unwrap().count();
    assert_eq!(entries, 2);

    assert_eq!(
        h.read_station("st-1"),
        json!({
            "id": "st-1",
            "name": "Garden",
            "location": {"lat": 52.37, "lon": 4.89},
            "historical_data": [{"date": "2024-03-07", "hourly": [{"temperature": 7.5}]}]
        })
    );
    assert_eq!(
        h.read_station("st-2"),
        json!({
            "id": "st-2",
            "name": "Rooftop",
            "location": {"lat": 51.92, "lon": 4.48},
            "historical_data": {"days": 8, "unknown_field": [1, 2]}
        })
    );

    h.verify();
}

#[test]
fn history_is_requested_for_the_week_before_today() {
    let h = Harness::new();
    h.mount(login_ok());
    h.mount(me_ok());
    h.mount(devices(json!([{"id": "st-1", "name": "Garden", "location": {}}])));
    // Any other window falls through to the catch-all and fails the run.
    h.mount(history("st-1", json!([])).expect(1));
    h.mount(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .with_priority(10),
    );

    let summary = h.run(today()).unwrap();
    assert_eq!(summary.window.from.to_string(), "2024-03-07");
    assert_eq!(summary.window.to.to_string(), "2024-03-14");

    h.verify();
}

#[test]
fn rerun_overwrites_previous_output() {
    let h = Harness::new();
    h.mount(login_ok());
    h.mount(me_ok());
    h.mount(devices(json!([{"id": "st-1", "name": "Garden", "location": {"lat": 1.0}}])));
    h.mount(history("st-1", json!({"run": 1, "padding": "x".repeat(256)})).up_to_n_times(1));
    h.run(today()).unwrap();

    h.mount(history("st-1", json!({"run": 2})));
    h.run(today()).unwrap();

    let station: Station = serde_json::from_value(h.read_station("st-1")).unwrap();
    assert_eq!(station.historical_data, Some(json!({"run": 2})));
}

// =============================================================================
// Aborted runs
// =============================================================================

#[test]
fn failed_login_makes_no_further_calls() {
    let h = Harness::new();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"code": "InvalidCredentials", "message": "nope"})),
            )
            .expect(1),
    );
    h.mount(never(me_ok()));
    h.mount(never(devices(two_devices())));

    let err = h.run(today()).unwrap_err();

    assert_eq!(err.to_string(), "Unsuccessful authentication");
    assert!(matches!(
        err,
        ExportError::Authentication(ApiError::Status { status, .. }) if status.as_u16() == 401
    ));
    assert!(!h.data_dir().exists());
    h.verify();
}

#[test]
fn login_without_token_is_an_authentication_failure() {
    let h = Harness::new();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"refreshToken": "r"}))),
    );
    h.mount(never(me_ok()));

    let err = h.run(today()).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Authentication(ApiError::MissingField { field: "token", .. })
    ));
    h.verify();
}

#[test]
fn user_without_id_is_a_user_info_failure() {
    let h = Harness::new();
    h.mount(login_ok());
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/v1/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "a@b"}))),
    );
    h.mount(never(devices(two_devices())));

    let err = h.run(today()).unwrap_err();
    assert_eq!(err.to_string(), "Failed to retrieve user information");
    h.verify();
}

#[test]
fn empty_station_list_is_a_station_data_failure() {
    let h = Harness::new();
    h.mount(login_ok());
    h.mount(me_ok());
    h.mount(devices(json!([])));

    let err = h.run(today()).unwrap_err();

    assert_eq!(err.to_string(), "Failed to retrieve station data");
    assert!(matches!(err, ExportError::StationData(ApiError::EmptyStationList)));
    assert!(!h.data_dir().exists());
}

#[test]
fn station_listing_error_status_is_a_station_data_failure() {
    let h = Harness::new();
    h.mount(login_ok());
    h.mount(me_ok());
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/v1/me/devices"))
            .respond_with(ResponseTemplate::new(500)),
    );

    let err = h.run(today()).unwrap_err();
    assert_eq!(err.to_string(), "Failed to retrieve station data");
}

#[test]
fn history_failure_on_any_station_aborts_before_writing() {
    let h = Harness::new();
    h.mount(login_ok());
    h.mount(me_ok());
    h.mount(devices(two_devices()));
    h.mount(history("st-1", json!([])).expect(1));
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/v1/me/devices/st-2/history"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1),
    );

    let err = h.run(today()).unwrap_err();

    assert_eq!(err.to_string(), "Failed to retrieve historical data");
    assert!(!h.data_dir().exists());
    h.verify();
}

#[test]
fn unwritable_output_is_a_file_write_failure() {
    let h = Harness::new();
    h.mount(login_ok());
    h.mount(me_ok());
    h.mount(devices(two_devices()));
    h.mount(history("st-1", json!([])));
    h.mount(history("st-2", json!([])));
    std::fs::write(h.data_dir(), "in the way").unwrap();

    let err = h.run(today()).unwrap_err();
    assert_eq!(err.to_string(), "Error creating historical data files");
}
