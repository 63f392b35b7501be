//! WebUntis JSON-RPC client.
//!
//! Every call is a POST to `{server}/WebUntis/jsonrpc.do?school={school}`.
//! A fetch runs `authenticate`, then `getTimetable` and `getHolidays` with
//! the session cookie, and always ends with `logout`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::timetable::{Holiday, Lesson, LessonCode, Timetable};
use super::TimetableSource;
use crate::config::WebUntisConfig;
use crate::error::FetchError;

/// HTTP request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client name sent on login.
const CLIENT_NAME: &str = "todopaper";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    id: String,
    method: &'a str,
    params: Value,
    jsonrpc: &'static str,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    session_id: String,
    person_type: i64,
    person_id: i64,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Period {
    date: u32,
    start_time: u32,
    end_time: u32,
    #[serde(default)]
    su: Vec<Named>,
    #[serde(default)]
    ro: Vec<Named>,
    code: Option<String>,
    subst_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HolidayEntry {
    name: String,
    long_name: Option<String>,
    start_date: u32,
    end_date: u32,
}

/// Connection settings resolved from [`WebUntisConfig`].
#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    user: String,
    password: String,
}

/// Timetable client for WebUntis.
#[derive(Debug, Clone)]
pub struct WebUntis {
    config: WebUntisConfig,
    client: Client,
}

impl WebUntis {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: WebUntisConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> Result<Endpoint, FetchError> {
        let server = self
            .config
            .server
            .as_deref()
            .ok_or(FetchError::NotConfigured("WebUntis server"))?;
        let school = self
            .config
            .school
            .as_deref()
            .ok_or(FetchError::NotConfigured("WebUntis school"))?;
        let user = self
            .config
            .user
            .clone()
            .ok_or(FetchError::NotConfigured("WebUntis user"))?;
        let password = self
            .config
            .password
            .clone()
            .ok_or(FetchError::NotConfigured("WebUntis password"))?;

        Ok(Endpoint {
            url: format!(
                "{}/WebUntis/jsonrpc.do?school={school}",
                server.trim_end_matches('/')
            ),
            user,
            password,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        url: &str,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<T, FetchError> {
        let request = RpcRequest {
            id: Uuid::new_v4().to_string(),
            method,
            params,
            jsonrpc: "2.0",
        };

        let mut builder = self.client.post(url).json(&request);
        if let Some(id) = session_id {
            builder = builder.header(COOKIE, format!("JSESSIONID={id}"));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = body.error {
            return Err(FetchError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        body.result
            .ok_or_else(|| FetchError::InvalidResponse(format!("{method}: missing result")))
    }

    async fn fetch_with_session(
        &self,
        url: &str,
        session: &Session,
        day: NaiveDate,
    ) -> Result<Timetable, FetchError> {
        let date = date_to_int(day);
        let periods: Vec<Period> = self
            .call(
                url,
                Some(&session.session_id),
                "getTimetable",
                json!({
                    "options": {
                        "element": { "id": session.person_id, "type": session.person_type },
                        "startDate": date,
                        "endDate": date,
                        "showSubstText": true,
                        "subjectFields": ["id", "name"],
                        "roomFields": ["id", "name"]
                    }
                }),
            )
            .await?;

        let holidays: Vec<HolidayEntry> = self
            .call(url, Some(&session.session_id), "getHolidays", json!({}))
            .await?;

        debug!(
            periods = periods.len(),
            holidays = holidays.len(),
            "Timetable data retrieved"
        );

        Ok(Timetable {
            lessons: periods
                .into_iter()
                .map(Lesson::try_from)
                .collect::<Result<_, _>>()?,
            holidays: holidays
                .into_iter()
                .map(Holiday::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[async_trait]
impl TimetableSource for WebUntis {
    async fn fetch(&self, day: NaiveDate) -> Result<Timetable, FetchError> {
        let endpoint = self.endpoint()?;
        info!(user = %endpoint.user, %day, "Retrieving timetable");

        let session: Session = self
            .call(
                &endpoint.url,
                None,
                "authenticate",
                json!({
                    "user": endpoint.user,
                    "password": endpoint.password,
                    "client": CLIENT_NAME
                }),
            )
            .await?;

        let result = self.fetch_with_session(&endpoint.url, &session, day).await;

        if let Err(e) = self
            .call::<Value>(&endpoint.url, Some(&session.session_id), "logout", json!({}))
            .await
        {
            warn!(error = %e, "WebUntis logout failed");
        }

        result
    }
}

impl TryFrom<Period> for Lesson {
    type Error = FetchError;

    fn try_from(period: Period) -> Result<Self, Self::Error> {
        let day = int_to_date(period.date)?;
        let code = match period.code.as_deref() {
            Some("cancelled") => LessonCode::Cancelled,
            Some("irregular") => LessonCode::Irregular,
            _ => LessonCode::Regular,
        };

        Ok(Self {
            start: NaiveDateTime::new(day, int_to_time(period.start_time)?),
            end: NaiveDateTime::new(day, int_to_time(period.end_time)?),
            subject: period.su.into_iter().next().map(|s| s.name),
            room: period.ro.into_iter().next().map(|r| r.name),
            code,
            substitution_text: period.subst_text,
        })
    }
}

impl TryFrom<HolidayEntry> for Holiday {
    type Error = FetchError;

    fn try_from(entry: HolidayEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            name: entry.long_name.unwrap_or(entry.name),
            start: int_to_date(entry.start_date)?,
            end: int_to_date(entry.end_date)?,
        })
    }
}

/// `2030-03-04` as `20300304`.
fn date_to_int(day: NaiveDate) -> u32 {
    // Years before 0 never reach the API.
    let year = u32::try_from(day.year()).unwrap_or(0);
    year * 10_000 + day.month() * 100 + day.day()
}

fn int_to_date(value: u32) -> Result<NaiveDate, FetchError> {
    let year = i32::try_from(value / 10_000).unwrap_or(0);
    NaiveDate::from_ymd_opt(year, (value / 100) % 100, value % 100)
        .ok_or_else(|| FetchError::InvalidResponse(format!("invalid date {value}")))
}

fn int_to_time(value: u32) -> Result<NaiveTime, FetchError> {
    NaiveTime::from_hms_opt(value / 100, value % 100, 0)
        .ok_or_else(|| FetchError::InvalidResponse(format!("invalid time {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &str) -> WebUntisConfig {
        WebUntisConfig {
            server: Some(server.to_string()),
            school: Some("demo-school".to_string()),
            user: Some("student".to_string()),
            password: Some("secret".to_string()),
        }
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": result
        }))
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/WebUntis/jsonrpc.do"))
            .and(query_param("school", "demo-school"))
            .and(body_partial_json(json!({
                "method": "authenticate",
                "params": { "user": "student", "password": "secret" }
            })))
            .respond_with(rpc_result(json!({
                "sessionId": "ABC123",
                "personType": 5,
                "personId": 42,
                "klasseId": 7
            })))
            .mount(server)
            .await;
    }

    async fn mount_logout(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "logout" })))
            .respond_with(rpc_result(Value::Null))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_date_conversion() {
        let day = NaiveDate::from_ymd_opt(2030, 3, 4).unwrap();
        assert_eq!(date_to_int(day), 20_300_304);
        assert_eq!(int_to_date(20_300_304).unwrap(), day);
        assert!(int_to_date(20_301_399).is_err());
    }

    #[test]
    fn test_time_conversion() {
        assert_eq!(
            int_to_time(755).unwrap(),
            NaiveTime::from_hms_opt(7, 55, 0).unwrap()
        );
        assert!(int_to_time(2575).is_err());
    }

    #[test]
    fn test_period_conversion() {
        let period = Period {
            date: 20_300_304,
            start_time: 800,
            end_time: 850,
            su: vec![],
            ro: vec![Named {
                name: "R12".to_string(),
            }],
            code: Some("irregular".to_string()),
            subst_text: None,
        };

        let lesson = Lesson::try_from(period).unwrap();
        assert_eq!(lesson.subject, None);
        assert_eq!(lesson.room.as_deref(), Some("R12"));
        assert_eq!(lesson.code, LessonCode::Irregular);
    }

    #[tokio::test]
    async fn test_missing_settings() {
        let mut cfg = config("http://127.0.0.1:9");
        cfg.password = None;
        let untis = WebUntis::new(cfg).unwrap();
        let day = NaiveDate::from_ymd_opt(2030, 3, 4).unwrap();

        let err = untis.fetch(day).await.unwrap_err();
        assert!(matches!(err, FetchError::NotConfigured("WebUntis password")));
    }

    #[tokio::test]
    async fn test_fetch_timetable_and_holidays() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(header("cookie", "JSESSIONID=ABC123"))
            .and(body_partial_json(json!({
                "method": "getTimetable",
                "params": { "options": {
                    "element": { "id": 42, "type": 5 },
                    "startDate": 20_300_304,
                    "endDate": 20_300_304
                }}
            })))
            .respond_with(rpc_result(json!([
                {
                    "id": 1, "date": 20_300_304, "startTime": 800, "endTime": 850,
                    "su": [{ "id": 3, "name": "M" }], "ro": [{ "id": 9, "name": "101" }]
                },
                {
                    "id": 2, "date": 20_300_304, "startTime": 855, "endTime": 945,
                    "su": [{ "id": 4, "name": "E" }], "ro": [],
                    "code": "cancelled"
                }
            ])))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(header("cookie", "JSESSIONID=ABC123"))
            .and(body_partial_json(json!({ "method": "getHolidays" })))
            .respond_with(rpc_result(json!([
                {
                    "id": 1, "name": "Ostern", "longName": "Osterferien",
                    "startDate": 20_300_413, "endDate": 20_300_422
                }
            ])))
            .mount(&server)
            .await;

        mount_logout(&server, 1).await;

        let untis = WebUntis::new(config(&server.uri())).unwrap();
        let day = NaiveDate::from_ymd_opt(2030, 3, 4).unwrap();
        let timetable = untis.fetch(day).await.unwrap();

        assert_eq!(timetable.lessons.len(), 2);
        assert_eq!(timetable.lessons[0].subject.as_deref(), Some("M"));
        assert_eq!(timetable.lessons[0].room.as_deref(), Some("101"));
        assert_eq!(timetable.lessons[1].code, LessonCode::Cancelled);
        assert_eq!(timetable.lessons[1].room, None);

        assert_eq!(timetable.holidays.len(), 1);
        assert_eq!(timetable.holidays[0].name, "Osterferien");
        assert_eq!(
            timetable.holidays[0].end,
            NaiveDate::from_ymd_opt(2030, 4, 22).unwrap()
        );
    }

    #[tokio::test]
    async fn test_rpc_error_still_logs_out() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getTimetable" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "1",
                "error": { "code": -7004, "message": "no allowed date" }
            })))
            .mount(&server)
            .await;

        mount_logout(&server, 1).await;

        let untis = WebUntis::new(config(&server.uri())).unwrap();
        let day = NaiveDate::from_ymd_opt(2030, 3, 4).unwrap();
        let err = untis.fetch(day).await.unwrap_err();

        assert!(matches!(err, FetchError::Rpc { code: -7004, .. }));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "authenticate" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "1",
                "error": { "code": -8504, "message": "bad credentials" }
            })))
            .mount(&server)
            .await;

        mount_logout(&server, 0).await;

        let untis = WebUntis::new(config(&server.uri())).unwrap();
        let day = NaiveDate::from_ymd_opt(2030, 3, 4).unwrap();
        let err = untis.fetch(day).await.unwrap_err();

        assert!(matches!(err, FetchError::Rpc { code: -8504, ref message } if message == "bad credentials"));
    }
}
