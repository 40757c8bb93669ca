use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::ExamRecord;
use crate::db::types::Provider;

#[derive(Debug, Deserialize)]
pub(crate) struct ExamActionRequest {
    pub(crate) provider: Provider,
    #[serde(rename = "examCode")]
    pub(crate) exam_code: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StopExamRequest {
    pub(crate) provider: Provider,
    #[serde(rename = "examCode")]
    pub(crate) exam_code: String,
    #[serde(default, rename = "recordLocator", alias = "_id")]
    pub(crate) record_locator: Option<String>,
    pub(crate) resolution: bool,
    #[serde(default)]
    pub(crate) comment: String,
}

/// The registration payload the provider posts when a proctored attempt
/// begins. Everything is optional at the serde layer; the handler rejects
/// missing pieces with a 400.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct InitSessionRequest {
    #[serde(default, rename = "orgExtra")]
    pub(crate) org_extra: OrgExtra,
    #[serde(default, rename = "examCode")]
    pub(crate) exam_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OrgExtra {
    #[serde(default)]
    pub(crate) username: Option<String>,
    #[serde(default, rename = "examID")]
    pub(crate) exam_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InitSessionResponse {
    #[serde(rename = "sessionId")]
    pub(crate) session_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamRecordResponse {
    pub(crate) id: String,
    #[serde(rename = "examId")]
    pub(crate) exam_id: String,
    #[serde(rename = "leftDate")]
    pub(crate) left_date: Value,
    #[serde(rename = "rightDate")]
    pub(crate) right_date: Value,
    pub(crate) subject: String,
    pub(crate) duration: i64,
}

impl ExamRecordResponse {
    pub(crate) fn from_db(record: ExamRecord) -> Self {
        Self {
            id: record.id,
            exam_id: record.exam_id,
            left_date: record.left_date.0,
            right_date: record.right_date.0,
            subject: record.subject,
            duration: record.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn init_payload_parses_provider_field_names() {
        let request: InitSessionRequest = serde_json::from_value(json!({
            "orgExtra": {"username": "ivanov", "examID": "exam-7"},
            "examCode": "EX-1"
        }))
        .expect("init payload");

        assert_eq!(request.org_extra.username.as_deref(), Some("ivanov"));
        assert_eq!(request.org_extra.exam_id.as_deref(), Some("exam-7"));
        assert_eq!(request.exam_code.as_deref(), Some("EX-1"));
    }

    #[test]
    fn init_payload_tolerates_missing_sections() {
        let request: InitSessionRequest =
            serde_json::from_value(json!({"examCode": "EX-1"})).expect("init payload");

        assert!(request.org_extra.username.is_none());
        assert!(request.org_extra.exam_id.is_none());
    }

    #[test]
    fn stop_request_accepts_record_locator_alias() {
        let request: StopExamRequest = serde_json::from_value(json!({
            "provider": "openedu",
            "examCode": "EX-1",
            "_id": "rec-9",
            "resolution": false
        }))
        .expect("stop payload");

        assert_eq!(request.record_locator.as_deref(), Some("rec-9"));
        assert_eq!(request.comment, "");
        assert_eq!(request.provider, Provider::Openedu);
    }

    #[test]
    fn unknown_provider_tag_still_parses() {
        let request: ExamActionRequest = serde_json::from_value(json!({
            "provider": "something-else",
            "examCode": "EX-1"
        }))
        .expect("action payload");

        assert_eq!(request.provider, Provider::Unknown);
    }
}
