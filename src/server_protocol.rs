use serde_json::{Map, Value};

use crate::error::{Result, TournamentError};
use crate::types::{BattleScoreInput, ClassificationId, QualifyingScoreInput};

/// Messages a viewer socket may send after the bootstrap payload.
#[derive(Debug, PartialEq)]
pub enum ParsedViewerMessage {
    Ping { t: f64 },
    Refresh,
}

pub fn parse_viewer_message(raw: &str) -> Option<ParsedViewerMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    match object.get("type")?.as_str()? {
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedViewerMessage::Ping { t })
        }
        "refresh" => Some(ParsedViewerMessage::Refresh),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
pub struct CompetitionCreateRequest {
    pub classification_id: ClassificationId,
    pub name: String,
}

#[derive(Debug, PartialEq)]
pub struct DriverCreateRequest {
    pub name: String,
    pub number: u32,
}

fn body_object(body: &Value) -> Result<&Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| TournamentError::validation("Request body must be a JSON object"))
}

fn required<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a Value> {
    object
        .get(key)
        .filter(|value| !value.is_null())
        .ok_or_else(|| TournamentError::validation(format!("Field `{key}` is required")))
}

fn required_str(object: &Map<String, Value>, key: &str) -> Result<String> {
    required(object, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TournamentError::validation(format!("Field `{key}` must be a string")))
}

fn required_u64(object: &Map<String, Value>, key: &str) -> Result<u64> {
    required(object, key)?
        .as_u64()
        .ok_or_else(|| {
            TournamentError::validation(format!("Field `{key}` must be a non-negative integer"))
        })
}

fn required_f64(object: &Map<String, Value>, key: &str) -> Result<f64> {
    required(object, key)?
        .as_f64()
        .filter(|value| value.is_finite())
        .ok_or_else(|| TournamentError::validation(format!("Field `{key}` must be a number")))
}

fn narrow<T: TryFrom<u64>>(value: u64, key: &str) -> Result<T> {
    T::try_from(value)
        .map_err(|_| TournamentError::validation(format!("Field `{key}` is out of range")))
}

/// `{"name": "..."}` bodies shared by classification and judge creation.
pub fn parse_name_body(body: &Value) -> Result<String> {
    required_str(body_object(body)?, "name")
}

pub fn parse_competition_create(body: &Value) -> Result<CompetitionCreateRequest> {
    let object = body_object(body)?;
    Ok(CompetitionCreateRequest {
        classification_id: required_u64(object, "classification_id")?,
        name: required_str(object, "name")?,
    })
}

pub fn parse_driver_create(body: &Value) -> Result<DriverCreateRequest> {
    let object = body_object(body)?;
    let name = required_str(object, "name")?;
    let number = narrow(required_u64(object, "number")?, "number")?;
    Ok(DriverCreateRequest { name, number })
}

/// Reads an id array such as `driver_ids` or `judge_ids`.
pub fn parse_id_list(body: &Value, key: &str) -> Result<Vec<u64>> {
    let object = body_object(body)?;
    let items = required(object, key)?
        .as_array()
        .ok_or_else(|| TournamentError::validation(format!("Field `{key}` must be an array")))?;
    items
        .iter()
        .map(|item| {
            item.as_u64().ok_or_else(|| {
                TournamentError::validation(format!("Field `{key}` must hold integer ids"))
            })
        })
        .collect()
}

pub fn parse_qualifying_score(body: &Value) -> Result<QualifyingScoreInput> {
    let object = body_object(body)?;
    let driver_id = required_u64(object, "driver_id")?;
    let judge_id = required_u64(object, "judge_id")?;
    let run_number = narrow(required_u64(object, "run_number")?, "run_number")?;
    Ok(QualifyingScoreInput {
        driver_id,
        judge_id,
        run_number,
        score: required_f64(object, "score")?,
    })
}

/// `omt_round` defaults to 0 when omitted.
pub fn parse_battle_score(body: &Value) -> Result<BattleScoreInput> {
    let object = body_object(body)?;
    let omt_round = match object.get("omt_round") {
        None | Some(Value::Null) => 0,
        Some(_) => narrow(required_u64(object, "omt_round")?, "omt_round")?,
    };
    let judge_id = required_u64(object, "judge_id")?;
    let run_number = narrow(required_u64(object, "run_number")?, "run_number")?;
    Ok(BattleScoreInput {
        judge_id,
        omt_round,
        run_number,
        driver1_points: required_f64(object, "driver1_points")?,
        driver2_points: required_f64(object, "driver2_points")?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_viewer_ping_and_refresh() {
        assert_eq!(
            parse_viewer_message(r#"{"type":"ping","t":12.5}"#),
            Some(ParsedViewerMessage::Ping { t: 12.5 })
        );
        assert_eq!(
            parse_viewer_message(r#"{"type":"refresh"}"#),
            Some(ParsedViewerMessage::Refresh)
        );
        assert_eq!(parse_viewer_message(r#"{"type":"ping"}"#), None);
        assert_eq!(parse_viewer_message("not json"), None);
        assert_eq!(parse_viewer_message(r#"{"type":"start"}"#), None);
    }

    #[test]
    fn parse_qualifying_score_body() {
        let input = parse_qualifying_score(&json!({
            "driver_id": 3,
            "judge_id": 1,
            "run_number": 2,
            "score": 91.5
        }))
        .expect("valid body");
        assert_eq!(
            input,
            QualifyingScoreInput {
                driver_id: 3,
                judge_id: 1,
                run_number: 2,
                score: 91.5
            }
        );
    }

    #[test]
    fn missing_and_mistyped_fields_are_validation_errors() {
        let error = parse_qualifying_score(&json!({"driver_id": 3})).expect_err("missing");
        assert_eq!(error.kind(), "validation_error");
        assert_eq!(error.to_string(), "Field `judge_id` is required");

        let error = parse_qualifying_score(&json!({
            "driver_id": -1, "judge_id": 1, "run_number": 1, "score": 50
        }))
        .expect_err("negative id");
        assert_eq!(error.to_string(), "Field `driver_id` must be a non-negative integer");

        assert!(parse_name_body(&json!(["name"])).is_err());
        assert!(parse_name_body(&json!({"name": 5})).is_err());
        assert!(parse_driver_create(&json!({"name": "A", "number": 5_000_000_000u64})).is_err());
    }

    #[test]
    fn battle_score_defaults_to_main_round() {
        let input = parse_battle_score(&json!({
            "judge_id": 2,
            "run_number": 1,
            "driver1_points": 6,
            "driver2_points": 4.0
        }))
        .expect("valid body");
        assert_eq!(input.omt_round, 0);
        assert_eq!(input.driver1_points, 6.0);

        let overtime = parse_battle_score(&json!({
            "judge_id": 2,
            "omt_round": 2,
            "run_number": 2,
            "driver1_points": 5,
            "driver2_points": 5
        }))
        .expect("overtime body");
        assert_eq!(overtime.omt_round, 2);
        assert!(parse_battle_score(&json!({
            "judge_id": 2, "omt_round": -1, "run_number": 1,
            "driver1_points": 5, "driver2_points": 5
        }))
        .is_err());
    }

    #[test]
    fn id_lists_and_create_bodies() {
        assert_eq!(
            parse_id_list(&json!({"driver_ids": [1, 2, 2]}), "driver_ids").expect("ids"),
            vec![1, 2, 2]
        );
        assert!(parse_id_list(&json!({"driver_ids": ["1"]}), "driver_ids").is_err());
        assert!(parse_id_list(&json!({}), "judge_ids").is_err());

        let competition = parse_competition_create(&json!({
            "classification_id": 4,
            "name": "Round 1"
        }))
        .expect("competition");
        assert_eq!(competition.classification_id, 4);
        assert_eq!(competition.name, "Round 1");

        let driver = parse_driver_create(&json!({"name": "Ace", "number": 77})).expect("driver");
        assert_eq!(driver, DriverCreateRequest { name: "Ace".to_string(), number: 77 });
    }
}
