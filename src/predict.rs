use std::time::Duration;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{error, instrument};

use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

const PREDICT_TIMEOUT: Duration = Duration::from_secs(30);

/// The model takes exactly two numeric inputs.
const EXPECTED_INPUTS: usize = 2;

// A body without `data` deserializes to an empty vec so arity validation
// answers with the envelope, matching the auth DTOs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PredictRequest {
    pub data: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: serde_json::Value,
}

/// The script prints a single JSON object on stdout: `{"result": …}` on
/// success or `{"error": "…"}` on failure. Debug output goes to stderr.
#[derive(Debug, Deserialize)]
struct ScriptOutput {
    result: Option<serde_json::Value>,
    error: Option<String>,
}

fn validate_input(data: &[f64]) -> Result<(), ApiError> {
    if data.len() != EXPECTED_INPUTS {
        return Err(ApiError::validation(
            "The model requires exactly 2 input values",
        ));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(ApiError::validation("Input values must be finite numbers"));
    }
    Ok(())
}

fn parse_script_output(stdout: &str) -> Result<serde_json::Value, ApiError> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ApiError::Internal("prediction script produced no output".into()))?;
    let parsed: ScriptOutput = serde_json::from_str(line.trim())
        .map_err(|e| ApiError::Internal(format!("malformed prediction output: {e}")))?;
    if let Some(err) = parsed.error {
        return Err(ApiError::Internal(err));
    }
    parsed
        .result
        .ok_or_else(|| ApiError::Internal("prediction output had no result".into()))
}

#[instrument(skip(state, payload))]
pub async fn predict(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(payload): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    validate_input(&payload.data)?;

    let input = serde_json::to_string(&payload.data)
        .map_err(|e| ApiError::Internal(format!("failed to encode input: {e}")))?;

    let output = tokio::time::timeout(
        PREDICT_TIMEOUT,
        Command::new(&state.config.predict.python_bin)
            .arg(&state.config.predict.script_path)
            .arg(&input)
            .output(),
    )
    .await
    .map_err(|_| ApiError::Internal("prediction timed out".into()))?
    .map_err(|e| {
        error!(error = %e, "failed to spawn prediction script");
        ApiError::Internal(format!("failed to run prediction script: {e}"))
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, status = ?output.status, "prediction script failed");
        return Err(ApiError::Internal("prediction script failed".into()));
    }

    let prediction = parse_script_output(&stdout)?;
    Ok(Json(PredictResponse {
        success: true,
        prediction,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_arity() {
        assert!(validate_input(&[1.0]).is_err());
        assert!(validate_input(&[1.0, 2.0, 3.0]).is_err());
        assert!(validate_input(&[1.0, 2.0]).is_ok());
    }

    #[test]
    fn body_without_data_fails_arity_validation() {
        let req: PredictRequest = serde_json::from_str("{}").unwrap();
        assert!(req.data.is_empty());
        let err = validate_input(&req.data).unwrap_err();
        assert!(err.to_string().contains("exactly 2 input values"));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(validate_input(&[f64::NAN, 1.0]).is_err());
        assert!(validate_input(&[1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn parses_result_line() {
        let value = parse_script_output(r#"{"result": [42.5]}"#).unwrap();
        assert_eq!(value, serde_json::json!([42.5]));
    }

    #[test]
    fn skips_debug_lines_and_uses_last() {
        let stdout = "Received input: [1,2]\n{\"result\": 7.0}\n";
        let value = parse_script_output(stdout).unwrap();
        assert_eq!(value, serde_json::json!(7.0));
    }

    #[test]
    fn surfaces_script_error() {
        let err = parse_script_output(r#"{"error": "Model file not found"}"#).unwrap_err();
        assert!(err.to_string().contains("Model file not found"));
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(parse_script_output("\n  \n").is_err());
    }
}
