//! HTTP routes of the inference service.

use crate::error::ServeError;
use crate::state::AppState;
use axum::{
    Form, Json, Router,
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::collections::HashMap;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/train", get(train_handler))
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn page(state: &AppState, result: Result<String, ServeError>) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            if err.status().is_server_error() {
                warn!(error = %err, "request failed");
            }
            state.views().error_response(&err)
        }
    }
}

async fn index_handler(State(state): State<AppState>) -> Response {
    let fields: Vec<_> = state
        .manager()
        .schema()
        .feature_names()
        .into_iter()
        .map(|name| json!({ "name": name }))
        .collect();
    let data = json!({
        "fields": fields,
        "model_loaded": state.model_handle().is_loaded().await,
    });
    page(&state, state.views().render("index", &data))
}

async fn train_handler(State(state): State<AppState>) -> Response {
    let result = train(&state).await;
    page(&state, result)
}

async fn train(state: &AppState) -> Result<String, ServeError> {
    let Some(_guard) = state.try_begin_training() else {
        return Err(ServeError::TrainingInProgress);
    };
    info!("training requested over HTTP");
    let run = match state.pipeline().run().await {
        Ok(run) => run,
        Err(err) => {
            state.record_run(err.state()).await;
            return Err(err.into());
        }
    };
    state.record_run(run.state).await;
    let model = state.reload_model().await?;
    info!(run_id = %run.run_id, features = model.n_features(), "model reloaded");

    let stages: Vec<_> = run
        .stages
        .iter()
        .map(|r| {
            json!({
                "stage": r.stage.to_string(),
                "duration_ms": r.duration_ms,
                "summary": r.summary,
            })
        })
        .collect();
    let data = json!({
        "run_id": run.run_id.to_string(),
        "elapsed_ms": (run.finished_at - run.started_at).num_milliseconds(),
        "stages": stages,
    });
    state.views().render("train", &data)
}

async fn predict_handler(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let result = predict(&state, &form).await;
    page(&state, result)
}

/// Parse every schema feature from the form, collecting all problems.
fn parse_features(
    feature_names: &[&str],
    form: &HashMap<String, String>,
) -> Result<HashMap<String, f64>, ServeError> {
    let mut values = HashMap::with_capacity(feature_names.len());
    let mut problems = Vec::new();
    for &name in feature_names {
        match form.get(name).map(|raw| raw.trim()) {
            None | Some("") => problems.push(format!("{name}: missing")),
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => {
                    values.insert(name.to_string(), v);
                }
                _ => problems.push(format!("{name}: '{raw}' is not a number")),
            },
        }
    }
    if problems.is_empty() {
        Ok(values)
    } else {
        Err(ServeError::InvalidInput { problems })
    }
}

async fn predict(state: &AppState, form: &HashMap<String, String>) -> Result<String, ServeError> {
    let feature_names = state.manager().schema().feature_names();
    let values = parse_features(&feature_names, form)?;
    let model = state.model().await?;
    let vector = model.feature_vector(&values)?;
    let prediction = model.predict_one(&vector)?;
    info!(prediction, "prediction served");

    let inputs: Vec<_> = model
        .feature_names
        .iter()
        .zip(&vector)
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();
    let data = json!({
        "prediction": format!("{prediction:.3}"),
        "inputs": inputs,
        "trained_at": model.trained_at.to_rfc3339(),
        "train_rows": model.train_rows,
    });
    state.views().render("result", &data)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model_loaded": state.model_handle().is_loaded().await,
        "last_run": state.last_run().await,
    }))
}

/// Serve on `addr` until Ctrl-C.
pub async fn run(state: AppState, addr: &str) -> Result<(), ServeError> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "inference service listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_features_ok() {
        let values =
            parse_features(&["pH", "alcohol"], &form(&[("pH", "3.5"), ("alcohol", " 9.4 ")]))
                .unwrap();
        assert_eq!(values["pH"], 3.5);
        assert_eq!(values["alcohol"], 9.4);
    }

    #[test]
    fn test_parse_features_reports_every_problem() {
        let err = parse_features(
            &["pH", "alcohol", "density"],
            &form(&[("pH", "abc"), ("density", "")]),
        )
        .unwrap_err();
        let ServeError::InvalidInput { problems } = err else {
            panic!("expected invalid input");
        };
        assert_eq!(
            problems,
            vec![
                "pH: 'abc' is not a number".to_string(),
                "alcohol: missing".to_string(),
                "density: missing".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_features_rejects_non_finite() {
        assert!(parse_features(&["pH"], &form(&[("pH", "NaN")])).is_err());
        assert!(parse_features(&["pH"], &form(&[("pH", "inf")])).is_err());
    }
}
