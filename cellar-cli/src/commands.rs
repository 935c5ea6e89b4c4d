//! Subcommand handlers.

use crate::Commands;
use anyhow::{Context, bail};
use cellar_core::ConfigurationManager;
use cellar_ml::{PipelineStage, TrainedModel, TrainingPipeline};
use cellar_serve::AppState;
use std::collections::HashMap;
use std::path::Path;

pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    let manager = ConfigurationManager::from_workspace(workspace)
        .with_context(|| format!("failed to load configuration from {}", workspace.display()))?;

    match command {
        Commands::Run => run_pipeline(&manager).await,
        Commands::Stage { stage } => run_stage(&manager, stage).await,
        Commands::Serve { host, port } => serve(manager, host, port).await,
        Commands::Predict { values } => predict(&manager, &values),
    }
}

async fn run_pipeline(manager: &ConfigurationManager) -> anyhow::Result<()> {
    let pipeline = TrainingPipeline::from_config(manager)?;
    let run = pipeline.run().await?;
    for record in &run.stages {
        println!(
            "{:<20} {:>7} ms  {}",
            record.stage.to_string(),
            record.duration_ms,
            record.summary
        );
    }
    println!("run {} completed", run.run_id);
    Ok(())
}

async fn run_stage(manager: &ConfigurationManager, stage: PipelineStage) -> anyhow::Result<()> {
    let pipeline = TrainingPipeline::from_config(manager)?;
    let record = pipeline.run_stage(stage).await?;
    println!("{}: {}", record.stage, record.summary);
    Ok(())
}

async fn serve(
    manager: ConfigurationManager,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let server = manager.server_config();
    let addr = format!(
        "{}:{}",
        host.unwrap_or(server.host),
        port.unwrap_or(server.port)
    );
    let state = AppState::from_config(manager)?;
    cellar_serve::run(state, &addr).await?;
    Ok(())
}

/// Parse `feature=number` pairs. Later duplicates win.
fn parse_values(values: &[String]) -> anyhow::Result<HashMap<String, f64>> {
    let mut parsed = HashMap::with_capacity(values.len());
    for item in values {
        let Some((name, raw)) = item.split_once('=') else {
            bail!("expected <feature>=<number>, got '{item}'");
        };
        let value: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("value for '{}' is not a number: '{raw}'", name.trim()))?;
        if !value.is_finite() {
            bail!("value for '{}' must be finite", name.trim());
        }
        parsed.insert(name.trim().to_string(), value);
    }
    Ok(parsed)
}

fn predict(manager: &ConfigurationManager, values: &[String]) -> anyhow::Result<()> {
    let path = manager.model_path();
    let model = TrainedModel::load(&path)
        .with_context(|| format!("cannot load model from {}", path.display()))?;
    let parsed = parse_values(values)?;
    let unknown: Vec<&str> = parsed
        .keys()
        .filter(|k| !model.feature_names.contains(k))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        bail!("unknown features: {}", unknown.join(", "));
    }
    let vector = model.feature_vector(&parsed)?;
    println!("{}", model.predict_one(&vector)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_values() {
        let parsed = parse_values(&strings(&["fixed acidity=7.4", " pH = 3.51"])).unwrap();
        assert_eq!(parsed["fixed acidity"], 7.4);
        assert_eq!(parsed["pH"], 3.51);
    }

    #[test]
    fn test_parse_values_rejects_garbage() {
        assert!(parse_values(&strings(&["alcohol"])).is_err());
        assert!(parse_values(&strings(&["alcohol=strong"])).is_err());
        assert!(parse_values(&strings(&["alcohol=NaN"])).is_err());
    }
}
