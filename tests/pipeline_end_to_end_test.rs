//! Full pipeline runs against a JSON export directory

mod common;

use common::{PipelineFixtureBuilder, SCHEMA};
use tabflow::array::read_npy;
use tabflow::evaluation::EvaluationReport;
use serde_json::json;
use tabflow::pipeline::{Pipeline, StageStatus};
use tabflow::prediction::{Predictor, RefitSettings};
use tabflow::storage::{self, ArtifactStore};
use tabflow::table::read_csv;
use tabflow::validation::Report;

#[tokio::test]
async fn test_ten_rows_run_end_to_end() {
    let fixture = PipelineFixtureBuilder::new().unwrap().build().unwrap();
    let pipeline = Pipeline::from_config(fixture.config.clone()).unwrap();

    let report = pipeline.run().await.unwrap();
    assert!(report.succeeded, "{}", report);

    let store = ArtifactStore::new(&fixture.config.artifact_root);
    let run = store.latest_run().unwrap();
    assert_eq!(run.id(), &report.run_id);
    let paths = run.paths();

    let raw = read_csv(&paths.raw_data()).unwrap();
    assert_eq!(raw.n_rows(), 10);
    assert!(!raw.has_column("_id"));

    let train = read_csv(&paths.train_csv()).unwrap();
    let test = read_csv(&paths.test_csv()).unwrap();
    assert_eq!(train.n_rows(), 7);
    assert_eq!(test.n_rows(), 3);
    assert_eq!(train.column_names(), test.column_names());

    let validation: Report = storage::read_yaml(&paths.validation_report()).unwrap();
    assert!(validation.ok);

    let train_array = read_npy(&paths.train_array()).unwrap();
    let test_array = read_npy(&paths.test_array()).unwrap();
    assert_eq!(train_array.rows(), 7);
    assert_eq!(test_array.rows(), 3);
    assert_eq!(train_array.cols(), test_array.cols());

    let evaluation: EvaluationReport = storage::read_yaml(&paths.evaluation_report()).unwrap();
    assert!((0.0..=1.0).contains(&evaluation.accuracy));
    assert_eq!(evaluation.run_id, report.run_id);
    assert!(evaluation.model_path.starts_with(run.dir()));
    assert!(evaluation.test_array_path.starts_with(run.dir()));
}

#[tokio::test]
async fn test_same_seed_gives_same_evaluation() {
    let first = PipelineFixtureBuilder::new().unwrap().build().unwrap();
    let second = PipelineFixtureBuilder::new().unwrap().build().unwrap();

    let mut reports = Vec::new();
    for fixture in [&first, &second] {
        let pipeline = Pipeline::from_config(fixture.config.clone()).unwrap();
        pipeline.run().await.unwrap();
        let run = pipeline.store().latest_run().unwrap();
        let report: EvaluationReport =
            storage::read_yaml(&run.paths().evaluation_report()).unwrap();
        reports.push((report.accuracy, report.classification_report));
    }
    assert_eq!(reports[0], reports[1]);
}

#[tokio::test]
async fn test_schema_mismatch_halts_and_keeps_report() {
    let schema = SCHEMA.replace("  - Response: int\n", "  - Response: int\n  - Policy_Sales_Channel: float\n");
    let fixture = PipelineFixtureBuilder::new()
        .unwrap()
        .with_schema(schema)
        .build()
        .unwrap();
    let pipeline = Pipeline::from_config(fixture.config.clone()).unwrap();

    let report = pipeline.run().await.unwrap();
    assert!(!report.succeeded);
    assert_eq!(report.failed_stage.as_deref(), Some("validation"));
    assert_eq!(report.stage("training").unwrap().status, StageStatus::Skipped);

    let run = pipeline.store().latest_run().unwrap();
    let validation: Report = storage::read_yaml(&run.paths().validation_report()).unwrap();
    assert!(!validation.ok);
    assert_eq!(validation.splits["train"].missing, vec!["Policy_Sales_Channel"]);
    assert!(!run.paths().model().exists());
}

#[tokio::test]
async fn test_empty_collection_fails_ingestion() {
    let fixture = PipelineFixtureBuilder::new()
        .unwrap()
        .with_documents(Vec::new())
        .build()
        .unwrap();
    let report = Pipeline::from_config(fixture.config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.failed_stage.as_deref(), Some("ingestion"));
}

#[tokio::test]
async fn test_consecutive_runs_get_increasing_ids() {
    let fixture = PipelineFixtureBuilder::new().unwrap().build().unwrap();
    let pipeline = Pipeline::from_config(fixture.config.clone()).unwrap();

    let first = pipeline.run().await.unwrap();
    let second = pipeline.run().await.unwrap();

    assert!(second.run_id > first.run_id);
    assert_eq!(pipeline.store().latest_run().unwrap().id(), &second.run_id);
    assert!(first.run_dir.exists());
}

#[tokio::test]
async fn test_wrong_column_type_halts_validation() {
    let schema = SCHEMA.replace("  - Age: int\n", "  - Age: float\n");
    let fixture = PipelineFixtureBuilder::new()
        .unwrap()
        .with_schema(schema)
        .build()
        .unwrap();
    let pipeline = Pipeline::from_config(fixture.config.clone()).unwrap();

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.failed_stage.as_deref(), Some("validation"));

    let run = pipeline.store().latest_run().unwrap();
    let validation: Report = storage::read_yaml(&run.paths().validation_report()).unwrap();
    assert_eq!(validation.splits["train"].dtype_issues["Age"], "expected float, got int64");
    assert!(validation.splits["train"].missing.is_empty());
}

#[tokio::test]
async fn test_failed_run_keeps_serving_previous_model() {
    let fixture = PipelineFixtureBuilder::new().unwrap().build().unwrap();
    let good = Pipeline::from_config(fixture.config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    assert!(good.succeeded);

    let mut outage = fixture.config.clone();
    outage.source.collection = "missing".to_string();
    let failed = Pipeline::from_config(outage).unwrap().run().await.unwrap();
    assert_eq!(failed.failed_stage.as_deref(), Some("ingestion"));
    assert!(failed.run_id > good.run_id);

    let store = ArtifactStore::new(&fixture.config.artifact_root);
    let refit = RefitSettings {
        schema_path: &fixture.config.schema_path,
        steps: &fixture.config.feature_steps,
    };
    let predictor = Predictor::from_latest(&store, &refit).unwrap();
    assert_eq!(predictor.run_id(), &good.run_id);
    let labels = predictor
        .predict_value(&json!({
            "Gender": "Female",
            "Age": 47,
            "Vehicle_Age": "> 2 Years",
            "Vehicle_Damage": "Yes",
            "Annual_Premium": 38000.0
        }))
        .unwrap();
    assert_eq!(labels.len(), 1);
}
