use httpmock::prelude::*;
use nutri_track::core::tracker::{ApplyResult, DailyTargets};
use nutri_track::domain::model::{
    ExtractionErrorKind, ExtractionOutcome, ExtractionRequest, ExtractionSource, Nutrient,
    NutritionRecord,
};
use nutri_track::{
    ExtractionResolver, NutriError, NutritionEngine, OpenFoodFactsClient, TomlConfig,
    VisionLabelInterpreter,
};
use serde_json::json;
use std::time::Duration;

fn product_body(
    name: &str,
    kcal: f64,
    protein: f64,
    fat: f64,
    carbs: f64,
    sugar: f64,
) -> serde_json::Value {
    json!({
        "status": 1,
        "product": {
            "product_name": name,
            "nutriments": {
                "energy-kcal": kcal,
                "proteins": protein,
                "fat": fat,
                "carbohydrates": carbs,
                "sugars": sugar
            }
        }
    })
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

fn resolver(
    database: &MockServer,
    interpreter: &MockServer,
) -> ExtractionResolver<OpenFoodFactsClient, VisionLabelInterpreter> {
    let timeout = Duration::from_secs(5);
    ExtractionResolver::new(
        OpenFoodFactsClient::new(database.base_url(), timeout, "nutri-track-test").unwrap(),
        VisionLabelInterpreter::new(
            interpreter.base_url(),
            "test-model",
            Some("test-key".to_string()),
            timeout,
            "nutri-track-test",
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn test_barcode_hit_never_calls_interpreter() -> anyhow::Result<()> {
    let database = MockServer::start();
    let interpreter = MockServer::start();

    let product_mock = database.mock(|when, then| {
        when.method(GET).path("/api/v0/product/0078742040669.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(product_body("Greek Yogurt", 100.0, 10.0, 2.0, 6.0, 4.0));
    });
    let completion_mock = interpreter.mock(|when, then| {
        when.any_request();
        then.status(500);
    });

    let outcome = resolver(&database, &interpreter)
        .resolve(&ExtractionRequest::new(
            Some("https://example.com/label.jpg".to_string()),
            Some("0078742040669".to_string()),
        ))
        .await;

    product_mock.assert();
    completion_mock.assert_hits(0);
    assert_eq!(outcome.source(), Some(ExtractionSource::ProductDatabase));
    assert_eq!(
        outcome.record(),
        Some(&NutritionRecord::new(100.0, 10.0, 2.0, 6.0, 4.0))
    );
    Ok(())
}

#[tokio::test]
async fn test_barcode_miss_falls_back_to_label() -> anyhow::Result<()> {
    let database = MockServer::start();
    let interpreter = MockServer::start();

    let product_mock = database.mock(|when, then| {
        when.method(GET).path("/api/v0/product/000.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"status": 0, "status_verbose": "product not found"}));
    });
    let completion_mock = interpreter.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .body_contains("https://example.com/label.jpg");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion(
                r#"{"calories": 250, "protein": 5, "fat": 1, "carbohydrates": 50, "sugar": 20, "barcode": null}"#,
            ));
    });

    let outcome = resolver(&database, &interpreter)
        .resolve(&ExtractionRequest::new(
            Some("https://example.com/label.jpg".to_string()),
            Some("000".to_string()),
        ))
        .await;

    product_mock.assert();
    completion_mock.assert();
    assert_eq!(outcome.source(), Some(ExtractionSource::AiLabel));
    assert_eq!(
        outcome.record(),
        Some(&NutritionRecord::new(250.0, 5.0, 1.0, 50.0, 20.0))
    );
    Ok(())
}

#[tokio::test]
async fn test_barcode_miss_without_photo_is_not_found() -> anyhow::Result<()> {
    let database = MockServer::start();
    let interpreter = MockServer::start();

    database.mock(|when, then| {
        when.method(GET).path("/api/v0/product/000.json");
        then.status(404);
    });

    let outcome = resolver(&database, &interpreter)
        .resolve(&ExtractionRequest::from_barcode("000"))
        .await;

    match &outcome {
        ExtractionOutcome::Failure {
            error,
            attempted_source,
            ..
        } => {
            assert_eq!(error.kind, ExtractionErrorKind::BarcodeNotFound);
            assert_eq!(*attempted_source, Some(ExtractionSource::ProductDatabase));
        }
        other => panic!("expected failure, got {:?}", other),
    }

    let err = outcome.into_result().unwrap_err();
    assert!(matches!(err, NutriError::BarcodeNotFound { ref barcode } if barcode == "000"));
    assert_eq!(
        err.user_friendly_message(),
        "Barcode not found in Open Food Facts database."
    );
    Ok(())
}

#[tokio::test]
async fn test_photo_barcode_found_in_database() -> anyhow::Result<()> {
    let database = MockServer::start();
    let interpreter = MockServer::start();

    let product_mock = database.mock(|when, then| {
        when.method(GET).path("/api/v0/product/111.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(product_body("Granola", 120.0, 3.0, 4.0, 18.0, 7.0));
    });
    interpreter.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion(
                "```json\n{\"calories\": 999, \"protein\": 0, \"fat\": 0, \"carbohydrates\": 0, \"sugar\": 0, \"barcode\": \"111\"}\n```",
            ));
    });

    let outcome = resolver(&database, &interpreter)
        .resolve(&ExtractionRequest::from_photo("https://example.com/box.jpg"))
        .await;

    product_mock.assert();
    match outcome {
        ExtractionOutcome::Success {
            record,
            source,
            barcode,
            product_name,
        } => {
            assert_eq!(source, ExtractionSource::ProductDatabase);
            assert_eq!(record.calories(), 120.0);
            assert_eq!(barcode.as_deref(), Some("111"));
            assert_eq!(product_name.as_deref(), Some("Granola"));
        }
        other => panic!("expected success, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_photo_barcode_missing_from_database_keeps_label_values() -> anyhow::Result<()> {
    let database = MockServer::start();
    let interpreter = MockServer::start();

    database.mock(|when, then| {
        when.method(GET).path("/api/v0/product/222.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({"status": 0}));
    });
    interpreter.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion(
                r#"{"calories": 80, "protein": 2, "fat": 0, "carbohydrates": 15, "sugar": 9, "barcode": "222"}"#,
            ));
    });

    let outcome = resolver(&database, &interpreter)
        .resolve(&ExtractionRequest::from_photo("https://example.com/box.jpg"))
        .await;

    assert_eq!(outcome.source(), Some(ExtractionSource::AiBarcode));
    assert_eq!(outcome.record().map(NutritionRecord::calories), Some(80.0));
    assert_eq!(outcome.barcode(), Some("222"));
    Ok(())
}

#[tokio::test]
async fn test_interpreter_failure_is_image_extraction_failed() -> anyhow::Result<()> {
    let database = MockServer::start();
    let interpreter = MockServer::start();

    interpreter.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(completion("Sorry, I can't read that label."));
    });

    let err = resolver(&database, &interpreter)
        .resolve_record(&ExtractionRequest::from_photo("https://example.com/blurry.jpg"))
        .await
        .unwrap_err();

    assert!(matches!(err, NutriError::ImageExtractionFailed { .. }));
    assert_eq!(
        err.user_friendly_message(),
        "Failed to extract nutrition data from the image. Please try again or enter manually."
    );
    Ok(())
}

#[tokio::test]
async fn test_no_input_makes_no_requests() -> anyhow::Result<()> {
    let database = MockServer::start();
    let interpreter = MockServer::start();

    let product_mock = database.mock(|when, then| {
        when.any_request();
        then.status(200);
    });
    let completion_mock = interpreter.mock(|when, then| {
        when.any_request();
        then.status(200);
    });

    let outcome = resolver(&database, &interpreter)
        .resolve(&ExtractionRequest::new(Some("  ".to_string()), Some(String::new())))
        .await;

    product_mock.assert_hits(0);
    completion_mock.assert_hits(0);
    assert!(matches!(
        outcome.into_result(),
        Err(NutriError::NoInputProvided)
    ));
    Ok(())
}

#[tokio::test]
async fn test_engine_logs_product_into_daily_progress() -> anyhow::Result<()> {
    let database = MockServer::start();
    let interpreter = MockServer::start();

    database.mock(|when, then| {
        when.method(GET).path("/api/v0/product/5449000000996.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(product_body("Cola", 140.0, 0.0, 0.0, 35.0, 35.0));
    });

    let config = TomlConfig::from_toml_str(
        r#"
[targets]
calories = 2000
sugar = 50
"#,
    )?;
    let engine = NutritionEngine::new(resolver(&database, &interpreter), config.targets);

    let (outcome, applied) = engine
        .extract(&ExtractionRequest::from_barcode("5449000000996"))
        .await;
    assert!(outcome.is_success());
    assert_eq!(applied, ApplyResult::Applied);

    let entry = engine.log_extracted(None, 2.0).await?;
    assert_eq!(entry.name, "Cola");

    let tracker = engine.tracker().await;
    assert_eq!(tracker.intake().sugar(), 70.0);
    // 超過目標時進度封頂 100
    assert_eq!(tracker.progress(Nutrient::Sugar), 100.0);
    assert!((tracker.progress(Nutrient::Calories) - 14.0).abs() < 1e-9);
    assert_eq!(
        tracker.last_extraction().api_source.as_deref(),
        Some("Open Food Facts API")
    );
    assert_eq!(*tracker.targets(), DailyTargets { sugar: 50.0, ..DailyTargets::default() });
    Ok(())
}
