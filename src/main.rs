use clap::Parser;
use nutri_track::adapters::photo::photo_source_to_url;
use nutri_track::core::tracker::{ExtractionDebugInfo, NutrientProgress};
use nutri_track::core::ConfigProvider;
use nutri_track::domain::model::ExtractionOutcome;
use nutri_track::utils::error::{ErrorSeverity, NutriError};
use nutri_track::utils::{logger, validation::Validate};
use nutri_track::{
    CliConfig, ExtractionResolver, NutritionEngine, OpenFoodFactsClient, TomlConfig,
    VisionLabelInterpreter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置 (若有指定)
    let toml_config = match cli.config.as_deref().map(TomlConfig::from_file) {
        Some(Ok(mut config)) => {
            // 明確指定的旗標與環境變數優先於檔案
            cli.apply_to(&mut config);
            Some(config)
        }
        Some(Err(e)) => {
            logger::init_cli_logger(cli.verbose);
            exit_with(&e);
        }
        None => None,
    };

    // 初始化日誌
    let json_logs = cli.json || toml_config.as_ref().is_some_and(TomlConfig::json_logs);
    if json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting nutri-track CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    let validated = match &toml_config {
        Some(config) => cli.validate().and_then(|_| config.validate()),
        None => cli.validate(),
    };
    if let Err(e) = validated {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let provider: &dyn ConfigProvider = match &toml_config {
        Some(config) => {
            tracing::info!("📄 Using configuration file: {:?}", cli.config);
            config as &dyn ConfigProvider
        }
        None => &cli,
    };

    if let Err(e) = run(&cli, provider).await {
        tracing::error!(
            "❌ nutri-track failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        exit_with(&e);
    }

    Ok(())
}

async fn run(cli: &CliConfig, provider: &dyn ConfigProvider) -> nutri_track::Result<()> {
    // 建立外部服務
    let database = OpenFoodFactsClient::from_config(provider)?;
    let interpreter = VisionLabelInterpreter::from_config(provider)?;
    if provider.interpreter_api_key().is_none() {
        tracing::warn!("⚠️ No interpreter API key configured, label scanning may be rejected");
    }

    let engine = NutritionEngine::new(
        ExtractionResolver::new(database, interpreter),
        provider.daily_targets(),
    );

    for (nutrient, value) in cli.target_overrides() {
        let snapped = engine.set_target(nutrient, value).await?;
        tracing::info!("🎯 {} target set to {}", nutrient.display_name(), snapped);
    }

    let photo_url = match cli.photo.as_deref() {
        Some(source) if !source.trim().is_empty() => Some(photo_source_to_url(source).await?),
        _ => None,
    };
    let request = cli.extraction_request(photo_url);

    let outcome = if request.is_empty() {
        // 沒有輸入時只顯示今日進度
        None
    } else {
        let (outcome, _) = engine.extract(&request).await;
        if outcome.is_success() {
            let entry = engine
                .log_extracted(cli.food_name.as_deref(), cli.servings)
                .await?;
            tracing::info!("🍽️ Logged {} x{} serving(s)", entry.name, entry.servings);
        }
        Some(outcome)
    };

    let tracker = engine.tracker().await;
    let summary = tracker.summary();

    if cli.json {
        let report = serde_json::json!({
            "outcome": outcome,
            "extraction": tracker.last_extraction(),
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if outcome.is_some() {
            print_extraction(tracker.last_extraction());
        }
        print_summary(&summary);
    }

    match outcome {
        Some(outcome @ ExtractionOutcome::Failure { .. }) => outcome.into_result().map(|_| ()),
        _ => Ok(()),
    }
}

fn print_extraction(info: &ExtractionDebugInfo) {
    println!("🔎 Extraction");
    println!("   Image type: {}", info.image_type.as_deref().unwrap_or("-"));
    println!("   Barcode:    {}", info.barcode.as_deref().unwrap_or("-"));
    println!("   API source: {}", info.api_source.as_deref().unwrap_or("-"));
    if let Some(name) = &info.product_name {
        println!("   Product:    {}", name);
    }
    if let Some(response) = &info.api_response {
        println!("   Response:   {}", response);
    }
    if let Some(message) = &info.error_message {
        println!("❌ {}", message);
    }
}

fn print_summary(summary: &[NutrientProgress]) {
    println!("📊 Today's progress");
    for row in summary {
        println!(
            "   {:<8} {:>7.1} / {:>6.0} {:<4} {:>5.1}%",
            row.nutrient.display_name(),
            row.intake,
            row.target,
            row.nutrient.unit(),
            row.progress
        );
    }
}

fn exit_with(e: &NutriError) -> ! {
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,      // 輸入或辨識失敗，已提示使用者
        ErrorSeverity::Medium => 2,   // 網路錯誤，可重試
        ErrorSeverity::High => 1,     // 配置錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    };

    std::process::exit(exit_code);
}
