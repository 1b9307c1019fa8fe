use crate::core::resolver::ExtractionResolver;
use crate::core::tracker::{ApplyResult, DailyTargets, FoodEntry, IntakeTracker, NutrientProgress};
use crate::domain::model::{ExtractionOutcome, ExtractionRequest, Nutrient, NutritionRecord};
use crate::domain::ports::{LabelInterpreter, ProductDatabase};
use crate::utils::error::{NutriError, Result};
use chrono::Utc;
use tokio::sync::Mutex;

const DEFAULT_FOOD_NAME: &str = "Scanned food";

/// Runs extractions against a shared tracker.
///
/// Several extractions may be in flight at once; only the most recently
/// started one is allowed to update what the tracker shows.
pub struct NutritionEngine<D: ProductDatabase, I: LabelInterpreter> {
    resolver: ExtractionResolver<D, I>,
    tracker: Mutex<IntakeTracker>,
}

impl<D: ProductDatabase, I: LabelInterpreter> NutritionEngine<D, I> {
    pub fn new(resolver: ExtractionResolver<D, I>, targets: DailyTargets) -> Self {
        Self::with_tracker(resolver, IntakeTracker::new(targets))
    }

    pub fn with_tracker(resolver: ExtractionResolver<D, I>, tracker: IntakeTracker) -> Self {
        Self {
            resolver,
            tracker: Mutex::new(tracker),
        }
    }

    pub async fn extract(&self, request: &ExtractionRequest) -> (ExtractionOutcome, ApplyResult) {
        let ticket = self.tracker.lock().await.begin_extraction();
        tracing::debug!(generation = ticket.generation(), "Extraction started");

        // 解析期間不持有鎖
        let outcome = self.resolver.resolve(request).await;

        let applied = self
            .tracker
            .lock()
            .await
            .complete_extraction(ticket, &outcome);

        match (&outcome, applied) {
            (_, ApplyResult::Superseded) => {
                tracing::info!("⏭️ Extraction result superseded by a newer request")
            }
            (ExtractionOutcome::Success { source, .. }, _) => {
                tracing::info!("✅ Nutrition data extracted via {}", source)
            }
            (ExtractionOutcome::Failure { error, .. }, _) => {
                tracing::warn!("❌ Extraction failed: {}", error)
            }
        }

        (outcome, applied)
    }

    /// Logs the most recent successful extraction.
    pub async fn log_extracted(&self, name: Option<&str>, servings: f64) -> Result<FoodEntry> {
        let mut tracker = self.tracker.lock().await;
        tracker.roll_over(Utc::now().date_naive());
        let info = tracker.last_extraction().clone();

        let record = info.extracted.ok_or_else(|| NutriError::ValidationError {
            message: "No extracted nutrition data to log".to_string(),
        })?;

        let name = name
            .map(str::to_string)
            .or(info.product_name)
            .unwrap_or_else(|| DEFAULT_FOOD_NAME.to_string());

        tracker.log_food(name, record, servings).cloned()
    }

    pub async fn log_manual(
        &self,
        name: &str,
        record: NutritionRecord,
        servings: f64,
    ) -> Result<FoodEntry> {
        let mut tracker = self.tracker.lock().await;
        tracker.roll_over(Utc::now().date_naive());
        tracker.log_food(name, record, servings).cloned()
    }

    pub async fn set_target(&self, nutrient: Nutrient, value: f64) -> Result<f64> {
        self.tracker.lock().await.set_target(nutrient, value)
    }

    pub async fn summary(&self) -> Vec<NutrientProgress> {
        self.tracker.lock().await.summary()
    }

    /// Snapshot of the tracker for display.
    pub async fn tracker(&self) -> IntakeTracker {
        self.tracker.lock().await.clone()
    }
}
