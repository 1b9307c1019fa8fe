use crate::domain::model::{
    ExtractionOutcome, ExtractionSource, Nutrient, NutritionRecord,
};
use crate::utils::error::{NutriError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound and increment for each adjustable target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetLimits {
    pub max: f64,
    pub step: f64,
}

pub fn target_limits(nutrient: Nutrient) -> TargetLimits {
    match nutrient {
        Nutrient::Calories => TargetLimits {
            max: 3000.0,
            step: 100.0,
        },
        Nutrient::Protein => TargetLimits {
            max: 200.0,
            step: 5.0,
        },
        Nutrient::Fat => TargetLimits {
            max: 150.0,
            step: 5.0,
        },
        Nutrient::Carbohydrates => TargetLimits {
            max: 400.0,
            step: 10.0,
        },
        Nutrient::Sugar => TargetLimits {
            max: 100.0,
            step: 5.0,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyTargets {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
}

impl Default for DailyTargets {
    fn default() -> Self {
        Self {
            calories: 2000.0,
            protein: 50.0,
            fat: 70.0,
            carbohydrates: 250.0,
            sugar: 50.0,
        }
    }
}

impl DailyTargets {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Carbohydrates => self.carbohydrates,
            Nutrient::Sugar => self.sugar,
        }
    }

    fn slot(&mut self, nutrient: Nutrient) -> &mut f64 {
        match nutrient {
            Nutrient::Calories => &mut self.calories,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Carbohydrates => &mut self.carbohydrates,
            Nutrient::Sugar => &mut self.sugar,
        }
    }
}

/// Percentage of `target` reached by `intake`, capped at 100.
pub fn calculate_progress(intake: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (intake / target * 100.0).min(100.0)
}

/// Clamps to `[0, max]` and snaps to the nearest step.
pub fn snap_target(nutrient: Nutrient, value: f64) -> f64 {
    let limits = target_limits(nutrient);
    let snapped = (value / limits.step).round() * limits.step;
    snapped.clamp(0.0, limits.max)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub name: String,
    pub record: NutritionRecord,
    pub servings: f64,
    pub logged_at: DateTime<Utc>,
}

/// Handed out per extraction; only the newest one may update the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionTicket {
    generation: u64,
}

impl ExtractionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    Superseded,
}

/// What the last extraction produced, for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionDebugInfo {
    pub image_type: Option<String>,
    pub barcode: Option<String>,
    pub api_source: Option<String>,
    pub api_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub extracted: Option<NutritionRecord>,
    pub product_name: Option<String>,
}

impl ExtractionDebugInfo {
    fn from_outcome(outcome: &ExtractionOutcome) -> Self {
        match outcome {
            ExtractionOutcome::Success {
                record,
                source,
                barcode,
                product_name,
            } => Self {
                image_type: Some(source.image_type().to_string()),
                barcode: barcode.clone(),
                api_source: Some(source.label().to_string()),
                api_response: serde_json::to_value(record).ok(),
                error_message: None,
                extracted: Some(*record),
                product_name: product_name.clone(),
            },
            ExtractionOutcome::Failure {
                error,
                attempted_source,
                barcode,
            } => Self {
                image_type: attempted_source.map(|s| s.image_type().to_string()),
                barcode: barcode.clone(),
                api_source: attempted_source.map(|s| s.label().to_string()),
                api_response: Some(serde_json::json!({ "error": error.message })),
                error_message: Some(failure_display(*attempted_source)),
                extracted: None,
                product_name: None,
            },
        }
    }
}

fn failure_display(source: Option<ExtractionSource>) -> String {
    match source {
        Some(ExtractionSource::ProductDatabase) => {
            "Barcode not found in Open Food Facts database.".to_string()
        }
        Some(ExtractionSource::AiBarcode) => {
            "Failed to extract nutrition data from the barcode. Please try again or enter manually."
                .to_string()
        }
        Some(ExtractionSource::AiLabel) => {
            "Failed to extract nutrition data from the image. Please try again or enter manually."
                .to_string()
        }
        None => "Please provide a food label photo or a barcode.".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientProgress {
    pub nutrient: Nutrient,
    pub target: f64,
    pub intake: f64,
    pub progress: f64,
}

/// In-memory daily targets and running intake totals.
#[derive(Debug, Clone)]
pub struct IntakeTracker {
    targets: DailyTargets,
    intake: NutritionRecord,
    entries: Vec<FoodEntry>,
    day: NaiveDate,
    generation: u64,
    last_extraction: ExtractionDebugInfo,
}

impl IntakeTracker {
    pub fn new(targets: DailyTargets) -> Self {
        Self::for_day(targets, Utc::now().date_naive())
    }

    pub fn for_day(targets: DailyTargets, day: NaiveDate) -> Self {
        Self {
            targets,
            intake: NutritionRecord::default(),
            entries: Vec::new(),
            day,
            generation: 0,
            last_extraction: ExtractionDebugInfo::default(),
        }
    }

    pub fn targets(&self) -> &DailyTargets {
        &self.targets
    }

    pub fn intake(&self) -> &NutritionRecord {
        &self.intake
    }

    pub fn entries(&self) -> &[FoodEntry] {
        &self.entries
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn last_extraction(&self) -> &ExtractionDebugInfo {
        &self.last_extraction
    }

    /// Sets a target the way the slider would, returning the stored value.
    pub fn set_target(&mut self, nutrient: Nutrient, value: f64) -> Result<f64> {
        if !value.is_finite() || value < 0.0 {
            return Err(NutriError::ValidationError {
                message: format!(
                    "{} target must be a non-negative number, got {}",
                    nutrient.display_name(),
                    value
                ),
            });
        }

        let snapped = snap_target(nutrient, value);
        *self.targets.slot(nutrient) = snapped;
        tracing::debug!(?nutrient, snapped, "Target updated");
        Ok(snapped)
    }

    /// Adds `record × servings` to today's totals.
    pub fn log_food(
        &mut self,
        name: impl Into<String>,
        record: NutritionRecord,
        servings: f64,
    ) -> Result<&FoodEntry> {
        if !servings.is_finite() || servings <= 0.0 {
            return Err(NutriError::ValidationError {
                message: format!("Serving size must be greater than 0, got {}", servings),
            });
        }

        let name = name.into();
        let consumed = record.scaled(servings);
        self.intake = self.intake.plus(&consumed);

        tracing::info!(
            "🍽️ Logged {} x{} ({:.0} kcal)",
            name,
            servings,
            consumed.calories()
        );

        self.entries.push(FoodEntry {
            name,
            record,
            servings,
            logged_at: Utc::now(),
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn progress(&self, nutrient: Nutrient) -> f64 {
        calculate_progress(self.intake.get(nutrient), self.targets.get(nutrient))
    }

    pub fn summary(&self) -> Vec<NutrientProgress> {
        Nutrient::ALL
            .iter()
            .map(|&nutrient| NutrientProgress {
                nutrient,
                target: self.targets.get(nutrient),
                intake: self.intake.get(nutrient),
                progress: self.progress(nutrient),
            })
            .collect()
    }

    pub fn reset_intake(&mut self) {
        self.intake = NutritionRecord::default();
        self.entries.clear();
    }

    /// Starts a new day's totals when `today` differs from the tracked day.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if today == self.day {
            return false;
        }
        tracing::info!("📅 New day {}, resetting intake", today);
        self.day = today;
        self.reset_intake();
        true
    }

    /// Invalidates every ticket handed out before this one.
    pub fn begin_extraction(&mut self) -> ExtractionTicket {
        self.generation += 1;
        self.last_extraction = ExtractionDebugInfo::default();
        ExtractionTicket {
            generation: self.generation,
        }
    }

    /// Records an extraction outcome unless a newer extraction has started.
    ///
    /// Intake is never changed here; a successful record still has to be
    /// logged with a serving size.
    pub fn complete_extraction(
        &mut self,
        ticket: ExtractionTicket,
        outcome: &ExtractionOutcome,
    ) -> ApplyResult {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "Dropping superseded extraction result"
            );
            return ApplyResult::Superseded;
        }

        self.last_extraction = ExtractionDebugInfo::from_outcome(outcome);
        ApplyResult::Applied
    }
}

impl Default for IntakeTracker {
    fn default() -> Self {
        Self::new(DailyTargets::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ExtractionError;
    use tokio_test::{assert_err, assert_ok};

    fn sample_record() -> NutritionRecord {
        NutritionRecord::new(150.0, 10.0, 5.0, 20.0, 5.0)
    }

    fn tracker() -> IntakeTracker {
        IntakeTracker::for_day(
            DailyTargets::default(),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        )
    }

    #[test]
    fn test_calculate_progress() {
        assert_eq!(calculate_progress(500.0, 2000.0), 25.0);
        assert_eq!(calculate_progress(2500.0, 2000.0), 100.0);
        assert_eq!(calculate_progress(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_default_targets() {
        let targets = DailyTargets::default();
        assert_eq!(targets.calories, 2000.0);
        assert_eq!(targets.protein, 50.0);
        assert_eq!(targets.fat, 70.0);
        assert_eq!(targets.carbohydrates, 250.0);
        assert_eq!(targets.sugar, 50.0);
    }

    #[test]
    fn test_log_food_multiplies_by_servings() {
        let mut tracker = tracker();
        assert_ok!(tracker.log_food("Granola", sample_record(), 2.0));

        assert_eq!(tracker.intake().calories(), 300.0);
        assert_eq!(tracker.intake().protein(), 20.0);
        assert_eq!(tracker.intake().carbohydrates(), 40.0);
        assert_eq!(tracker.progress(Nutrient::Calories), 15.0);
        assert_eq!(tracker.entries().len(), 1);
    }

    #[test]
    fn test_log_food_rejects_bad_servings() {
        let mut tracker = tracker();
        assert_err!(tracker.log_food("Granola", sample_record(), 0.0));
        assert_err!(tracker.log_food("Granola", sample_record(), f64::NAN));
        assert_eq!(tracker.intake(), &NutritionRecord::default());
    }

    #[test]
    fn test_set_target_snaps_and_clamps() {
        let mut tracker = tracker();
        assert_eq!(tracker.set_target(Nutrient::Calories, 2149.0).unwrap(), 2100.0);
        assert_eq!(tracker.set_target(Nutrient::Protein, 500.0).unwrap(), 200.0);
        assert_eq!(tracker.set_target(Nutrient::Carbohydrates, 254.0).unwrap(), 250.0);
        assert_err!(tracker.set_target(Nutrient::Sugar, -1.0));
        assert_eq!(tracker.targets().calories, 2100.0);
    }

    #[test]
    fn test_summary_covers_all_nutrients() {
        let mut tracker = tracker();
        tracker.log_food("Bar", sample_record(), 1.0).unwrap();

        let summary = tracker.summary();
        assert_eq!(summary.len(), 5);
        assert_eq!(summary[4].nutrient, Nutrient::Sugar);
        assert_eq!(summary[4].progress, 10.0);
    }

    #[test]
    fn test_roll_over_resets_intake_only() {
        let mut tracker = tracker();
        tracker.set_target(Nutrient::Fat, 90.0).unwrap();
        tracker.log_food("Bar", sample_record(), 1.0).unwrap();

        assert!(!tracker.roll_over(tracker.day()));
        assert!(tracker.roll_over(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()));
        assert_eq!(tracker.intake(), &NutritionRecord::default());
        assert!(tracker.entries().is_empty());
        assert_eq!(tracker.targets().fat, 90.0);
    }

    #[test]
    fn test_superseded_extraction_is_dropped() {
        let mut tracker = tracker();
        let first = tracker.begin_extraction();
        let second = tracker.begin_extraction();

        let newer = ExtractionOutcome::Success {
            record: sample_record(),
            source: ExtractionSource::AiLabel,
            barcode: None,
            product_name: None,
        };
        let older = ExtractionOutcome::Failure {
            error: ExtractionError::barcode_not_found(),
            attempted_source: Some(ExtractionSource::ProductDatabase),
            barcode: Some("000".to_string()),
        };

        assert_eq!(tracker.complete_extraction(second, &newer), ApplyResult::Applied);
        assert_eq!(
            tracker.complete_extraction(first, &older),
            ApplyResult::Superseded
        );

        let info = tracker.last_extraction();
        assert_eq!(info.api_source.as_deref(), Some("AI Label Scanning"));
        assert_eq!(info.image_type.as_deref(), Some("label"));
        assert_eq!(info.extracted, Some(sample_record()));
        assert!(info.error_message.is_none());
    }

    #[test]
    fn test_failed_extraction_leaves_intake_untouched() {
        let mut tracker = tracker();
        tracker.log_food("Manual", sample_record(), 1.0).unwrap();

        let ticket = tracker.begin_extraction();
        let outcome = ExtractionOutcome::Failure {
            error: ExtractionError::barcode_not_found(),
            attempted_source: Some(ExtractionSource::ProductDatabase),
            barcode: Some("000".to_string()),
        };
        tracker.complete_extraction(ticket, &outcome);

        assert_eq!(tracker.intake().calories(), 150.0);
        let info = tracker.last_extraction();
        assert_eq!(
            info.error_message.as_deref(),
            Some("Barcode not found in Open Food Facts database.")
        );
        assert_eq!(
            info.api_response,
            Some(serde_json::json!({"error": "barcode not found"}))
        );
        assert_eq!(info.barcode.as_deref(), Some("000"));
    }
}
