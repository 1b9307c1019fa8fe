use crate::domain::model::{
    ExtractionError, ExtractionOutcome, ExtractionRequest, ExtractionSource, InterpretedLabel,
    ProductLookup, ResolvedNutrition,
};
use crate::domain::ports::{LabelInterpreter, ProductDatabase};
use crate::utils::error::{NutriError, Result};
use crate::utils::validation::validate_barcode;

/// Chooses between the product database and the photo interpreter for one request.
///
/// Barcode first: a database hit wins outright. A miss falls back to the photo
/// when there is one and is reported as `BarcodeNotFound` when there is not.
/// A barcode the interpreter reads off the photo is looked up once more, and
/// a hit on that lookup is credited to the database.
pub struct ExtractionResolver<D: ProductDatabase, I: LabelInterpreter> {
    database: D,
    interpreter: I,
}

impl<D: ProductDatabase, I: LabelInterpreter> ExtractionResolver<D, I> {
    pub fn new(database: D, interpreter: I) -> Self {
        Self {
            database,
            interpreter,
        }
    }

    pub async fn resolve(&self, request: &ExtractionRequest) -> ExtractionOutcome {
        let barcode = request.barcode();

        let photo_url = match (barcode, request.photo_url()) {
            (None, None) => {
                tracing::warn!("Extraction requested without photo or barcode");
                return ExtractionOutcome::Failure {
                    error: ExtractionError::no_input(),
                    attempted_source: None,
                    barcode: None,
                };
            }
            (Some(code), photo_url) => {
                tracing::debug!(barcode = code, "Trying product database first");
                if let Some(product) = self.lookup(code).await {
                    return database_success(product, code);
                }

                match photo_url {
                    Some(photo_url) => {
                        tracing::info!(
                            barcode = code,
                            "Barcode lookup missed, falling back to photo"
                        );
                        photo_url
                    }
                    None => {
                        return ExtractionOutcome::Failure {
                            error: ExtractionError::barcode_not_found(),
                            attempted_source: Some(ExtractionSource::ProductDatabase),
                            barcode: Some(code.to_string()),
                        };
                    }
                }
            }
            (None, Some(photo_url)) => photo_url,
        };

        self.resolve_photo(photo_url, barcode).await
    }

    /// Same as [`resolve`](Self::resolve), shaped as a `Result` for callers that
    /// only care about the record or a displayable error.
    pub async fn resolve_record(&self, request: &ExtractionRequest) -> Result<ResolvedNutrition> {
        self.resolve(request).await.into_result()
    }

    async fn resolve_photo(
        &self,
        photo_url: &str,
        attempted_barcode: Option<&str>,
    ) -> ExtractionOutcome {
        tracing::debug!("Sending photo to label interpreter");

        let label = match self.interpreter.interpret(photo_url).await {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!("Label interpretation failed: {}", e);
                return ExtractionOutcome::Failure {
                    error: ExtractionError::image_extraction_failed(failure_message(e)),
                    attempted_source: Some(ExtractionSource::AiLabel),
                    barcode: attempted_barcode.map(str::to_string),
                };
            }
        };

        let InterpretedLabel { record, barcode } = label;

        let Some(embedded) = barcode.filter(|code| !code.trim().is_empty()) else {
            return ExtractionOutcome::Success {
                record,
                source: ExtractionSource::AiLabel,
                barcode: None,
                product_name: None,
            };
        };

        if attempted_barcode == Some(embedded.trim()) {
            tracing::debug!(
                barcode = embedded.as_str(),
                "Photo shows the barcode that already missed, skipping second lookup"
            );
        } else {
            tracing::info!(barcode = embedded.as_str(), "Photo contains a barcode, looking it up");
            if let Some(product) = self.lookup(&embedded).await {
                return database_success(product, embedded.trim());
            }
        }

        ExtractionOutcome::Success {
            record,
            source: ExtractionSource::AiBarcode,
            barcode: Some(embedded),
            product_name: None,
        }
    }

    /// Any lookup problem is a miss as far as the policy is concerned.
    async fn lookup(&self, barcode: &str) -> Option<ProductLookup> {
        let code = match validate_barcode(barcode) {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(barcode, "Skipping lookup: {}", e);
                return None;
            }
        };

        match self.database.lookup(code).await {
            Ok(product) => {
                tracing::debug!(barcode = code, "Product database hit");
                Some(product)
            }
            Err(e) => {
                tracing::warn!(barcode = code, "Product database miss: {}", e);
                None
            }
        }
    }
}

fn database_success(product: ProductLookup, barcode: &str) -> ExtractionOutcome {
    ExtractionOutcome::Success {
        record: product.record,
        source: ExtractionSource::ProductDatabase,
        barcode: Some(barcode.to_string()),
        product_name: product.product_name,
    }
}

fn failure_message(error: NutriError) -> String {
    match error {
        NutriError::ImageExtractionFailed { message } => message,
        other => other.to_string(),
    }
}
