use crate::domain::model::{InterpretedLabel, ProductLookup};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Barcode-keyed product lookup.
///
/// Both "product does not exist" and transport problems come back as `Err`;
/// callers are not expected to tell them apart.
#[async_trait]
pub trait ProductDatabase: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<ProductLookup>;
}

/// Reads nutrition facts (and any visible barcode) from a photo.
#[async_trait]
pub trait LabelInterpreter: Send + Sync {
    async fn interpret(&self, photo_url: &str) -> Result<InterpretedLabel>;
}

#[async_trait]
impl<T: ProductDatabase + ?Sized> ProductDatabase for Arc<T> {
    async fn lookup(&self, barcode: &str) -> Result<ProductLookup> {
        (**self).lookup(barcode).await
    }
}

#[async_trait]
impl<T: LabelInterpreter + ?Sized> LabelInterpreter for Arc<T> {
    async fn interpret(&self, photo_url: &str) -> Result<InterpretedLabel> {
        (**self).interpret(photo_url).await
    }
}

pub trait ConfigProvider: Send + Sync {
    fn database_url(&self) -> &str;
    fn interpreter_endpoint(&self) -> &str;
    fn interpreter_model(&self) -> &str;
    fn interpreter_api_key(&self) -> Option<&str>;
    fn request_timeout(&self) -> Duration;
    fn user_agent(&self) -> &str;
    fn daily_targets(&self) -> crate::core::tracker::DailyTargets;
}
