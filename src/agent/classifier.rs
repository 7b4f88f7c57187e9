//! Irrigation topic classifier
//!
//! A cheap zero-temperature completion decides whether a question is about
//! irrigation before any quota is spent on it.

use crate::inference::{ChatModel, CompletionRequest};
use crate::types::message::Message;

const CLASSIFIER_PROMPT: &str = "Kullanıcının mesajını sınıflandır. Eğer mesaj bahçe, tarla, sera veya peyzaj SULAMA sistemleri, sulama ürünleri, sulama projeleri, debi-basınç hesabı, otomatik sulama cihazları gibi konularla ilgiliyse sadece 'IRRIGATION' yaz. Diğer tüm konular (yazılım, JSON, kod, bilgisayar, internet, sağlık, ilişkiler, tarih, finans, oyun, eğitim vb.) için sadece 'NON_IRRIGATION' yaz. Başka hiçbir şey yazma.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Irrigation,
    NonIrrigation,
}

/// Map the classifier's raw reply to a category
///
/// Anything that is not clearly a "NON" answer counts as irrigation.
pub fn interpret_label(raw: &str) -> Category {
    let label = raw.trim().to_uppercase();
    match label.as_str() {
        "IRRIGATION" => Category::Irrigation,
        "NON_IRRIGATION" => Category::NonIrrigation,
        other if other.contains("NON") => Category::NonIrrigation,
        _ => Category::Irrigation,
    }
}

/// Classify a user message; model failures fall back to [`Category::Irrigation`]
pub async fn classify(model: &dyn ChatModel, model_name: &str, message: &str) -> Category {
    let request = CompletionRequest::new(
        model_name,
        vec![Message::system(CLASSIFIER_PROMPT), Message::user(message)],
    )
    .with_temperature(0.0);

    match model.complete(request).await {
        Ok(reply) => {
            let category = interpret_label(&reply);
            tracing::debug!("Classifier replied {:?} -> {:?}", reply.trim(), category);
            category
        }
        Err(e) => {
            tracing::error!("Classification failed, assuming irrigation: {}", e);
            Category::Irrigation
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{DeltaStream, InferenceError};
    use async_trait::async_trait;

    #[test]
    fn test_interpret_label() {
        assert_eq!(interpret_label("IRRIGATION"), Category::Irrigation);
        assert_eq!(interpret_label("  non_irrigation\n"), Category::NonIrrigation);
        assert_eq!(interpret_label("Bu NON_IRRIGATION."), Category::NonIrrigation);
        assert_eq!(interpret_label("irrigation."), Category::Irrigation);
        assert_eq!(interpret_label(""), Category::Irrigation);
    }

    struct Fixed(Result<&'static str, ()>);

    #[async_trait]
    impl ChatModel for Fixed {
        async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError> {
            assert_eq!(request.temperature, Some(0.0));
            assert_eq!(request.messages.len(), 2);
            self.0
                .map(str::to_string)
                .map_err(|_| InferenceError::EmptyResponse)
        }

        async fn stream(&self, _request: CompletionRequest) -> Result<DeltaStream, InferenceError> {
            Err(InferenceError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn test_classify_uses_model_reply() {
        let model = Fixed(Ok("NON_IRRIGATION"));
        assert_eq!(
            classify(&model, "gpt-4.1-mini", "JSON nasıl parse edilir?").await,
            Category::NonIrrigation
        );
    }

    #[tokio::test]
    async fn test_classify_falls_back_on_error() {
        let model = Fixed(Err(()));
        assert_eq!(classify(&model, "m", "anything").await, Category::Irrigation);
    }
}
