//! Irrigation assistant
//!
//! Turns a user question into a model call: topic check, product matching,
//! prompt assembly, and afterwards the memory/project bookkeeping.

pub mod classifier;
pub mod prompts;

use std::sync::Arc;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde_json::Value;

use crate::catalog::{find_related_products, product_context};
use crate::inference::{ChatModel, CompletionRequest, DeltaStream, InferenceError};
use crate::storage::tables::DataTables;
use crate::storage::users::UserStore;
use crate::storage::StorageError;
use crate::types::json::{display_value, is_truthy};
use crate::types::message::Message;
use crate::types::user::{Project, User};

use classifier::{classify, Category};
use prompts::{build_messages, design_request_message, system_prompt, ChatMode};

/// Assistant configuration
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub classifier_model: String,
    pub chat_model: String,
    /// Matched products injected per question
    pub product_limit: usize,
    /// Memory entries replayed to the model
    pub history_window: usize,
    /// Memory entries kept per user
    pub memory_cap: usize,
    /// Characters of a design answer kept as the project summary
    pub summary_chars: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            classifier_model: crate::types::config::DEFAULT_CLASSIFIER_MODEL.to_string(),
            chat_model: crate::types::config::DEFAULT_CHAT_MODEL.to_string(),
            product_limit: 8,
            history_window: 20,
            memory_cap: 40,
            summary_chars: 400,
        }
    }
}

/// What to do with an incoming question
#[derive(Debug)]
pub enum ChatPlan {
    /// Not an irrigation question; reply with the fixed refusal
    OutOfScope,
    /// Ask the model; `user_message` is what gets stored in memory
    Answer {
        request: CompletionRequest,
        user_message: String,
    },
}

pub struct Assistant {
    model: Arc<dyn ChatModel>,
    tables: Arc<DataTables>,
    users: Arc<UserStore>,
    config: AssistantConfig,
}

impl Assistant {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tables: Arc<DataTables>,
        users: Arc<UserStore>,
        config: AssistantConfig,
    ) -> Self {
        tracing::info!(
            "Assistant ready (classifier: {}, chat: {})",
            config.classifier_model,
            config.chat_model
        );
        Self {
            model,
            tables,
            users,
            config,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Classify the question and, for irrigation topics, build the model request
    pub async fn prepare(
        &self,
        user: &User,
        message: &str,
        mode: ChatMode,
        design_data: Option<&Value>,
    ) -> ChatPlan {
        if classify(self.model.as_ref(), &self.config.classifier_model, message).await
            == Category::NonIrrigation
        {
            tracing::info!("Question classified as out of scope");
            return ChatPlan::OutOfScope;
        }

        // products are matched against the raw question, even in design mode
        let products = find_related_products(
            &self.tables.price_list,
            message,
            self.config.product_limit,
        );
        tracing::debug!("Matched {} products", products.len());
        let products = product_context(&products);

        let user_message = match mode {
            ChatMode::Design => design_request_message(design_data),
            ChatMode::Standard => message.to_string(),
        };

        let skip = user.memory.len().saturating_sub(self.config.history_window);
        let messages = build_messages(
            system_prompt(mode),
            self.tables.data_context(),
            &products,
            &user.memory[skip..],
            &user_message,
        );

        ChatPlan::Answer {
            request: CompletionRequest::new(&self.config.chat_model, messages),
            user_message,
        }
    }

    pub async fn open_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<DeltaStream, InferenceError> {
        self.model.stream(request).await
    }

    /// Store a finished exchange in the user's memory, plus a project in design mode
    pub fn record_exchange(
        &self,
        email: &str,
        user_message: &str,
        reply: &str,
        mode: ChatMode,
        design_data: Option<&Value>,
    ) -> Result<(), StorageError> {
        let cap = self.config.memory_cap;
        let project = (mode == ChatMode::Design)
            .then(|| design_project(reply, design_data, Local::now(), self.config.summary_chars));

        self.users.update(email, |user| {
            user.memory.push(Message::user(user_message));
            user.memory.push(Message::assistant(reply));
            if user.memory.len() > cap {
                let excess = user.memory.len() - cap;
                user.memory.drain(..excess);
            }
            if let Some(project) = project {
                tracing::info!("Saved design project {}", project.id);
                user.projects.push(project);
            }
        })
    }
}

/// Build the project saved for a design-mode answer
pub fn design_project(
    reply: &str,
    design_data: Option<&Value>,
    now: DateTime<Local>,
    summary_chars: usize,
) -> Project {
    let title = design_data
        .and_then(|d| d.get("title"))
        .filter(|t| is_truthy(t))
        .map(display_value)
        .unwrap_or_else(|| format!("Özel Tasarım - {}", now.format("%d.%m.%Y %H:%M:%S")));

    Project {
        id: now.timestamp_millis().to_string(),
        title,
        kind: "design".to_string(),
        created_at: now
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        summary: reply.chars().take(summary_chars).collect(),
        content: reply.to_string(),
        raw_design_data: design_data
            .filter(|d| is_truthy(d))
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
    }
}
