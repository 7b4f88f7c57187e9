//! Shared state handed to every handler

use std::sync::Arc;

use crate::agent::{Assistant, AssistantConfig};
use crate::inference::ChatModel;
use crate::storage::tables::DataTables;
use crate::storage::users::UserStore;
use crate::types::config::ServerConfig;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub users: Arc<UserStore>,
    pub assistant: Arc<Assistant>,
}

impl AppState {
    /// Load the data tables and open the user database described by `config`
    pub fn new(config: ServerConfig, model: Arc<dyn ChatModel>) -> Self {
        let tables = Arc::new(DataTables::load(&config.data_dir));
        let users = Arc::new(UserStore::open(&config.users_file));
        let assistant_config = AssistantConfig {
            classifier_model: config.classifier_model.clone(),
            chat_model: config.chat_model.clone(),
            ..AssistantConfig::default()
        };
        let assistant = Assistant::new(model, tables, users.clone(), assistant_config);

        Self {
            config: Arc::new(config),
            users,
            assistant: Arc::new(assistant),
        }
    }
}
