mod chat;
mod configs;
mod plan;
mod service;

pub(crate) use chat::{chat, chat_history, list_sessions};
pub(crate) use configs::{
    create_config, delete_config, get_config, list_configs, set_default_config, update_config,
};
pub(crate) use plan::generate_study_plan;
pub(crate) use service::{list_models, test_connection};
