pub mod chat_orchestrator;
pub mod config;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod repos;
pub mod study_plan;
