pub mod gateway;
pub mod openai;
pub mod prompts;

pub use gateway::{
    ChatCompletionRequest, ChatCompletionResponse, ChatGateway, ChatGatewayError,
    ChatGatewayFuture, ChatMessage, GenerationParams, ModelListFuture,
};
pub use openai::{OpenAiChatGateway, OpenAiGatewayConfig, OpenAiGatewayError};
pub use prompts::{
    DEFAULT_SYSTEM_PROMPT, KNOWLEDGE_CONTEXT_LEAD_IN, STUDY_PLAN_SYSTEM_PROMPT,
    compose_system_prompt,
};
