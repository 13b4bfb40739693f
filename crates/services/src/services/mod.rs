pub mod backup;
pub mod config;
pub mod fetch;
pub mod llm;
pub mod owner;
pub mod storage;
