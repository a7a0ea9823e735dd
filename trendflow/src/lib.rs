// Library interface for trendflow modules
// This allows tests and the binary to import modules

pub mod llm;
pub mod news;
pub mod pipeline;
pub mod publish;
pub mod workflow;
