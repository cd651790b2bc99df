//! OpenAI-compatible model clients: embeddings, chat, text completion, and the
//! `/generate` inference server, plus LLM-based triple extraction.

mod completion;
mod llm;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod openai;
mod remote;
pub mod sse;
mod triples;

pub use completion::CompletionGenerator;
pub use llm::{ChatClient, ChatMessage, ChatOptions, OpenAiChatClient};
pub use openai::OpenAiEmbedder;
pub use rag_types::{Embedder, EmbedderError, GenerateError, TextGenerator};
pub use remote::RemoteGenerator;
pub use triples::{LlmTripleExtractor, TripleExtractor};

#[cfg(any(test, feature = "test-util"))]
pub use mock::{EchoGenerator, MockChatClient, MockEmbedder, StaticTripleExtractor};
