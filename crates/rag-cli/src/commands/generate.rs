use anyhow::Result;
use rag_embed::{CompletionGenerator, RemoteGenerator};
use rag_pipeline::prompt::{llama3_prompt, DEFAULT_INSTRUCTION};
use rag_pipeline::spawn_generation;
use rag_types::{GenerateError, GenerationParams, TextGenerator};
use std::io::Write;
use std::sync::Arc;

/// Ask a running `/generate` server one question.
pub async fn run(question: &str, instruction: Option<&str>, url: Option<String>) -> Result<()> {
    let client = match url {
        Some(url) => RemoteGenerator::new(url),
        None => RemoteGenerator::from_env(),
    };
    let prompt = llama3_prompt(instruction.unwrap_or(DEFAULT_INSTRUCTION), question);
    tracing::debug!(url = client.url(), "posting prompt");

    match client.generate(&prompt, &GenerationParams::client()).await {
        Ok(response) => println!("{}", response),
        Err(GenerateError::Api { status, body }) => {
            println!("Error: {}", status);
            println!("{}", body);
        }
        Err(GenerateError::Parse(msg)) => println!("{}", msg),
        Err(e) => println!("Request failed: {}", e),
    }
    Ok(())
}

/// Stream a completion, redrawing the accumulated text on one line.
pub async fn stream(prompt: &str, max_new_tokens: u32, temperature: f64) -> Result<()> {
    let generator: Arc<dyn TextGenerator> = Arc::new(CompletionGenerator::from_env());
    let params = GenerationParams {
        max_new_tokens,
        temperature,
        ..GenerationParams::streaming()
    };
    let mut stream = spawn_generation(generator, prompt, params);

    println!("Generating response...");
    let mut text = String::new();
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next_chunk().await? {
        text.push_str(&chunk);
        print!("\r{}", text);
        stdout.flush()?;
    }
    println!("\nDone!");
    Ok(())
}
