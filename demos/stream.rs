//! Stream a reply and print it as it arrives.
//!
//! ```sh
//! GOOGLE_CLOUD_PROJECT=my-project cargo run --example stream -- "Why is the sky blue?"
//! ```

use futures_util::StreamExt;
use std::io::Write;
use tracing_subscriber::EnvFilter;
use vertexai::{GenerationConfig, ModelParams, VertexAI, VertexConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Write a haiku about the ocean.".to_string());

    let vertex = VertexAI::new(VertexConfig::from_env()?).await?;
    let model = vertex.get_generative_model(
        ModelParams::new("gemini-1.0-pro")
            .generation_config(GenerationConfig::default().max_output_tokens(512)),
    );

    let result = model.generate_content_stream(prompt.as_str()).await?;
    let mut stream = result.stream;
    while let Some(chunk) = stream.next().await {
        if let Some(text) = chunk?.text() {
            print!("{text}");
            std::io::stdout().flush()?;
        }
    }
    println!();

    let response = result.response.await?;
    if let Some(usage) = response.usage_metadata {
        println!(
            "tokens: prompt={} candidates={} total={}",
            usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
        );
    }

    Ok(())
}
