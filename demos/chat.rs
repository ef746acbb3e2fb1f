//! Interactive chat on stdin.
//!
//! ```sh
//! GOOGLE_CLOUD_PROJECT=my-project RUST_LOG=vertexai=debug cargo run --example chat
//! ```

use std::io::{BufRead, Write};
use tracing_subscriber::EnvFilter;
use vertexai::{Content, StartChatParams, VertexAI, VertexConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let vertex = VertexAI::new(VertexConfig::from_env()?).await?;
    let model = vertex.get_generative_model("gemini-1.0-pro");
    let chat = model.start_chat(StartChatParams::default().history(vec![
        Content::user("You are a concise assistant. Keep answers short."),
        Content::model("Understood."),
    ]));

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match chat.send_message(line).await {
            Ok(response) => println!("{}", response.text().unwrap_or_default()),
            Err(e) => eprintln!("error ({:?}): {e}", e.kind()),
        }
    }

    println!("{} turns in history", chat.history().len());
    Ok(())
}
