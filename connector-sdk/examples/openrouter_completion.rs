//! OpenRouter Completion Example
//!
//! Sends one prompt through the `CompletionProvider` interface.
//!
//! To run this example:
//! ```
//! REFINERY_LLM_API_KEY=your_api_key cargo run -p connector-sdk --example openrouter_completion
//! ```

use std::time::Duration;

use connector_sdk::{
    config::{EnvConfigProvider, LlmConfig},
    openrouter::OpenRouterClient,
    CompletionProvider, CompletionRequest, Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    println!("OpenRouter Completion Example");

    let config_provider = EnvConfigProvider::new().with_prefix("REFINERY");
    let config = match LlmConfig::from_provider(&config_provider) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Please set REFINERY_LLM_API_KEY environment variable");
            std::process::exit(1);
        }
    };

    let client = OpenRouterClient::new_with_config(config)?;
    println!("Sending request to {}...", client.model());

    let request = CompletionRequest::new(
        "Rewrite as a user story: users can sign up with their Google account.",
    )
    .max_tokens(300)
    .temperature(0.3)
    .timeout(Duration::from_secs(60));

    let answer = client.complete(request).await?;
    println!("\n{}", answer);

    Ok(())
}
