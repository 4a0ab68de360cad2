//! Lists the models that can generate content with the configured API key.
use display_error_chain::DisplayErrorChain;
use futures::TryStreamExt;
use gemini_file_chat::Gemini;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match do_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error_chain = DisplayErrorChain::new(e.as_ref());
            tracing::error!(error.debug = ?e, error.chained = %error_chain, "execution failed");
            ExitCode::FAILURE
        }
    }
}

async fn do_main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("GEMINI_API_KEY")?;
    let gemini = Gemini::new(api_key)?;

    let models: Vec<_> = gemini.list_models(50).try_collect().await?;
    for model in models.iter().filter(|model| model.supports_generate_content()) {
        println!("{:<40} {}", model.id(), model.label());
    }
    Ok(())
}
