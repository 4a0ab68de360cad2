//! Uploads a local file and asks a model to describe it.
//!
//! Usage: `cargo run --example describe_file -- <path> [prompt] [model]`
use display_error_chain::DisplayErrorChain;
use gemini_file_chat::{
    BinaryFile, FailurePolicy, Gemini, ItemParameters, OutputMode, RunSettings, Workflow,
    WorkflowItem,
};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

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
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: describe_file <path> [prompt] [model]")?;
    let prompt = args.next().unwrap_or_else(|| "Describe this file".to_string());
    let model = args.next().unwrap_or_else(|| "gemini-2.5-flash".to_string());

    let mut file = BinaryFile::new(std::fs::read(&path)?);
    if let Some(name) = Path::new(&path).file_name().and_then(|name| name.to_str()) {
        file = file.with_file_name(name);
    }

    let workflow = Workflow::new(
        Gemini::new(api_key)?,
        RunSettings::default()
            .with_output_mode(OutputMode::Full)
            .with_failure_policy(FailurePolicy::FailFast),
    );

    info!(path = %path, model = %model, "processing file");
    let output = workflow
        .run(vec![WorkflowItem::new(file, ItemParameters::new(prompt, model))])
        .await?;

    for item in output {
        println!("{}", serde_json::to_string_pretty(&item.json)?);
    }
    Ok(())
}
