mod config;
mod error;
mod quiz;
mod routes;

use std::sync::Arc;

use dotenv::dotenv;
use quiz::{ai_helper::ChatGptCompleter, generator::QuestionGenerator, QuestionBank};

type MainResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> MainResult {
    // A missing .env is fine, the variables may come from the environment.
    let _ = dotenv();

    pretty_env_logger::init();
    log::info!("Starting cognitive test server...");

    if let Err(e) = run().await {
        log::error!("{e}");
        return Err(e);
    }
    Ok(())
}

async fn run() -> MainResult {
    let config = config::Config::from_env()?;

    log::info!("Loading the question bank from {}", config.question_bank.display());
    let bank = QuestionBank::load(&config.question_bank)?;
    if bank.is_empty() {
        log::warn!("The question bank is empty, /get_question will reject every index");
    } else {
        log::info!("{} questions loaded", bank.len());
    }

    // chatgpt_rs only takes a 'static model name; this runs once per process.
    let model: &'static str = Box::leak(config.model.clone().into_boxed_str());
    let completer = Arc::new(ChatGptCompleter::new(
        &config.api_key,
        config.api_url.clone(),
        model,
        config.timeout,
    )?);
    log::info!("Using model {model} at {}", config.api_url);

    let generator = QuestionGenerator::new(completer.clone(), config.pipeline.clone());
    let state = routes::AppState::new(bank, completer, generator, config.total_questions);
    let app = routes::create_router(state, &config.allowed_origins, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
