use runpod_chat::types::MessageRole;
use runpod_chat::{Client, Config, ConversationSession};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv_override().ok();
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::rfc_3339())
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let client = Arc::new(Client::new(config)?);
    let builder = ConversationSession::for_client(client.clone());
    #[cfg(feature = "device")]
    let builder = builder
        .with_sink(Arc::new(runpod_chat::CpalSink::default()))
        .with_capture(Box::new(runpod_chat::CpalCapture::default()));
    let session = builder.build();
    session.open();

    let mut shown = 0;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        for message in &session.messages()[shown..] {
            let who = match message.role() {
                MessageRole::User => "you",
                MessageRole::Assistant => "assistant",
                MessageRole::System => "system",
                MessageRole::Error => "error",
            };
            println!("[{who}] {}", message.text());
        }
        shown = session.messages().len();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let result = match line.trim() {
            "/quit" => break,
            "/rec" => session.start_recording(),
            "/stop" => session.stop_recording().await,
            text => session.submit_user_text(text).await,
        };
        if let Err(e) = result {
            println!("! {e}");
        }
    }

    session.close();
    let stats = client.stats();
    tracing::info!(
        "submitted {} job(s), {} status check(s), {} transient failure(s)",
        stats.jobs_submitted(),
        stats.status_checks(),
        stats.transient_failures()
    );
    Ok(())
}
