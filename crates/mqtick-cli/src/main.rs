use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use mqtick_core::{Handler, Message, MessageQueue, MqConfig, MqError, Tactic, Task, TaskType};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mqtick",
    version,
    about = "Timer-driven in-process message queue demo"
)]
struct Cli {
    /// TOML file with `[catch_all]` / `[[tactics]]`
    #[arg(short, long)]
    config: Option<String>,

    /// Number of `hello` messages to enqueue
    #[arg(short, long, default_value_t = 5)]
    messages: u32,

    /// How many `hello` invocations fail on purpose
    #[arg(long, default_value_t = 1)]
    fail_first: u32,

    /// Seconds to let the timers run before shutting down
    #[arg(long, default_value_t = 8)]
    run_secs: u64,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Hello {
    name: String,
}

impl Task for Hello {
    const TYPE: &'static str = "hello";
}

struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Handler<Hello> for HelloHandler {
    async fn handle(&self, task: Hello) -> Result<(), MqError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(MqError::handler(format!(
                "intentional failure (left={left})"
            )));
        }

        println!("Hello, {}!", task.name);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mqtick_core=debug,mqtick_cli=debug"
    } else {
        "mqtick_core=info,mqtick_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => MqConfig::load(path)?,
        None => MqConfig::default(),
    };

    let mq = MessageQueue::builder()
        .config(&config)?
        .register::<Hello, _>(HelloHandler::new(cli.fail_first))?
        .handler_fn("log", |m: Message| async move {
            info!(message_id = %m.id, body = %m.body_value(), "log handler");
            Ok::<(), MqError>(())
        })?
        .expect_types(&[Hello::TYPE])
        .build()?;

    // config に hello がなければ 1s 間隔で動かす
    if !mq.tactics().await.is_bound(&TaskType::new(Hello::TYPE)) {
        mq.configure_tactic(Hello::TYPE, Tactic::every_secs(1)?).await;
    }

    for i in 0..cli.messages {
        let id = mq
            .push(&Hello {
                name: format!("mqtick-{i}"),
            })
            .await?;
        info!(message_id = %id, "enqueued hello");
    }
    // catch-all で処理される
    let mut body = serde_json::Map::new();
    body.insert("note".into(), "handled by the catch-all timer".into());
    mq.enqueue("log", body).await?;

    mq.start().await;
    sleep(Duration::from_secs(cli.run_secs)).await;
    mq.shutdown().await;

    for task_type in [Hello::TYPE, "log"] {
        let counts = mq.counts(task_type).await?;
        println!(
            "{task_type}: init={} processing={} succeed={} failed={}",
            counts.init, counts.processing, counts.succeed, counts.failed
        );
    }
    Ok(())
}
