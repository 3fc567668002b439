use std::io::Write;

use cn_core::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::context::AppContext;
use crate::display::{format_duration, format_report, format_stats};

const MENU: &str = "\nOptions:\n\
1. Start background news fetching\n\
2. Manual news fetch\n\
3. Query crypto news\n\
4. Show database stats\n\
5. Quit";

const QUIT_WORDS: &[&str] = &["quit", "exit", "q"];

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

async fn next_line<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> Result<Option<String>> {
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

/// Interactive menu over `input`. Returns on option 5 or end of input,
/// after stopping any background fetcher it started.
pub async fn run_shell<R: AsyncBufRead + Unpin>(ctx: &mut AppContext, input: R) -> Result<()> {
    let mut lines = input.lines();
    println!("🚀 Crypto News Deep Research System");
    println!("{}", "=".repeat(40));

    let result = menu_loop(ctx, &mut lines).await;
    ctx.shutdown().await;
    result
}

async fn menu_loop<R: AsyncBufRead + Unpin>(ctx: &mut AppContext, lines: &mut Lines<R>) -> Result<()> {
    loop {
        println!("{}", MENU);
        prompt("\nSelect option (1-5): ");
        let Some(choice) = next_line(lines).await? else {
            return Ok(());
        };

        match choice.as_str() {
            "1" => {
                if ctx.start_scheduler() {
                    println!(
                        "✅ Background news fetching started (every {})",
                        format_duration(ctx.config.fetch_interval)
                    );
                } else {
                    println!("ℹ️  Background fetching is already running");
                }
            }
            "2" => {
                println!("🔄 Starting manual news fetch...");
                let report = ctx.pipeline.run_cycle().await;
                println!("✅ Manual fetch completed: {}", format_report(&report));
            }
            "3" => {
                if !query_loop(ctx, lines).await? {
                    return Ok(());
                }
            }
            "4" => match ctx.storage.stats().await {
                Ok(stats) => print!("{}", format_stats(&stats)),
                Err(e) => println!("❌ Failed to load stats: {}", e),
            },
            "5" => {
                println!("👋 Goodbye!");
                return Ok(());
            }
            _ => println!("❌ Invalid option, please try again"),
        }
    }
}

/// Returns false when input ended inside the loop.
async fn query_loop<R: AsyncBufRead + Unpin>(ctx: &AppContext, lines: &mut Lines<R>) -> Result<bool> {
    loop {
        prompt("\n💬 Ask me about crypto news (or 'quit' to exit): ");
        let Some(question) = next_line(lines).await? else {
            return Ok(false);
        };

        if QUIT_WORDS.contains(&question.to_lowercase().as_str()) {
            return Ok(true);
        }
        if question.is_empty() {
            continue;
        }

        println!("🤔 Analyzing news to answer your question...");
        let answer = ctx.query_engine.answer(&question).await;
        println!("\n📰 Answer:\n{}\n", answer);
    }
}
