//! Non-streaming agent example
//!
//! Runs an agent to completion and prints the collected result.

use anyhow::Result;
use clap::Parser;

use glyx_core::ExecuteOptions;
use glyx_examples::{init_tracing, Invocation};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let invocation = Invocation::parse();
    let task = invocation.task();
    let agent = invocation.load_agent()?;

    println!("Command: {}", agent.build_command(&task)?.join(" "));

    let options = ExecuteOptions::new().with_timeout(invocation.timeout);
    let result = agent.execute(&task, options).await?;

    println!("\n=== Result ===");
    println!("Success: {}", result.success());
    println!("Exit code: {}", result.exit_code);
    println!("Timed out: {}", result.timed_out);
    println!("Execution time: {:.2}s", result.execution_time);
    println!("\n=== Output ===");
    println!("{}", result.output());

    Ok(())
}
