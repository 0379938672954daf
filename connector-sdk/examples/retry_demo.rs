//! Retry Executor Demo
//!
//! Runs an operation that fails twice before succeeding and prints the
//! timeout each attempt was granted.
//!
//! To run this example:
//! ```
//! cargo run -p connector-sdk --example retry_demo
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use connector_sdk::{Result, RetryExecutor, RetryPolicy, ServiceError, StepBackoff};

#[tokio::main]
async fn main() -> Result<()> {
    println!("Retry Executor Demo");
    println!("===================\n");

    let policy = RetryPolicy {
        max_attempts: 3,
        response_backoff: StepBackoff::linear(Duration::from_millis(200)),
        transport_backoff: StepBackoff::linear(Duration::from_millis(300)),
        base_timeout: Duration::from_secs(1),
        timeout_step: Duration::from_millis(500),
    };
    println!("{}\n", policy);

    let calls = Arc::new(AtomicU32::new(0));
    let executor = RetryExecutor::new(policy);

    let result = executor
        .execute(|attempt| {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                println!("Attempt {} (timeout {:?})", attempt.number, attempt.timeout);

                match n {
                    1 => Err(ServiceError::network("connection reset")),
                    2 => Err(ServiceError::parsing("answer was not JSON")),
                    _ => Ok("suite with 9 tests"),
                }
            }
        })
        .await;

    match result {
        Ok((value, attempts)) => println!("\nGot '{}' after {} attempt(s)", value, attempts),
        Err(exhausted) => println!("\n{}", exhausted),
    }

    Ok(())
}
