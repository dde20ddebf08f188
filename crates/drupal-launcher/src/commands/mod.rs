pub mod create;
pub mod destroy;
pub mod status;

use drupal_launcher_cloud::CancellationToken;
use std::io::Write;

/// Print `message` and read one trimmed line from stdin.
pub fn prompt(message: &str) -> std::io::Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Ask a yes/no question that defaults to no.
pub fn confirm(message: &str) -> std::io::Result<bool> {
    let answer = prompt(&format!("{} [y/N] ", message))?;
    Ok(answer.eq_ignore_ascii_case("y"))
}

/// Token cancelled on Ctrl-C so long waits stop at the next tick.
pub fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel("interrupted by user");
        }
    });
    token
}
