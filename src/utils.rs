use std::future::Future;
use std::time::Duration;

/// Run `f` every `interval`, starting one interval from now.
pub async fn loop_with_interval<Fut: Future<Output = ()>>(interval: Duration, f: impl Fn() -> Fut) {
    loop {
        tokio::time::sleep(interval).await;
        f().await;
    }
}
