use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Debug, PartialEq, Eq)]
pub enum HandleUserInputError {
    Terminate,
}

#[async_trait]
pub trait HandleUserInput {
    async fn handle(&mut self, user_input: String) -> Result<(), HandleUserInputError>;
}

pub struct Repl<H: HandleUserInput + Send> {
    handler: H,
    prompt: Option<String>,
}

impl<H: HandleUserInput + Send> Repl<H> {
    pub fn new(handler: H, prompt: Option<String>) -> Self {
        Self { handler, prompt }
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}

impl<H: HandleUserInput + Send> Repl<H> {
    /// Serve lines from stdin until the handler asks to stop or input ends.
    pub async fn serve(&mut self) {
        self.serve_from(BufReader::new(tokio::io::stdin())).await
    }

    pub async fn serve_from<R: AsyncBufRead + Unpin>(&mut self, input: R) {
        let mut lines = input.lines();
        loop {
            if let Some(p) = &self.prompt {
                print!("{}", p);
                if let Err(e) = std::io::Write::flush(&mut std::io::stdout()) {
                    log::warn!("Failed to write prompt: {}", e);
                }
            }
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if self.handler.handle(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::error!("Failed to read console input: {}", e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        lines: Vec<String>,
    }

    #[async_trait]
    impl HandleUserInput for Recorder {
        async fn handle(&mut self, user_input: String) -> Result<(), HandleUserInputError> {
            if user_input == "stop" {
                return Err(HandleUserInputError::Terminate);
            }
            self.lines.push(user_input);
            Ok(())
        }
    }

    #[tokio::test]
    async fn stops_on_terminate() {
        let mut repl = Repl::new(Recorder::default(), None);
        repl.serve_from(&b"one\ntwo\nstop\nthree\n"[..]).await;
        assert_eq!(repl.into_handler().lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn stops_at_end_of_input() {
        let mut repl = Repl::new(Recorder::default(), None);
        repl.serve_from(&b"only\n"[..]).await;
        assert_eq!(repl.into_handler().lines, vec!["only"]);
    }
}
