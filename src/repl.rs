//! Interactive loop: one line in, one pipeline run, one reply out.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::errors::RagError;
use crate::pipeline::PipelineController;

pub const EXIT_WORDS: [&str; 3] = ["exit", "quit", "bye"];
pub const GOODBYE: &str = "Goodbye! Have a great day!!";
const PROMPT: &str = "\nUser: ";

pub fn welcome(speaker: &str) -> String {
    format!(
        "Welcome to {}! Type 'exit', 'quit', or 'bye' to end the conversation.",
        speaker
    )
}

/// Anything that can answer one user turn.
#[async_trait]
pub trait TurnRunner: Send + Sync {
    fn speaker(&self) -> &str {
        "RAGbot"
    }

    async fn run_turn(&self, query: &str) -> Result<String, RagError>;
}

#[async_trait]
impl TurnRunner for PipelineController {
    fn speaker(&self) -> &str {
        self.agent_name()
    }

    async fn run_turn(&self, query: &str) -> Result<String, RagError> {
        self.run(query).await.map(|outcome| outcome.reply)
    }
}

pub fn is_exit_command(line: &str) -> bool {
    let word = line.trim();
    EXIT_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w))
}

/// Runs until an exit word or EOF. Turn failures are reported and the loop
/// continues; only I/O errors on the console end it early.
pub async fn run_repl<T, R, W>(runner: &T, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    T: TurnRunner + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(format!("{}\n", welcome(runner.speaker())).as_bytes())
        .await?;

    let mut line = String::new();
    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            tracing::debug!("Input closed");
            writer.write_all(format!("\n{}\n", GOODBYE).as_bytes()).await?;
            break;
        }

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit_command(query) {
            writer.write_all(format!("{}\n", GOODBYE).as_bytes()).await?;
            break;
        }

        let out = match runner.run_turn(query).await {
            Ok(reply) => format!("{}: {}\n", runner.speaker(), reply),
            Err(e) => {
                tracing::error!(kind = e.kind(), error = %e, "Turn failed");
                format!("{} error: {}\n", runner.speaker(), e)
            }
        };
        writer.write_all(out.as_bytes()).await?;
    }

    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedRunner {
        queries: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl TurnRunner for ScriptedRunner {
        async fn run_turn(&self, query: &str) -> Result<String, RagError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail_on == Some(query) {
                return Err(RagError::Timeout(Duration::from_secs(10)));
            }
            Ok(format!("echo {}", query))
        }
    }

    async fn session(runner: &ScriptedRunner, input: &str) -> String {
        let mut output = Vec::new();
        run_repl(runner, input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn exit_words_match_ignoring_case_and_whitespace() {
        for word in ["exit", "EXIT", "Quit", "  bye  ", "BYE\n"] {
            assert!(is_exit_command(word), "{word:?}");
        }
        for word in ["exiting", "goodbye", "", "quit now"] {
            assert!(!is_exit_command(word), "{word:?}");
        }
    }

    #[tokio::test]
    async fn exit_words_end_the_loop_without_running_a_turn() {
        for word in ["EXIT", "Quit", "BYE"] {
            let runner = ScriptedRunner::default();
            let output = session(&runner, &format!("{}\nnever asked\n", word)).await;

            assert!(runner.queries.lock().unwrap().is_empty());
            assert!(output.starts_with("Welcome to RAGbot! Type 'exit', 'quit', or 'bye'"));
            assert!(output.ends_with(&format!("User: {}\n", GOODBYE)));
        }
    }

    #[tokio::test]
    async fn replies_are_printed_per_turn() {
        let runner = ScriptedRunner::default();
        let output = session(&runner, "What color is the sky?\n\n   \nhello\nbye\n").await;

        assert_eq!(
            *runner.queries.lock().unwrap(),
            vec!["What color is the sky?".to_string(), "hello".to_string()]
        );
        assert!(output.contains("RAGbot: echo What color is the sky?\n"));
        assert!(output.contains("RAGbot: echo hello\n"));
    }

    #[tokio::test]
    async fn eof_is_an_implicit_exit() {
        let runner = ScriptedRunner::default();
        let output = session(&runner, "hello\n").await;

        assert_eq!(runner.queries.lock().unwrap().len(), 1);
        assert!(output.ends_with(&format!("{}\n", GOODBYE)));
    }

    #[tokio::test]
    async fn failed_turn_is_reported_and_loop_continues() {
        let runner = ScriptedRunner {
            fail_on: Some("slow question"),
            ..Default::default()
        };
        let output = session(&runner, "slow question\nnext\nexit\n").await;

        assert!(output.contains("RAGbot error: pipeline run exceeded its 10s budget\n"));
        assert!(output.contains("RAGbot: echo next\n"));
        assert_eq!(runner.queries.lock().unwrap().len(), 2);
    }
}
