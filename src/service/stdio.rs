use crate::error::Result;
use crate::service::dispatcher::ExportService;
use crate::service::clock::Clock;
use crate::storage::Store;
use crate::ui::GracefulShutdown;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Newline-delimited JSON message bus: one request per input line, one
/// response per output line.
pub struct MessageBus<'a, S, C> {
    service: &'a ExportService<S, C>,
    shutdown: &'a GracefulShutdown,
}

impl<'a, S: Store, C: Clock> MessageBus<'a, S, C> {
    pub fn new(service: &'a ExportService<S, C>, shutdown: &'a GracefulShutdown) -> Self {
        Self { service, shutdown }
    }

    /// Serves stdin until EOF or Ctrl+C.
    pub async fn run_stdio(&self) -> Result<usize> {
        let reader = BufReader::new(tokio::io::stdin());
        self.run(reader, tokio::io::stdout()).await
    }

    /// Returns the number of requests answered.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        let mut handled = 0;

        tracing::info!("Message bus started");

        loop {
            self.shutdown.check_shutdown()?;

            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                tracing::info!("EOF on input, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = self.service.handle_json(trimmed).await;
            let mut framed = serde_json::to_string(&response)?;
            framed.push('\n');

            writer.write_all(framed.as_bytes()).await?;
            writer.flush().await?;
            handled += 1;
        }

        Ok(handled)
    }
}
