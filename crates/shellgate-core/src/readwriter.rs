use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

pub const CONSOLE_MESSAGE_PREFIX: &str = "> GitLab:";

/// Borrowed session streams for a single SSH invocation.
///
/// `out` and `err_out` are the user's stdout/stderr, `input` is the user's
/// stdin. Fields are independent borrows so a caller can drive reads and
/// writes concurrently.
pub struct ReadWriter<'a> {
    pub out: &'a mut (dyn AsyncWrite + Send + Unpin),
    pub err_out: &'a mut (dyn AsyncWrite + Send + Unpin),
    pub input: &'a mut (dyn AsyncBufRead + Send + Unpin),
}

impl<'a> ReadWriter<'a> {
    pub fn new(
        out: &'a mut (dyn AsyncWrite + Send + Unpin),
        err_out: &'a mut (dyn AsyncWrite + Send + Unpin),
        input: &'a mut (dyn AsyncBufRead + Send + Unpin),
    ) -> Self {
        Self {
            out,
            err_out,
            input,
        }
    }
}

/// Writes `> GitLab: <message>` followed by a newline and flushes.
pub async fn write_console_message(
    out: &mut (dyn AsyncWrite + Send + Unpin),
    message: &str,
) -> std::io::Result<()> {
    let line = format!("{CONSOLE_MESSAGE_PREFIX} {message}\n");
    out.write_all(line.as_bytes()).await?;
    out.flush().await
}
