use futures_util::StreamExt;
use shellgate_core::{GatewayError, ReadWriter};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;

use crate::client::{GitalyTarget, ReceivePackConnector, ReceivePackResponses};
use crate::proto::SshReceivePackRequest;

pub const STREAM_CHUNK_SIZE: usize = 32 * 1024;
const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// Streams one receive-pack session between the SSH user and the backend.
///
/// `header` is sent as the first frame. User input is then forwarded in
/// chunks until EOF while backend stdout/stderr is relayed as it arrives.
/// Returns the backend exit code, or `0` if the stream ends without one.
/// Flipping `cancel` to `true` aborts both directions and drops the call.
pub async fn proxy_receive_pack(
    connector: &dyn ReceivePackConnector,
    target: &GitalyTarget,
    header: SshReceivePackRequest,
    read_writer: &mut ReadWriter<'_>,
    mut cancel: watch::Receiver<bool>,
) -> Result<i32, GatewayError> {
    let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
    request_tx
        .send(header)
        .await
        .map_err(|_| GatewayError::Rpc("request stream closed before header".to_string()))?;

    let responses = tokio::select! {
        opened = connector.open(target, ReceiverStream::new(request_rx)) => opened?,
        _ = wait_for_cancel(&mut cancel) => return Err(GatewayError::Cancelled),
    };

    let input_pump = forward_input(&mut *read_writer.input, request_tx);
    let output_pump = forward_output(responses, &mut *read_writer.out, &mut *read_writer.err_out);
    tokio::pin!(input_pump, output_pump);

    let mut input_done = false;
    loop {
        tokio::select! {
            exit_code = &mut output_pump => {
                let exit_code = exit_code?;
                tracing::debug!(exit_code, "receive-pack stream finished");
                return Ok(exit_code);
            }
            forwarded = &mut input_pump, if !input_done => {
                input_done = true;
                let bytes = forwarded?;
                tracing::debug!(bytes, "receive-pack input reached eof");
            }
            _ = wait_for_cancel(&mut cancel) => {
                tracing::debug!("receive-pack cancelled");
                return Err(GatewayError::Cancelled);
            }
        }
    }
}

async fn forward_input<R>(
    input: &mut R,
    request_tx: mpsc::Sender<SshReceivePackRequest>,
) -> Result<u64, GatewayError>
where
    R: AsyncRead + Send + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; STREAM_CHUNK_SIZE];
    let mut forwarded = 0u64;
    loop {
        let read = input.read(&mut buffer).await?;
        if read == 0 {
            return Ok(forwarded);
        }
        let frame = SshReceivePackRequest {
            stdin: buffer[..read].to_vec(),
            ..SshReceivePackRequest::default()
        };
        if request_tx.send(frame).await.is_err() {
            // the call is gone; the response side reports why
            return Ok(forwarded);
        }
        forwarded += read as u64;
    }
}

async fn forward_output(
    mut responses: ReceivePackResponses,
    out: &mut (dyn AsyncWrite + Send + Unpin),
    err_out: &mut (dyn AsyncWrite + Send + Unpin),
) -> Result<i32, GatewayError> {
    let mut exit_code = 0;
    while let Some(response) = responses.next().await {
        let response = response?;
        if !response.stdout.is_empty() {
            out.write_all(&response.stdout).await?;
            out.flush().await?;
        }
        if !response.stderr.is_empty() {
            err_out.write_all(&response.stderr).await?;
            err_out.flush().await?;
        }
        if let Some(status) = response.exit_status {
            exit_code = status.value;
        }
    }
    Ok(exit_code)
}

async fn wait_for_cancel(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
