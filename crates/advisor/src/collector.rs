use std::io::Write;

use ai_client::TextGenerator;
use models::{PipelineError, Result};

/// Full reply of one generation exchange.
///
/// Only produced when the backend reported completion; a failed exchange
/// never yields a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseBuffer {
    text: String,
    chunks: usize,
}

impl ResponseBuffer {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.chunks += 1;
    }
}

/// Sends `prompt` to `backend` and collects the streamed reply, mirroring it to `sink`.
pub fn run_exchange<W>(
    backend: &dyn TextGenerator,
    model: &str,
    prompt: &str,
    sink: &mut W,
) -> Result<ResponseBuffer>
where
    W: Write + ?Sized,
{
    tracing::info!("Requesting advice from model {model}");

    let stream = backend
        .generate_stream(model, prompt)
        .map_err(|e| PipelineError::Generation(format!("{e:#}")))?;

    let buffer = collect_response(stream, sink)?;
    tracing::info!(
        "Received {} chunk(s), {} bytes",
        buffer.chunk_count(),
        buffer.as_str().len()
    );
    Ok(buffer)
}

/// Appends each chunk in arrival order and writes it to `sink` as it arrives.
///
/// The first backend error aborts collection. Text already written to `sink`
/// stays there, but the partial buffer is dropped. `sink` is only a mirror:
/// once a write to it fails, mirroring stops and collection carries on.
pub fn collect_response<I, W>(chunks: I, sink: &mut W) -> Result<ResponseBuffer>
where
    I: IntoIterator<Item = anyhow::Result<String>>,
    W: Write + ?Sized,
{
    let mut buffer = ResponseBuffer::default();
    let mut mirroring = true;

    for chunk in chunks {
        let chunk = chunk.map_err(|e| PipelineError::Generation(format!("{e:#}")))?;
        if chunk.is_empty() {
            continue;
        }

        buffer.push(&chunk);
        if mirroring {
            mirroring = mirror(sink, chunk.as_bytes());
        }
    }

    if mirroring {
        mirror(sink, b"\n");
    }

    Ok(buffer)
}

fn mirror<W: Write + ?Sized>(sink: &mut W, bytes: &[u8]) -> bool {
    match sink.write_all(bytes).and_then(|_| sink.flush()) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Live output stopped, still collecting the reply: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_client::ChunkStream;
    use anyhow::anyhow;

    struct ScriptedBackend {
        chunks: Vec<std::result::Result<&'static str, &'static str>>,
    }

    impl TextGenerator for ScriptedBackend {
        fn generate_stream(&self, _model: &str, _prompt: &str) -> anyhow::Result<ChunkStream<'_>> {
            Ok(Box::new(self.chunks.iter().map(|c| match c {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(anyhow!(msg.to_string())),
            })))
        }
    }

    struct UnreachableBackend;

    impl TextGenerator for UnreachableBackend {
        fn generate_stream(&self, _model: &str, _prompt: &str) -> anyhow::Result<ChunkStream<'_>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn test_chunks_are_accumulated_and_mirrored_in_order() {
        let backend = ScriptedBackend {
            chunks: vec![Ok("Pay "), Ok("the card "), Ok("first.")],
        };
        let mut sink = Vec::new();

        let buffer = run_exchange(&backend, "m", "p", &mut sink).unwrap();

        assert_eq!(buffer.as_str(), "Pay the card first.");
        assert_eq!(buffer.chunk_count(), 3);
        assert_eq!(String::from_utf8(sink).unwrap(), "Pay the card first.\n");
    }

    #[test]
    fn test_repeated_chunks_are_not_deduplicated() {
        let chunks = vec![Ok("ha".to_string()), Ok("ha".to_string())];
        let mut sink = Vec::new();
        let buffer = collect_response(chunks, &mut sink).unwrap();
        assert_eq!(buffer.as_str(), "haha");
        assert_eq!(buffer.chunk_count(), 2);
    }

    #[test]
    fn test_mid_stream_error_fails_but_keeps_mirrored_text() {
        let backend = ScriptedBackend {
            chunks: vec![Ok("partial "), Err("stream reset"), Ok("never")],
        };
        let mut sink = Vec::new();

        let err = run_exchange(&backend, "m", "p", &mut sink).unwrap_err();

        assert!(matches!(err, PipelineError::Generation(ref msg) if msg.contains("stream reset")));
        assert_eq!(String::from_utf8(sink).unwrap(), "partial ");
    }

    #[test]
    fn test_backend_unavailable_is_generation_error() {
        let mut sink = Vec::new();
        let err = run_exchange(&UnreachableBackend, "m", "p", &mut sink).unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(sink.is_empty());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failing_sink_does_not_lose_the_reply() {
        let backend = ScriptedBackend {
            chunks: vec![Ok("Pay "), Ok("the card.")],
        };

        let buffer = run_exchange(&backend, "m", "p", &mut ClosedPipe).unwrap();

        assert_eq!(buffer.as_str(), "Pay the card.");
        assert_eq!(buffer.chunk_count(), 2);
    }
}
