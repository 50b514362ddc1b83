use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, BufWriter, Write};

use bytes::{Bytes, BytesMut};
use ffmpeg_pipe::{AvPipeline, Settings};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{DecodeConfig, Input};
use crate::sink::PictureSink;

// read chunks in flight between the reader and the decode worker
const CHANNEL_DEPTH: usize = 8;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub bytes: u64,
    pub pictures: u64,
    pub interrupted: bool,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "decoded {} pictures from {} bytes{}",
            self.pictures,
            self.bytes,
            if self.interrupted { " (interrupted)" } else { "" }
        )
    }
}

pub struct DecodeTask {
    cancel: CancellationToken,
}

impl DecodeTask {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Reads the input on the runtime and decodes it on a blocking worker.
    pub async fn run(&self, config: DecodeConfig) -> anyhow::Result<Summary> {
        let reader: Box<dyn AsyncRead + Unpin + Send> = match &config.input {
            Input::Stdin => Box::new(tokio::io::stdin()),
            Input::File(path) => Box::new(
                tokio::fs::File::open(path)
                    .await
                    .map_err(|e| anyhow::anyhow!("open {}: {}", path.display(), e))?,
            ),
        };
        let sink = Self::open_sink(&config)?;

        let (chunk_tx, chunk_rx) = mpsc::channel::<Bytes>(CHANNEL_DEPTH);
        let worker_cancel = self.cancel.clone();
        let settings = config.settings.clone();
        let drain = config.drain;
        let handle = tokio::task::spawn_blocking(move || {
            Self::decode_loop(settings, drain, worker_cancel, chunk_rx, sink)
        });

        let read = Self::read_loop(reader, config.read_size, chunk_tx, &self.cancel).await;
        let summary = handle.await??;
        read?;
        Ok(summary)
    }

    fn open_sink(config: &DecodeConfig) -> anyhow::Result<PictureSink> {
        let yuv = match &config.yuv {
            Some(path) => {
                let file = File::create(path)
                    .map_err(|e| anyhow::anyhow!("create {}: {}", path.display(), e))?;
                Some(Box::new(BufWriter::new(file)) as Box<dyn Write + Send>)
            }
            None => None,
        };
        Ok(PictureSink::new(
            config.report,
            Box::new(BufWriter::new(io::stdout())),
            yuv,
        ))
    }

    async fn read_loop(
        mut reader: Box<dyn AsyncRead + Unpin + Send>,
        read_size: usize,
        chunk_tx: mpsc::Sender<Bytes>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        loop {
            let mut buf = BytesMut::with_capacity(read_size);
            let n = tokio::select! {
                _ = cancel.cancelled() => break,
                n = reader.read_buf(&mut buf) => n?,
            };
            if n == 0 {
                log::debug!("end of input");
                break;
            }
            if chunk_tx.send(buf.freeze()).await.is_err() {
                // worker stopped; its result carries the reason
                break;
            }
        }
        Ok(())
    }

    fn decode_loop(
        settings: Settings,
        drain: bool,
        cancel: CancellationToken,
        mut chunk_rx: mpsc::Receiver<Bytes>,
        mut sink: PictureSink,
    ) -> anyhow::Result<Summary> {
        let mut pipeline = AvPipeline::new(&settings)?;
        log::info!(
            "decoding with {}, buffer capacity {}",
            pipeline.codec_name(),
            pipeline.capacity()
        );

        let mut summary = Summary::default();
        while let Some(chunk) = chunk_rx.blocking_recv() {
            if cancel.is_cancelled() {
                break;
            }
            summary.bytes += chunk.len() as u64;
            let result = pipeline.decode(&chunk, |picture| sink.accept(picture));
            sink.take_error()?;
            if let Err(e) = result {
                log::error!("decode failed after {} bytes: {}", summary.bytes, e);
                return Err(e.into());
            }
        }

        summary.interrupted = cancel.is_cancelled();
        if drain && !summary.interrupted {
            pipeline.finish(|picture| sink.accept(picture))?;
        }
        pipeline.close();

        sink.flush()?;
        summary.pictures = sink.count();
        Ok(summary)
    }
}
