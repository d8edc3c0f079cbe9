use tokio::io::{AsyncRead, AsyncReadExt};

use crate::decode::StreamDecoder;
use crate::error::Result;
use crate::events::EventSink;
use crate::parser::{CancelToken, ParserBuilder, Session};
use crate::progress::Progress;

impl ParserBuilder {
    /// Build a parser that reads from an arbitrary `tokio::io::AsyncRead`.
    ///
    /// This requires the `async` feature.
    pub fn from_async_reader<R>(&self, rdr: R) -> AsyncParser<R>
    where
        R: AsyncRead + Unpin,
    {
        AsyncParser {
            rdr,
            builder: self.clone(),
            cancel: CancelToken::new(),
            progress: Progress::new(),
        }
    }
}

/// The asynchronous flavor of [`Parser`].
///
/// Suspension happens only while a chunk is read from the source; events
/// are delivered in exactly the order and with exactly the content of a
/// synchronous parse of the same bytes. Which thread observes them depends
/// on the runtime driving the future, never their order.
///
/// [`Parser`]: struct.Parser.html
pub struct AsyncParser<R> {
    rdr: R,
    builder: ParserBuilder,
    cancel: CancelToken,
    progress: Progress,
}

impl<R: AsyncRead + Unpin> AsyncParser<R> {
    /// A token that cancels this parse when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// A handle reporting this parse's progress.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// Parse the source to completion, pushing events into `sink`.
    ///
    /// The contract is identical to the synchronous `Parser::parse`.
    pub async fn parse<S: EventSink>(self, sink: &mut S) -> Result<()> {
        let AsyncParser { mut rdr, builder, cancel, progress } = self;
        let mut session =
            Session::new(builder.core().build()?, cancel, progress.clone());
        let mut decoder = StreamDecoder::new(progress);
        let mut scratch = vec![0; builder.capacity()];

        sink.on_document_begin();
        let result = async {
            loop {
                let n = rdr.read(&mut scratch).await?;
                session.add_bytes(n as u64);
                if n == 0 {
                    let tail = decoder.feed(&[], true);
                    session.feed(tail, sink)?;
                    return session.finish(sink);
                }
                let chunk = decoder.feed(&scratch[..n], false);
                session.feed(chunk, sink)?;
            }
        }
        .await;
        match result {
            Ok(()) => {
                sink.on_document_end();
                Ok(())
            }
            Err(err) => {
                sink.on_failure(&err);
                Err(err)
            }
        }
    }
}
