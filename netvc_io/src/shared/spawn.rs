use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

#[derive(Debug)]
pub struct BlockingSpawnError {
    pub message: String,
}

impl Display for BlockingSpawnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "blocking task failed: {}", self.message)
    }
}

impl std::error::Error for BlockingSpawnError {}

impl From<BlockingSpawnError> for std::io::Error {
    fn from(err: BlockingSpawnError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}

/// A handle to a closure running on the blocking pool
pub struct BlockingSpawn<T> {
    handle: tokio::task::JoinHandle<T>,
}

impl<T> BlockingSpawn<T> {
    pub(crate) fn new(handle: tokio::task::JoinHandle<T>) -> Self {
        Self { handle }
    }
}

impl<T> Future for BlockingSpawn<T> {
    type Output = Result<T, BlockingSpawnError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().handle)
            .poll(cx)
            .map_err(|err| BlockingSpawnError {
                message: err.to_string(),
            })
    }
}
