use crate::shared::spawn::BlockingSpawn;

/// Runs `f` on tokio's blocking pool. Used for the few operations that must
/// block the calling thread, such as a connect configured as blocking.
pub fn spawn_blocking<F, R>(f: F) -> BlockingSpawn<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    BlockingSpawn::new(tokio::task::spawn_blocking(f))
}
