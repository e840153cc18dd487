use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize the global logging subscriber for an embedding process.
///
/// Repeat initialization is tolerated: this pipeline runs inside a host it
/// does not own, so a subscriber installed by the host wins silently.
pub fn init_tracing(max_level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(max_level).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
