#![allow(dead_code)]

pub use omegafold_test_utils::init_tracing;

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    omegafold_test_utils::with_timeout(f).await
}
