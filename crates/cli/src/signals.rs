use std::future::Future;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::signal;

use roiwatch_core::control::control_surface::ControlFlags;

/// Resolves on Ctrl+C, or on SIGTERM where the platform has one.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down"),
        _ = terminate => log::info!("Received terminate signal, shutting down"),
    }
}

/// Waits for `signal` on a dedicated thread with its own single-threaded
/// runtime, then asks the monitor loop to quit. The loop saves preferences
/// and releases the camera on its way out.
pub fn quit_on<F>(signal: F, flags: Arc<ControlFlags>) -> io::Result<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            runtime.block_on(signal);
            flags.request_quit();
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_quit_requested_once_signal_fires() {
        let flags = Arc::new(ControlFlags::new(false));
        let handle = quit_on(async {}, flags.clone()).unwrap();
        handle.join().unwrap();
        assert!(flags.quit_requested());
    }

    #[test]
    fn test_quit_waits_for_signal() {
        let flags = Arc::new(ControlFlags::new(false));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = quit_on(
            async move {
                let _ = rx.await;
            },
            flags.clone(),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(!flags.quit_requested());

        tx.send(()).unwrap();
        handle.join().unwrap();
        assert!(flags.quit_requested());
    }

    #[test]
    fn test_quit_keeps_fullscreen_preference() {
        let flags = Arc::new(ControlFlags::new(true));
        quit_on(async {}, flags.clone()).unwrap().join().unwrap();
        assert!(flags.quit_requested());
        assert!(flags.fullscreen());
    }
}
