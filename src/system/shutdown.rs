use tokio::sync::watch;

/// Fires when the owning [`ShutdownTx`] signals or is dropped.
pub type ShutdownRx = watch::Receiver<()>;

#[derive(Debug)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }
}

pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}
