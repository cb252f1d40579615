/// Whether the overlay currently owns a visible terminal. Mirrors the
/// stopped/running state of the process: SIGTSTP takes the session hidden,
/// SIGCONT brings it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

#[cfg(unix)]
mod imp {
    use tokio::signal::unix::{signal, Signal, SignalKind};

    use super::Visibility;

    /// Listens for the job-control signals that bracket a suspension. The
    /// session flushes and releases the terminal on Hidden before actually
    /// stopping itself, and restarts its accounting on Visible.
    pub struct VisibilitySignals {
        tstp: Signal,
        cont: Signal,
    }

    impl VisibilitySignals {
        pub fn install() -> std::io::Result<Self> {
            Ok(Self {
                tstp: signal(SignalKind::from_raw(libc::SIGTSTP))?,
                cont: signal(SignalKind::from_raw(libc::SIGCONT))?,
            })
        }

        pub async fn next_change(&mut self) -> Visibility {
            loop {
                tokio::select! {
                    got = self.tstp.recv() => {
                        if got.is_some() {
                            return Visibility::Hidden;
                        }
                    }
                    got = self.cont.recv() => {
                        if got.is_some() {
                            return Visibility::Visible;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use super::Visibility;

    /// No job control outside unix. The session still handles every other
    /// lifecycle edge, this source just never fires.
    pub struct VisibilitySignals;

    impl VisibilitySignals {
        pub fn install() -> std::io::Result<Self> {
            Ok(Self)
        }

        pub async fn next_change(&mut self) -> Visibility {
            std::future::pending().await
        }
    }
}

pub use imp::VisibilitySignals;
