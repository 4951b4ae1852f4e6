use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::BenchError;

type Action<T> = Box<dyn FnOnce() -> T + Send>;

/// Single-use barrier for a fixed number of parties with a release action.
///
/// The last party to arrive runs the action exactly once, publishes its
/// result and only then releases every waiting party. All parties receive
/// the same action result, and none of them resumes before the action ran.
///
/// A rendezvous is not reusable: create a fresh one per operation.
pub struct Rendezvous<T> {
    parties: usize,
    arrived: AtomicUsize,
    action: Mutex<Option<Action<T>>>,
    released: watch::Sender<Option<T>>,
}

impl<T> fmt::Debug for Rendezvous<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rendezvous")
            .field("parties", &self.parties)
            .field("arrived", &self.arrived.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T> Rendezvous<T>
where
    T: Clone + Send + Sync,
{
    /// Fails for zero parties, as such a rendezvous could never be released.
    pub fn try_new<F>(parties: usize, action: F) -> Result<Self, BenchError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        if parties == 0 {
            return Err(BenchError::invalid(
                "rendezvous requires at least one party",
            ));
        }

        let (released, _) = watch::channel(None);
        Ok(Self {
            parties,
            arrived: AtomicUsize::new(0),
            action: Mutex::new(Some(Box::new(action))),
            released,
        })
    }

    /// Register the arrival of one party and wait until all parties arrived.
    ///
    /// Returns the result of the release action.
    pub async fn arrive_and_wait(&self) -> Result<T, RendezvousError> {
        let position = self.arrived.fetch_add(1, Ordering::AcqRel);
        if position >= self.parties {
            return Err(RendezvousError::Overrun {
                parties: self.parties,
            });
        }

        if position + 1 == self.parties {
            let action = self.action.lock().take().ok_or(RendezvousError::Abandoned)?;
            let value = action();
            self.released.send_replace(Some(value.clone()));
            return Ok(value);
        }

        let mut rx = self.released.subscribe();
        let released = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| RendezvousError::Abandoned)?
            .clone();
        released.ok_or(RendezvousError::Abandoned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendezvousError {
    /// More parties arrived than the rendezvous was created for.
    Overrun { parties: usize },
    /// The rendezvous went away before it was released.
    Abandoned,
}

impl fmt::Display for RendezvousError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendezvousError::Overrun { parties } => {
                write!(f, "rendezvous overrun: more than {parties} parties arrived")
            }
            RendezvousError::Abandoned => write!(f, "rendezvous abandoned before release"),
        }
    }
}

impl std::error::Error for RendezvousError {}
