use diesel::{Connection, SqliteConnection};
use labdash_core::errors::{Error, StoreError};
use labdash_core::Result;
use log::debug;
use tokio::sync::{mpsc, oneshot};

use super::{get_connection, DbPool};
use crate::errors::StorageError;

// A job runs on the writer's connection and reports through its own reply channel.
type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Handle for sending jobs to the writer actor. Dropping every clone stops the actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<Job>,
}

impl WriteHandle {
    /// Runs `job` inside an immediate transaction on the writer's connection.
    ///
    /// The transaction is rolled back if the job returns an error.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (ret_tx, ret_rx) = oneshot::channel::<Result<T>>();

        let wrapped: Job = Box::new(move |conn| {
            let result = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);
            // The caller may have gone away; the write itself is already settled.
            let _ = ret_tx.send(result);
        });

        self.tx.send(wrapped).await.map_err(|_| {
            Error::Store(StoreError::ConnectionLost(
                "database writer has stopped".to_string(),
            ))
        })?;

        ret_rx.await.map_err(|_| {
            Error::Store(StoreError::Internal(
                "database writer dropped the job without replying".to_string(),
            ))
        })?
    }
}

/// Spawns the single writer task. It holds one pooled connection for its
/// whole life and applies jobs serially.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_writer(pool: &DbPool) -> Result<WriteHandle> {
    let mut conn = get_connection(pool)?;
    let (tx, mut rx) = mpsc::channel::<Job>(1024);

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            job(&mut *conn);
        }
        debug!("Database writer stopped");
    });

    Ok(WriteHandle { tx })
}
