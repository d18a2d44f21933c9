//! Single consumer draining page batches into one collection

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::page::Record;

/// Background task that owns the collected records
///
/// Batches are appended in receive order, which is not page order. The
/// collection is never shared; [`finish`](Self::finish) moves it out once
/// the queue has been observed closed and empty.
#[derive(Debug)]
pub struct Aggregator {
    handle: JoinHandle<Vec<Record>>,
}

impl Aggregator {
    /// Spawn the consumer loop on `receiver`
    pub fn spawn(receiver: mpsc::Receiver<Vec<Record>>) -> Self {
        Self {
            handle: tokio::spawn(drain(receiver)),
        }
    }

    /// Wait for the queue to close and drain, then take the records
    ///
    /// Returns only after every sender has been dropped.
    pub async fn finish(self) -> Result<Vec<Record>> {
        self.handle
            .await
            .map_err(|e| Error::orchestration(format!("aggregator task failed: {}", e)))
    }
}

/// Receive batches until the queue is closed and empty
pub async fn drain(mut receiver: mpsc::Receiver<Vec<Record>>) -> Vec<Record> {
    let mut collected = Vec::new();
    let mut batches = 0usize;

    while let Some(batch) = receiver.recv().await {
        batches += 1;
        collected.extend(batch);
    }

    tracing::debug!(batches, items = collected.len(), "Result queue drained");
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let (tx, rx) = mpsc::channel::<Vec<Record>>(4);
        drop(tx);
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_aggregator_collects_in_receive_order() {
        let (tx, rx) = mpsc::channel(4);
        let aggregator = Aggregator::spawn(rx);

        tx.send(vec![json!(2), json!(3)]).await.unwrap();
        tx.send(vec![json!(0)]).await.unwrap();
        tx.send(vec![json!(1)]).await.unwrap();
        drop(tx);

        let records = aggregator.finish().await.unwrap();
        assert_eq!(records, vec![json!(2), json!(3), json!(0), json!(1)]);
    }

    #[tokio::test]
    async fn test_aggregator_waits_for_all_senders() {
        let (tx, rx) = mpsc::channel(1);
        let aggregator = Aggregator::spawn(rx);

        let mut producers = Vec::new();
        for p in 0..8 {
            let tx = tx.clone();
            producers.push(tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(5 * p)).await;
                tx.send(vec![json!(p); 10]).await.unwrap();
            }));
        }
        drop(tx);

        // No join on producers here: finish() must still see every batch.
        let records = aggregator.finish().await.unwrap();
        assert_eq!(records.len(), 80);

        for producer in producers {
            producer.await.unwrap();
        }
    }
}
