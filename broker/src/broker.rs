use anyhow::{Context as _, Result};
use crossbeam::channel::{Receiver, Sender};
use log::{debug, info, warn};
use model::{EvaluationError, GameAnalyzer, ModelInfo, Prediction, Predictor};
use parking_lot::RwLock;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::JoinHandle;
use tokio::sync::oneshot;

use super::channel::ChannelExt;
use super::options::BrokerOptions;
use super::reporter::{BrokerStats, Reporter};

type SharedPredictor<S> = Arc<dyn Predictor<State = S> + Send + Sync>;

type EvaluationResult = Result<Prediction, EvaluationError>;

struct StateToAnalyse<S> {
    id: u64,
    state: S,
    tx: oneshot::Sender<EvaluationResult>,
}

struct ActivePredictor<S> {
    predictor: SharedPredictor<S>,
    info: Option<ModelInfo>,
}

/// Collects evaluation requests from many concurrent searches into batched predictor calls.
///
/// Batches are formed on a dedicated thread. Each batch is sent to the predictor in a single call
/// and every caller receives exactly the prediction for its own state.
///
/// Swapping the predictor never affects a batch that has already been dispatched: such a batch
/// completes against the predictor it started with. Every batch dispatched after
/// `swap_predictor` returns uses the new predictor.
pub struct EvaluationBroker<S> {
    sender: Option<Sender<StateToAnalyse<S>>>,
    active: Arc<RwLock<ActivePredictor<S>>>,
    reporter: Arc<Reporter>,
    next_request_id: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl<S> EvaluationBroker<S>
where
    S: Send + 'static,
{
    pub fn new<P>(predictor: P, options: BrokerOptions) -> Result<Self>
    where
        P: Predictor<State = S> + Send + Sync + 'static,
    {
        Self::start(Arc::new(predictor), None, options)
    }

    pub fn with_model_info<P>(predictor: P, info: ModelInfo, options: BrokerOptions) -> Result<Self>
    where
        P: Predictor<State = S> + Send + Sync + 'static,
    {
        Self::start(Arc::new(predictor), Some(info), options)
    }

    fn start(
        predictor: SharedPredictor<S>,
        info: Option<ModelInfo>,
        options: BrokerOptions,
    ) -> Result<Self> {
        info!(
            "Starting evaluation broker for model {:?}. Batch Size: {}, Batch Timeout: {:?}",
            info.as_ref().map(|i| i.model_name()),
            options.eval_batch_size,
            options.eval_batch_timeout
        );

        let (sender, receiver) = crossbeam::channel::unbounded();
        let active = Arc::new(RwLock::new(ActivePredictor { predictor, info }));
        let reporter = Arc::new(Reporter::new());

        let worker = {
            let active = active.clone();
            let reporter = reporter.clone();

            std::thread::Builder::new()
                .name("evaluation-broker".to_string())
                .spawn(move || run_batches(receiver, active, reporter, options))
                .context("Failed to spawn the evaluation broker thread")?
        };

        Ok(Self {
            sender: Some(sender),
            active,
            reporter,
            next_request_id: AtomicU64::new(0),
            worker: Some(worker),
        })
    }

    /// Queues `state` for evaluation. The returned future resolves once its batch completes.
    pub fn submit(&self, state: S) -> EvaluationFuture {
        let (tx, rx) = oneshot::channel();
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);

        match &self.sender {
            Some(sender) => sender
                .send(StateToAnalyse { id, state, tx })
                .unwrap_or_else(|_| debug!("Request channel closed, dropping request {}", id)),
            None => debug!("Broker is shutting down, dropping request {}", id),
        }

        EvaluationFuture { receiver: rx }
    }

    /// Replaces the active predictor for every batch dispatched from now on.
    pub fn swap_predictor<P>(&self, predictor: P, info: ModelInfo)
    where
        P: Predictor<State = S> + Send + Sync + 'static,
    {
        let mut active = self.active.write();

        info!(
            "Updating predictor from {:?} to {}",
            active.info.as_ref().map(|i| i.model_name()),
            info.model_name()
        );

        *active = ActivePredictor {
            predictor: Arc::new(predictor),
            info: Some(info),
        };
    }

    pub fn model_info(&self) -> Option<ModelInfo> {
        self.active.read().info.clone()
    }

    pub fn stats(&self) -> BrokerStats {
        self.reporter.stats()
    }
}

impl<S> GameAnalyzer for EvaluationBroker<S>
where
    S: Clone + Send + 'static,
{
    type State = S;
    type Future = EvaluationFuture;

    fn get_state_analysis(&self, game_state: &S) -> Self::Future {
        self.submit(game_state.clone())
    }
}

impl<S> Drop for EvaluationBroker<S> {
    fn drop(&mut self) {
        drop(self.sender.take());

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Evaluation broker thread panicked");
            }
        }
    }
}

/// A future that resolves to the prediction of a single submitted state.
pub struct EvaluationFuture {
    receiver: oneshot::Receiver<EvaluationResult>,
}

impl Future for EvaluationFuture {
    type Output = EvaluationResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(EvaluationError::Disconnected)),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn run_batches<S>(
    receiver: Receiver<StateToAnalyse<S>>,
    active: Arc<RwLock<ActivePredictor<S>>>,
    reporter: Arc<Reporter>,
    options: BrokerOptions,
) {
    loop {
        let batch = receiver.recv_up_to(options.eval_batch_size, options.eval_batch_timeout);

        if batch.is_empty() {
            debug!("Request channel closed, stopping evaluation broker");
            break;
        }

        let predictor = active.read().predictor.clone();
        analyse_batch(batch, &*predictor, &reporter);
        reporter.maybe_report();
    }
}

/// Runs one predictor call for the batch and routes every result back to its caller.
fn analyse_batch<S>(
    batch: Vec<StateToAnalyse<S>>,
    predictor: &(dyn Predictor<State = S> + Send + Sync),
    reporter: &Reporter,
) {
    let batch_size = batch.len();
    let (ids, (states, senders)): (Vec<_>, (Vec<_>, Vec<_>)) = batch
        .into_iter()
        .map(|r| (r.id, (r.state, r.tx)))
        .unzip();

    let results = match predictor.predict(&states) {
        Ok(predictions) if predictions.len() == batch_size => {
            predictions.into_iter().map(Ok).collect::<Vec<_>>()
        }
        Ok(predictions) => {
            let err = EvaluationError::BatchSizeMismatch {
                expected: batch_size,
                actual: predictions.len(),
            };
            warn!("{}", err);
            vec![Err(err); batch_size]
        }
        Err(err) => {
            warn!("Predictor failed for a batch of {}: {:#}", batch_size, err);
            vec![Err(EvaluationError::Predictor(format!("{:#}", err))); batch_size]
        }
    };

    let failed = results.first().map_or(false, |r| r.is_err());
    reporter.set_batch(batch_size, failed);

    debug!(
        "Dispatched batch of {} requests ({}..={}), failed: {}",
        batch_size,
        ids.first().copied().unwrap_or_default(),
        ids.last().copied().unwrap_or_default(),
        failed
    );

    for ((id, tx), result) in ids.into_iter().zip(senders).zip(results) {
        tx.send(result)
            .unwrap_or_else(|_| debug!("Response channel closed for request {}", id));
    }
}
