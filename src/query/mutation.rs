use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use tokio::sync::mpsc;

use super::error::QueryError;

/// The state of a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<O> {
  Idle,
  Pending,
  Success(O),
  Error(QueryError),
}

type Mutator<I, O> = Box<dyn Fn(I) -> BoxFuture<'static, Result<O, QueryError>> + Send + Sync>;
type SuccessCallback<I, O> = Box<dyn FnMut(&O, &I) + Send>;
type ErrorCallback<I> = Box<dyn FnMut(&QueryError, &I) + Send>;

/// A one-off async write, such as deleting a link.
///
/// Unlike `Query`, a mutation is not cached. `mutate()` spawns the operation
/// and `poll()` picks up its result, running `on_success` / `on_error` on
/// the caller's thread.
pub struct Mutation<I, O> {
  state: MutationState<O>,
  mutator: Mutator<I, O>,
  on_success: Option<SuccessCallback<I, O>>,
  on_error: Option<ErrorCallback<I>>,
  pending: Option<(I, mpsc::UnboundedReceiver<Result<O, QueryError>>)>,
}

impl<I, O> Mutation<I, O>
where
  I: Clone + Send + 'static,
  O: Send + 'static,
{
  pub fn new<F, Fut>(mutator: F) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, QueryError>> + Send + 'static,
  {
    Self {
      state: MutationState::Idle,
      mutator: Box::new(move |input| mutator(input).boxed()),
      on_success: None,
      on_error: None,
      pending: None,
    }
  }

  pub fn on_success(mut self, callback: impl FnMut(&O, &I) + Send + 'static) -> Self {
    self.on_success = Some(Box::new(callback));
    self
  }

  pub fn on_error(mut self, callback: impl FnMut(&QueryError, &I) + Send + 'static) -> Self {
    self.on_error = Some(Box::new(callback));
    self
  }

  pub fn state(&self) -> &MutationState<O> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn is_success(&self) -> bool {
    matches!(self.state, MutationState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self.state, MutationState::Error(_))
  }

  pub fn data(&self) -> Option<&O> {
    match &self.state {
      MutationState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&QueryError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Input of the mutation currently running
  pub fn pending_input(&self) -> Option<&I> {
    self.pending.as_ref().map(|(input, _)| input)
  }

  /// Run the mutation. A result still pending from an earlier call is dropped.
  pub fn mutate(&mut self, input: I) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.state = MutationState::Pending;

    let future = (self.mutator)(input.clone());
    self.pending = Some((input, rx));
    tokio::spawn(async move {
      let result = future.await;
      // Receiver may be gone if the view closed
      let _ = tx.send(result);
    });
  }

  /// Back to `Idle`, forgetting the last result.
  pub fn reset(&mut self) {
    self.pending = None;
    self.state = MutationState::Idle;
  }

  /// Poll for the result of a pending mutation.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let result = match &mut self.pending {
      Some((_, rx)) => match rx.try_recv() {
        Ok(result) => result,
        Err(mpsc::error::TryRecvError::Empty) => return false,
        Err(mpsc::error::TryRecvError::Disconnected) => Err(QueryError::Cancelled),
      },
      None => return false,
    };
    let Some((input, _)) = self.pending.take() else {
      return false;
    };

    match result {
      Ok(data) => {
        if let Some(callback) = self.on_success.as_mut() {
          callback(&data, &input);
        }
        self.state = MutationState::Success(data);
      }
      Err(error) => {
        if let Some(callback) = self.on_error.as_mut() {
          callback(&error, &input);
        }
        self.state = MutationState::Error(error);
      }
    }
    true
  }
}

impl<I, O: std::fmt::Debug> std::fmt::Debug for Mutation<I, O> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
