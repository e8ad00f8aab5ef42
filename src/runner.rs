use std::sync::Arc;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
  action::Action,
  engine::{FetchOutcome, FetchRequest, MutationKind, MutationOutcome, MutationRequest},
  error::GatewayError,
  gateway::Gateway,
};

/// Runs gateway calls as tokio tasks and reports each result back as an [`Action`].
///
/// Reads share one slot: starting a fetch cancels the previous one. Mutations run independently.
pub struct TaskRunner {
  gateway: Arc<dyn Gateway>,
  tx: UnboundedSender<Action>,
  fetch_token: Option<CancellationToken>,
}

fn send(tx: &UnboundedSender<Action>, action: Action) {
  if let Err(e) = tx.send(action) {
    debug!("action loop closed, dropping {}", e.0);
  }
}

/// Sends one create, update or delete to the backend.
pub async fn execute(gateway: &dyn Gateway, request: &MutationRequest) -> Result<(), GatewayError> {
  let table = request.table_name.as_str();
  match &request.kind {
    MutationKind::Create { values } => gateway.create(table, values).await,
    MutationKind::Update { pk, values } => gateway.update(table, pk, values).await,
    MutationKind::Delete { pk } => gateway.delete(table, pk).await,
  }
}

impl TaskRunner {
  pub fn new(gateway: Arc<dyn Gateway>, tx: UnboundedSender<Action>) -> Self {
    Self { gateway, tx, fetch_token: None }
  }

  pub fn load_schemas(&self) -> JoinHandle<()> {
    let gateway = self.gateway.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = gateway.tables().await;
      send(&tx, Action::SchemasLoaded(result));
    })
  }

  pub fn fetch(&mut self, request: FetchRequest) -> JoinHandle<()> {
    self.cancel_fetch();
    let token = CancellationToken::new();
    self.fetch_token = Some(token.clone());

    let gateway = self.gateway.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      tokio::select! {
        _ = token.cancelled() => {
          debug!(epoch = request.epoch, "fetch cancelled");
        },
        result = gateway.list(&request.query, request.limit) => {
          send(&tx, Action::RowsLoaded(FetchOutcome::new(&request, result)));
        },
      }
    })
  }

  pub fn cancel_fetch(&mut self) {
    if let Some(token) = self.fetch_token.take() {
      token.cancel();
    }
  }

  pub fn mutate(&self, request: MutationRequest) -> JoinHandle<()> {
    let gateway = self.gateway.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      debug!(table = %request.table_name, op = %request.op(), "mutation started");
      let result = execute(gateway.as_ref(), &request).await;
      send(&tx, Action::MutationCompleted(MutationOutcome::new(&request, result)));
    })
  }
}
