// Display session - single task owning the reconciler, driven by a command queue
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::StreamExt;

use crate::application::reconciler::{CommitTicket, DisplayReconciler, DisplaySnapshot, NavKey};
use crate::application::splitflap_api::{ApiResult, SplitflapApi};
use crate::domain::display_state::DisplayState;
use crate::domain::error::PanelError;
use crate::domain::translation::TranslationMap;

type Reply<T> = oneshot::Sender<ApiResult<T>>;

pub enum SessionCommand {
    Push(DisplayState),
    Input {
        index: usize,
        text: String,
        reply: Reply<DisplaySnapshot>,
    },
    Navigate {
        index: usize,
        key: NavKey,
        reply: Reply<DisplaySnapshot>,
    },
    /// Answered once the server has accepted or rejected the text
    Commit { reply: Reply<DisplaySnapshot> },
    Discard { reply: Reply<DisplaySnapshot> },
    Clear { reply: Reply<()> },
    Snapshot { reply: Reply<DisplaySnapshot> },
    ReplaceTranslations {
        translations: TranslationMap,
        reply: Reply<DisplaySnapshot>,
    },
}

struct CommitDone {
    ticket: CommitTicket,
    result: ApiResult<()>,
    reply: Reply<DisplaySnapshot>,
}

pub struct DisplaySession {
    reconciler: DisplayReconciler,
    api: Arc<dyn SplitflapApi>,
    commands: mpsc::Receiver<SessionCommand>,
    done_tx: mpsc::Sender<CommitDone>,
    done_rx: mpsc::Receiver<CommitDone>,
}

impl DisplaySession {
    /// Spawn the session task and return the handle used to talk to it
    pub fn spawn(reconciler: DisplayReconciler, api: Arc<dyn SplitflapApi>) -> DisplaySessionHandle {
        let (tx, commands) = mpsc::channel(64);
        let (done_tx, done_rx) = mpsc::channel(4);
        let session = Self {
            reconciler,
            api,
            commands,
            done_tx,
            done_rx,
        };
        tokio::spawn(session.run());
        DisplaySessionHandle { tx }
    }

    async fn run(mut self) {
        tracing::info!("Display session started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(done) = self.done_rx.recv() => {
                    let result = self
                        .reconciler
                        .complete_commit(&done.ticket, done.result)
                        .map(|_| self.reconciler.snapshot());
                    let _ = done.reply.send(result);
                }
            }
        }
        tracing::info!("Display session stopped");
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Push(state) => self.reconciler.apply_push(state),
            SessionCommand::Input { index, text, reply } => {
                let result = self
                    .reconciler
                    .input(index, &text)
                    .map(|_| self.reconciler.snapshot());
                let _ = reply.send(result);
            }
            SessionCommand::Navigate { index, key, reply } => {
                let result = self
                    .reconciler
                    .navigate(index, key)
                    .map(|_| self.reconciler.snapshot());
                let _ = reply.send(result);
            }
            SessionCommand::Commit { reply } => match self.reconciler.begin_commit() {
                Ok(ticket) => self.send_commit(ticket, reply),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            SessionCommand::Discard { reply } => {
                self.reconciler.discard();
                let _ = reply.send(Ok(self.reconciler.snapshot()));
            }
            SessionCommand::Clear { reply } => {
                let api = self.api.clone();
                tokio::spawn(async move {
                    let result = api.clear_display().await;
                    if let Err(e) = &result {
                        tracing::warn!("Clearing the display failed: {}", e);
                    }
                    let _ = reply.send(result);
                });
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(Ok(self.reconciler.snapshot()));
            }
            SessionCommand::ReplaceTranslations { translations, reply } => {
                self.reconciler.replace_translations(translations);
                let _ = reply.send(Ok(self.reconciler.snapshot()));
            }
        }
    }

    // The request runs off-task so pushes and edits keep flowing while it is out
    fn send_commit(&self, ticket: CommitTicket, reply: Reply<DisplaySnapshot>) {
        tracing::debug!("Sending commit {} ({} chars)", ticket.token, ticket.text.chars().count());
        let api = self.api.clone();
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = api.update_display(&ticket.text).await;
            let _ = done_tx.send(CommitDone { ticket, result, reply }).await;
        });
    }
}

#[derive(Clone)]
pub struct DisplaySessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl DisplaySessionHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> SessionCommand) -> ApiResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| PanelError::Network("display session has stopped".to_string()))?;
        rx.await
            .map_err(|_| PanelError::Network("display session dropped the request".to_string()))?
    }

    pub async fn push(&self, state: DisplayState) -> ApiResult<()> {
        self.tx
            .send(SessionCommand::Push(state))
            .await
            .map_err(|_| PanelError::Network("display session has stopped".to_string()))
    }

    pub async fn input(&self, index: usize, text: impl Into<String>) -> ApiResult<DisplaySnapshot> {
        let text = text.into();
        self.request(|reply| SessionCommand::Input { index, text, reply }).await
    }

    pub async fn navigate(&self, index: usize, key: NavKey) -> ApiResult<DisplaySnapshot> {
        self.request(|reply| SessionCommand::Navigate { index, key, reply }).await
    }

    pub async fn commit(&self) -> ApiResult<DisplaySnapshot> {
        self.request(|reply| SessionCommand::Commit { reply }).await
    }

    pub async fn discard(&self) -> ApiResult<DisplaySnapshot> {
        self.request(|reply| SessionCommand::Discard { reply }).await
    }

    pub async fn clear(&self) -> ApiResult<()> {
        self.request(|reply| SessionCommand::Clear { reply }).await
    }

    pub async fn snapshot(&self) -> ApiResult<DisplaySnapshot> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    pub async fn replace_translations(&self, translations: TranslationMap) -> ApiResult<DisplaySnapshot> {
        self.request(|reply| SessionCommand::ReplaceTranslations { translations, reply })
            .await
    }

    /// Feed every server push into the session until either side goes away.
    /// Lagged receivers skip ahead; every push is a full state so nothing is lost.
    pub async fn forward_pushes(self, pushes: broadcast::Receiver<DisplayState>) {
        let mut stream = BroadcastStream::new(pushes);
        while let Some(item) = stream.next().await {
            match item {
                Ok(state) => {
                    if self.push(state).await.is_err() {
                        break;
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::debug!("Display push subscriber lagged, skipped {} messages", skipped);
                }
            }
        }
        tracing::debug!("Stopped forwarding display pushes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::splitflap_api::testing::FakeApi;
    use crate::domain::alphabet::Alphabet;
    use crate::domain::geometry::Grid;
    use tokio::sync::Notify;

    fn fake(pairs: &[(char, char)]) -> FakeApi {
        FakeApi::new(
            Grid::new(4, 1).unwrap(),
            Alphabet::from_chars("ABC~".chars()),
            TranslationMap::from_pairs(pairs.iter().copied()),
        )
    }

    fn session(api: Arc<FakeApi>) -> DisplaySessionHandle {
        let reconciler = DisplayReconciler::new(api.grid, api.alphabet.clone(), api.translations.lock().unwrap().clone());
        DisplaySession::spawn(reconciler, api)
    }

    fn push(text: &str) -> DisplayState {
        DisplayState {
            active_dashboard: "main".to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_push_then_edit_then_commit() {
        let api = Arc::new(fake(&[('@', '~')]));
        let handle = session(api.clone());

        handle.push(push("ABCA")).await.unwrap();
        let snapshot = handle.input(1, "@").await.unwrap();
        assert_eq!(snapshot.cells, "A@CA");
        assert_eq!(snapshot.edited, vec![1]);

        let snapshot = handle.commit().await.unwrap();
        assert!(snapshot.edited.is_empty());
        assert!(!snapshot.commit_in_flight);
        assert_eq!(api.updates.lock().unwrap().as_slice(), ["A~CA".to_string()]);
    }

    #[tokio::test]
    async fn test_push_does_not_clobber_edits() {
        let api = Arc::new(fake(&[]));
        let handle = session(api);

        handle.push(push("AAAA")).await.unwrap();
        handle.input(0, "C").await.unwrap();
        handle.push(push("BBBB")).await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.cells, "CBBB");
        assert_eq!(snapshot.active_dashboard, "main");
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_edits() {
        let api = Arc::new(fake(&[]));
        *api.fail_updates.lock().unwrap() = Some(PanelError::Network("offline".to_string()));
        let handle = session(api.clone());

        handle.input(2, "B").await.unwrap();
        let err = handle.commit().await.unwrap_err();
        assert!(matches!(err, PanelError::Network(_)));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.edited, vec![2]);
        assert_eq!(snapshot.cells, "  B ");
        assert!(!snapshot.commit_in_flight);
        assert!(api.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_commit_while_in_flight_conflicts() {
        let gate = Arc::new(Notify::new());
        let mut api = fake(&[]);
        api.update_gate = Some(gate.clone());
        let api = Arc::new(api);
        let handle = session(api.clone());

        handle.input(0, "A").await.unwrap();
        let first = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.commit().await })
        };

        // wait until the session has handed out the first ticket
        loop {
            if handle.snapshot().await.unwrap().commit_in_flight {
                break;
            }
            tokio::task::yield_now().await;
        }

        let err = handle.commit().await.unwrap_err();
        assert!(matches!(err, PanelError::Conflict(_)));

        // the session keeps serving while the request is out
        handle.push(push("BBBB")).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().cells, "ABBB");

        gate.notify_one();
        let snapshot = first.await.unwrap().unwrap();
        assert!(!snapshot.commit_in_flight);
        assert_eq!(api.updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_discard_restores_server_text() {
        let api = Arc::new(fake(&[]));
        let handle = session(api);

        handle.push(push("ABCA")).await.unwrap();
        handle.input(0, "C").await.unwrap();
        let snapshot = handle.discard().await.unwrap();
        assert_eq!(snapshot.cells, "ABCA");
        assert!(snapshot.edited.is_empty());
        assert!(snapshot.changed.is_empty());
    }

    #[tokio::test]
    async fn test_clear_passes_through() {
        let api = Arc::new(fake(&[]));
        let handle = session(api.clone());
        handle.clear().await.unwrap();
        assert_eq!(*api.clears.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_forward_pushes_from_broadcast() {
        let api = Arc::new(fake(&[]));
        let handle = session(api);
        let (tx, rx) = broadcast::channel(8);
        let forwarder = tokio::spawn(handle.clone().forward_pushes(rx));

        tx.send(push("CCCC")).unwrap();
        drop(tx);
        forwarder.await.unwrap();

        assert_eq!(handle.snapshot().await.unwrap().cells, "CCCC");
    }

    #[tokio::test]
    async fn test_replace_translations_rederives_cells() {
        let api = Arc::new(fake(&[]));
        let handle = session(api);

        handle.push(push("~AAA")).await.unwrap();
        let snapshot = handle
            .replace_translations(TranslationMap::from_pairs([('@', '~')]))
            .await
            .unwrap();
        assert_eq!(snapshot.cells, "@AAA");
    }
}
