// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-account client runtime (C3 scheduler + C12 lifecycle), grounded on
//! the teacher's pervasive `CancellationToken`-rooted task trees
//! (`MuxState::shutdown`, per-session `cancel` tokens) generalized to one
//! dedicated OS thread + `tokio::runtime::Builder::new_current_thread()`
//! runtime per Client, per spec §9's re-architecture note.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::{AccountConfig, ClientConfig};
use crate::connection::{Connection, EndpointProvider};
use crate::datafile::{DataFile, Prefix};
use crate::dispatch::Dispatcher;
use crate::error::{ClientError, Result};
use crate::login::LastMessageSent;
use crate::messageboard::Messageboard;
use crate::module::{Module, ModuleFactory};
use crate::unified::UnifiedClient;
use crate::whiteboard::Whiteboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitMode {
    None,
    Quit,
    Restart,
}

/// Cheap, cloneable handle passed to every module. Owns no data itself;
/// every field is a shared pointer into state owned by the [`Client`] that
/// constructed it. Not `Send` — a handle never crosses the owning Client's
/// thread, matching the "no raw pointer across suspension points, but
/// still single-threaded" constraint from spec §4.7.
#[derive(Clone)]
pub struct ClientHandle {
    pub account: Rc<AccountConfig>,
    pub config: Rc<ClientConfig>,
    pub whiteboard: Rc<RefCell<Whiteboard>>,
    pub messageboard: Rc<RefCell<Messageboard>>,
    pub connection: Rc<Connection>,
    pub account_datafile: Rc<DataFile>,
    pub shared_datafile: Arc<DataFile>,
    pub unified: Rc<UnifiedClient>,
    pub ui: Arc<dyn crate::ui::Ui>,
    pub http: Arc<dyn crate::web::HttpClient>,
    pub cancel: CancellationToken,
    quit_mode: Rc<Cell<QuitMode>>,
}

impl ClientHandle {
    /// Requests that the Client stop. `Quit` ends the account for good;
    /// `Restart` causes `Client::launch`'s loop to reconstruct the Client
    /// after a back-off delay.
    pub fn quit(&self, mode: QuitMode) {
        self.quit_mode.set(mode);
        self.cancel.cancel();
    }

    pub fn quit_mode_snapshot(&self) -> QuitMode {
        self.quit_mode.get()
    }

    /// The one path every module sends outbound traffic through. Besides
    /// writing the packet, it stamps `LastMessageSent` on the Whiteboard so
    /// the heartbeat module's inactivity timer (§4.11) debounces against
    /// *any* outbound traffic, not just its own heartbeats.
    pub async fn send_packet(&self, bytes: Vec<u8>) -> Result<()> {
        self.connection.write_packet(bytes).await?;
        self.whiteboard
            .borrow_mut()
            .set(LastMessageSent(tokio::time::Instant::now()));
        Ok(())
    }

    /// Starts a task on this Client's scheduler. Must be called from
    /// inside the owning Client's `LocalSet`.
    pub fn launch_task<F>(&self, name: &'static str, fut: F)
    where
        F: std::future::Future<Output = Result<()>> + 'static,
    {
        let cancel = self.cancel.child_token();
        tokio::task::spawn_local(async move {
            match fut.await {
                Ok(()) => {}
                Err(ClientError::Cancelled) => {
                    tracing::debug!(task = name, "task cancelled");
                }
                Err(e) => {
                    tracing::error!(task = name, err = %e, "task ended with error");
                }
            }
            drop(cancel);
        });
    }
}

/// Owns every piece of per-account state. Constructed once per login
/// attempt; a fresh `Client` is built on restart.
pub struct Client {
    pub handle: ClientHandle,
    pub endpoint_provider: Arc<dyn EndpointProvider>,
    modules: Vec<Box<dyn Module>>,
}

impl Client {
    fn construct(
        account: AccountConfig,
        config: ClientConfig,
        shared_datafile: Arc<DataFile>,
        endpoint_provider: Arc<dyn EndpointProvider>,
        ui: Arc<dyn crate::ui::Ui>,
        http: Arc<dyn crate::web::HttpClient>,
        factories: &[Box<dyn ModuleFactory>],
    ) -> Self {
        let account_datafile = Rc::new(DataFile::open(
            &config.state_dir,
            Prefix::Account,
            &account.account_name,
        ));
        let handle = ClientHandle {
            account: Rc::new(account),
            config: Rc::new(config),
            whiteboard: Rc::new(RefCell::new(Whiteboard::new())),
            messageboard: Rc::new(RefCell::new(Messageboard::new())),
            connection: Rc::new(Connection::new()),
            account_datafile,
            shared_datafile,
            unified: Rc::new(UnifiedClient::new()),
            ui,
            http,
            cancel: CancellationToken::new(),
            quit_mode: Rc::new(Cell::new(QuitMode::None)),
        };
        let modules = factories.iter().map(|f| f.build()).collect();
        Self {
            handle,
            endpoint_provider,
            modules,
        }
    }

    /// Runs `init` on every module, connects the transport, then launches
    /// each `run` as a task alongside the inbound dispatch loop, then blocks
    /// until every task has ended or the Client is cancelled. Returns the
    /// requested quit mode.
    ///
    /// The connect happens here, awaited, before any module task starts:
    /// `LoginModule::run`'s first act is to send `ClientLogon` over
    /// `self.handle.connection`, so the socket must already be
    /// `Status::Connected` by the time modules are spawned (§6.2, §4.6).
    async fn run_to_completion(mut self) -> QuitMode {
        for module in self.modules.iter_mut() {
            if let Err(e) = module.init(&self.handle).await {
                tracing::error!(module = module.name(), err = %e, "module init failed");
            }
        }

        if let Err(e) = self
            .handle
            .connection
            .connect(&*self.endpoint_provider)
            .await
        {
            tracing::error!(err = %e, "initial connect failed");
            self.handle.quit(QuitMode::Restart);
            return self.handle.quit_mode.get();
        }

        let mut join_set = tokio::task::JoinSet::new();

        let dispatcher = Rc::new(Dispatcher::with_defaults());
        let dispatch_handle = self.handle.clone();
        join_set.spawn_local(async move {
            loop {
                let body = tokio::select! {
                    _ = dispatch_handle.cancel.cancelled() => return,
                    result = dispatch_handle.connection.read_packet() => match result {
                        Ok(body) => body,
                        Err(e) => {
                            tracing::error!(err = %e, "read_packet failed; restarting client");
                            dispatch_handle.quit(QuitMode::Restart);
                            return;
                        }
                    },
                };
                if body.is_empty() {
                    tracing::info!("connection reached EOF; restarting client");
                    dispatch_handle.quit(QuitMode::Restart);
                    return;
                }
                if let Err(e) = dispatcher
                    .process_packet(&body, &dispatch_handle.messageboard, &dispatch_handle.unified)
                    .await
                {
                    tracing::error!(err = %e, "failed to process inbound packet");
                }
            }
        });

        for mut module in self.modules.into_iter() {
            let handle = self.handle.clone();
            join_set.spawn_local(async move {
                let name = module.name();
                match module.run(handle).await {
                    Ok(()) => {}
                    Err(ClientError::Cancelled) => {
                        tracing::debug!(module = name, "module run cancelled");
                    }
                    Err(e) => {
                        tracing::error!(module = name, err = %e, "module run failed");
                    }
                }
            });
        }

        while join_set.join_next().await.is_some() {}
        self.handle.connection.close().await;
        self.handle.quit_mode.get()
    }
}

/// Tracks which accounts currently have an active Client, and exposes the
/// Executor bridge for cross-Client commands (§4.3, §6.4).
pub struct ClientInfo {
    pub account_name: String,
    job_tx: mpsc::UnboundedSender<Job>,
    cancel: CancellationToken,
}

type Job = Box<dyn FnOnce(&ClientHandle) + Send>;

pub enum ExecOutcome {
    Run,
    Killed,
}

impl ClientInfo {
    /// Submits a closure to run on this Client's scheduler thread,
    /// blocking the caller until it completes or the Client is cancelled
    /// first.
    pub async fn execute<F>(&self, job: F) -> ExecOutcome
    where
        F: FnOnce(&ClientHandle) + Send + 'static,
    {
        let (ack_tx, ack_rx) = oneshot::channel();
        let wrapped: Job = Box::new(move |handle| {
            job(handle);
            let _ = ack_tx.send(());
        });
        if self.job_tx.send(wrapped).is_err() {
            return ExecOutcome::Killed;
        }
        tokio::select! {
            _ = ack_rx => ExecOutcome::Run,
            _ = self.cancel.cancelled() => ExecOutcome::Killed,
        }
    }

    pub fn quit(&self) {
        self.cancel.cancel();
    }
}

struct Registry {
    clients: HashMap<String, Arc<ClientInfo>>,
}

static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();

fn registry() -> &'static Mutex<Registry> {
    REGISTRY.get_or_init(|| {
        Mutex::new(Registry {
            clients: HashMap::new(),
        })
    })
}

/// `ClientInfo::find` from spec §6.4.
pub fn find(account_name: &str) -> Option<Arc<ClientInfo>> {
    registry()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .clients
        .get(account_name)
        .cloned()
}

pub fn get_clients() -> Vec<Arc<ClientInfo>> {
    registry()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .clients
        .values()
        .cloned()
        .collect()
}

static ACCOUNT_IDS: OnceLock<Mutex<HashMap<u32, String>>> = OnceLock::new();

fn account_ids() -> &'static Mutex<HashMap<u32, String>> {
    ACCOUNT_IDS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Records `account_name`'s 32-bit SteamID account number as belonging to
/// this process, so AutoAccept's "only accept from partners we also
/// manage" check (§4.14) can recognize a trade partner as co-managed.
pub fn note_account_id(account_id: u32, account_name: &str) {
    account_ids()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .insert(account_id, account_name.to_string());
}

pub fn is_known_account_id(account_id: u32) -> bool {
    account_ids()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .contains_key(&account_id)
}

fn deactivate(account_name: &str) {
    registry()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .clients
        .remove(account_name);
}

/// `Client::launch` (§4.12). Rejects if this account already has an active
/// Client. Spawns a dedicated OS thread running a single-threaded tokio
/// runtime; the returned future resolves once the new Client's modules
/// have been constructed, initialized, and had their `run` tasks launched
/// — matching "set status = Ready and notify; the launching thread
/// returns" (step 4).
pub async fn launch(
    account: AccountConfig,
    config: ClientConfig,
    shared_datafile: Arc<DataFile>,
    endpoint_provider: Arc<dyn EndpointProvider>,
    ui: Arc<dyn crate::ui::Ui>,
    http: Arc<dyn crate::web::HttpClient>,
    factories: Vec<Box<dyn ModuleFactory>>,
) -> Result<Arc<ClientInfo>> {
    let account_name = account.account_name.clone();
    {
        let guard = registry().lock().unwrap_or_else(|p| p.into_inner());
        if guard.clients.contains_key(&account_name) {
            return Err(ClientError::Transport(format!(
                "account {account_name} already has an active client"
            )));
        }
    }

    let (job_tx, mut job_rx) = mpsc::unbounded_channel::<Job>();
    let root_cancel = CancellationToken::new();
    let info = Arc::new(ClientInfo {
        account_name: account_name.clone(),
        job_tx,
        cancel: root_cancel.clone(),
    });
    registry()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .clients
        .insert(account_name.clone(), info.clone());

    let (ready_tx, ready_rx) = oneshot::channel::<()>();
    let thread_account_name = account_name.clone();

    std::thread::Builder::new()
        .name(format!("steamcore-{account_name}"))
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!(err = %e, "failed to build client runtime");
                    return;
                }
            };
            let local = tokio::task::LocalSet::new();
            local.block_on(&rt, async move {
                let mut ready_tx = Some(ready_tx);
                let mut current_account = account;
                loop {
                    let client = Client::construct(
                        current_account.clone(),
                        config.clone(),
                        shared_datafile.clone(),
                        endpoint_provider.clone(),
                        ui.clone(),
                        http.clone(),
                        &factories,
                    );
                    let handle = client.handle.clone();
                    let cancel_for_jobs = handle.cancel.clone();

                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }

                    let job_loop = {
                        let handle = handle.clone();
                        async move {
                            while let Some(job) = job_rx.recv().await {
                                job(&handle);
                            }
                        }
                    };

                    let run_fut = client.run_to_completion();
                    tokio::task::spawn_local(job_loop);
                    let quit_mode = tokio::select! {
                        mode = run_fut => mode,
                        _ = cancel_for_jobs.cancelled() => {
                            match handle.quit_mode_snapshot() {
                                QuitMode::None => QuitMode::Quit,
                                mode => mode,
                            }
                        }
                    };

                    match quit_mode {
                        QuitMode::Restart => {
                            tracing::info!(account = %thread_account_name, "restarting after back-off");
                            tokio::time::sleep(config.restart_backoff()).await;
                            continue;
                        }
                        QuitMode::Quit | QuitMode::None => break,
                    }
                }
                deactivate(&thread_account_name);
                root_cancel.cancel();
            });
        })
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    ready_rx
        .await
        .map_err(|_| ClientError::Transport("client thread exited before becoming ready".into()))?;
    Ok(info)
}

/// Blocks the caller until every active Client has deactivated.
pub async fn wait_all() {
    loop {
        let any_active = !registry()
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clients
            .is_empty();
        if !any_active {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
