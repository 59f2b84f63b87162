//! The check-in workflow: one task owning all kiosk state.
//!
//! User commands, debounce timers, lookup and submit results, roster polls and
//! notification expiries all arrive as messages on a single queue, so state is
//! only ever touched from the actor task. Renderers observe [`CheckInView`]
//! snapshots through a `watch` channel.

use shared::{AttendanceRecord, CheckInRequest, CheckInResponse, LookupUserResponse, Ministry, MinistryListResponse};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CheckInConfig;
use crate::hooks::{Debouncer, PeriodicRefresh, PeriodicRefreshConfig};
use crate::services::api::{ApiError, AttendanceApi};
use crate::state::{
    CheckInForm, FormFieldError, LookupOutcome, Mode, ModeController, NameQuery, Notification, NotificationKind,
    NotificationSlot, RosterRow, RosterState,
};

const COMPONENT: &str = "check-in-workflow";
const GENERIC_FAILURE: &str = "Check-in failed. Please try again.";

/// Input accepted from the kiosk surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowCommand {
    SetFirstName(String),
    SetLastName(String),
    SetEmail(String),
    SetPhone(String),
    SelectMinistry(Option<String>),
    Submit,
    /// Clear the form and return to search
    Reset,
    GoToPage(usize),
    NextPage,
    PreviousPage,
    DismissNotification,
    RefreshRoster,
}

enum Message {
    Command(WorkflowCommand),
    DebounceElapsed {
        generation: u64,
    },
    LookupSettled {
        seq: u64,
        query: NameQuery,
        result: Result<LookupUserResponse, ApiError>,
    },
    SubmitSettled {
        result: Result<CheckInResponse, ApiError>,
    },
    RosterLoaded(Result<Vec<AttendanceRecord>, ApiError>),
    MinistriesLoaded(Result<MinistryListResponse, ApiError>),
    NotificationExpired(u64),
}

/// Everything a renderer needs, published after each state change
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckInView {
    pub form: CheckInForm,
    pub mode: Mode,
    pub field_errors: Vec<FormFieldError>,
    pub can_submit: bool,
    pub is_submitting: bool,
    pub roster_rows: Vec<RosterRow>,
    pub roster_page: usize,
    pub roster_page_count: usize,
    pub roster_total: usize,
    pub notification: Option<Notification>,
    pub ministries: Vec<Ministry>,
}

/// Handle to a running workflow. Dropping it stops all background work.
pub struct CheckInWorkflow {
    tx: mpsc::UnboundedSender<Message>,
    view_rx: watch::Receiver<CheckInView>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CheckInWorkflow {
    pub fn spawn(api: Arc<dyn AttendanceApi>, config: CheckInConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(CheckInView::default());
        let shutdown = CancellationToken::new();

        let actor = WorkflowActor::new(api, config, tx.clone(), view_tx, shutdown.clone());
        let task = tokio::spawn(actor.run(rx));

        Self {
            tx,
            view_rx,
            shutdown,
            task: Some(task),
        }
    }

    /// Queue a command; returns `false` once the workflow has stopped
    pub fn send(&self, command: WorkflowCommand) -> bool {
        self.tx.send(Message::Command(command)).is_ok()
    }

    pub fn set_first_name(&self, value: impl Into<String>) -> bool {
        self.send(WorkflowCommand::SetFirstName(value.into()))
    }

    pub fn set_last_name(&self, value: impl Into<String>) -> bool {
        self.send(WorkflowCommand::SetLastName(value.into()))
    }

    pub fn set_email(&self, value: impl Into<String>) -> bool {
        self.send(WorkflowCommand::SetEmail(value.into()))
    }

    pub fn submit(&self) -> bool {
        self.send(WorkflowCommand::Submit)
    }

    /// Latest published snapshot
    pub fn view(&self) -> CheckInView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CheckInView> {
        self.view_rx.clone()
    }

    /// Cancel timers and in-flight calls, then wait for the actor to exit
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(component = COMPONENT, "Workflow task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for CheckInWorkflow {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct WorkflowActor {
    api: Arc<dyn AttendanceApi>,
    config: CheckInConfig,
    tx: mpsc::UnboundedSender<Message>,
    view_tx: watch::Sender<CheckInView>,
    shutdown: CancellationToken,

    form: CheckInForm,
    controller: ModeController,
    roster: RosterState,
    notifications: NotificationSlot,
    ministries: Vec<Ministry>,

    debouncer: Debouncer,
    debounce_generation: u64,
    lookup_token: Option<CancellationToken>,
    is_submitting: bool,
    /// Set by a blocked submit so every invalid field is flagged, not only filled ones
    show_all_errors: bool,
}

impl WorkflowActor {
    fn new(
        api: Arc<dyn AttendanceApi>,
        config: CheckInConfig,
        tx: mpsc::UnboundedSender<Message>,
        view_tx: watch::Sender<CheckInView>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce, &shutdown),
            roster: RosterState::new(config.roster_page_size),
            api,
            config,
            tx,
            view_tx,
            shutdown,
            form: CheckInForm::default(),
            controller: ModeController::new(),
            notifications: NotificationSlot::new(),
            ministries: Vec::new(),
            debounce_generation: 0,
            lookup_token: None,
            is_submitting: false,
            show_all_errors: false,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        info!(component = COMPONENT, "🚀 Check-in workflow started (api: {})", self.config.api_base_url);

        self.load_ministries();

        let poll_tx = self.tx.clone();
        let _poller = PeriodicRefresh::start(
            PeriodicRefreshConfig {
                interval: self.config.roster_poll_interval,
                initial_delay: None,
            },
            &self.shutdown,
            move || {
                let _ = poll_tx.send(Message::Command(WorkflowCommand::RefreshRoster));
            },
        );

        self.publish();

        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                message = rx.recv() => match message {
                    Some(message) => {
                        self.handle(message);
                        self.publish();
                    }
                    None => break,
                },
            }
        }

        self.debouncer.cancel();
        self.cancel_lookup();
        info!(component = COMPONENT, "Check-in workflow stopped");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Command(command) => self.handle_command(command),
            Message::DebounceElapsed { generation } => self.on_debounce_elapsed(generation),
            Message::LookupSettled { seq, query, result } => self.on_lookup_settled(seq, query, result),
            Message::SubmitSettled { result } => self.on_submit_settled(result),
            Message::RosterLoaded(result) => self.on_roster_loaded(result),
            Message::MinistriesLoaded(result) => self.on_ministries_loaded(result),
            Message::NotificationExpired(id) => {
                if self.notifications.expire(id) {
                    debug!(component = COMPONENT, "Notification {} expired", id);
                }
            }
        }
    }

    fn handle_command(&mut self, command: WorkflowCommand) {
        match command {
            WorkflowCommand::SetFirstName(value) => {
                if self.form.first_name != value {
                    self.form.first_name = value;
                    self.on_name_edited();
                }
            }
            WorkflowCommand::SetLastName(value) => {
                if self.form.last_name != value {
                    self.form.last_name = value;
                    self.on_name_edited();
                }
            }
            WorkflowCommand::SetEmail(value) => self.form.email = value,
            WorkflowCommand::SetPhone(value) => self.form.phone = value,
            WorkflowCommand::SelectMinistry(id) => self.form.ministry_id = id,
            WorkflowCommand::Submit => self.submit(),
            WorkflowCommand::Reset => {
                info!(component = COMPONENT, "Form reset");
                self.reset_form();
            }
            WorkflowCommand::GoToPage(page) => {
                self.roster.set_page(page);
            }
            WorkflowCommand::NextPage => {
                self.roster.next_page();
            }
            WorkflowCommand::PreviousPage => {
                self.roster.previous_page();
            }
            WorkflowCommand::DismissNotification => self.notifications.dismiss(),
            WorkflowCommand::RefreshRoster => self.refresh_roster(),
        }
    }

    fn on_name_edited(&mut self) {
        self.cancel_lookup();
        self.controller.name_edited();
        self.debounce_generation += 1;

        if self.form.name_query().is_resolvable(self.config.min_name_length) {
            let generation = self.debounce_generation;
            let tx = self.tx.clone();
            self.debouncer.schedule(move || {
                let _ = tx.send(Message::DebounceElapsed { generation });
            });
        } else {
            self.debouncer.cancel();
        }
    }

    fn on_debounce_elapsed(&mut self, generation: u64) {
        if generation != self.debounce_generation {
            return;
        }

        let query = self.form.name_query();
        if !query.is_resolvable(self.config.min_name_length) {
            return;
        }

        let seq = self.controller.begin_lookup();
        debug!(component = COMPONENT, "🔍 Looking up {} (lookup {})", query.display_name(), seq);

        let token = self.shutdown.child_token();
        self.lookup_token = Some(token.clone());

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let first_name = query.first_name.trim().to_string();
            let last_name = query.last_name.trim().to_string();
            tokio::select! {
                _ = token.cancelled() => {}
                result = api.lookup_user(&first_name, &last_name) => {
                    let _ = tx.send(Message::LookupSettled { seq, query, result });
                }
            }
        });
    }

    fn on_lookup_settled(&mut self, seq: u64, query: NameQuery, result: Result<LookupUserResponse, ApiError>) {
        let outcome = LookupOutcome::from_response(result);
        if let Some(notice) = self.controller.apply_lookup(seq, outcome, &query) {
            self.lookup_token = None;
            self.notify(notice.kind, notice.message);
        }
    }

    fn submit(&mut self) {
        if self.is_submitting {
            debug!(component = COMPONENT, "Submit ignored; a check-in is already in flight");
            return;
        }

        let mode = self.controller.mode().clone();
        if !mode.allows_submit() {
            debug!(component = COMPONENT, "Submit ignored in {} mode", mode.label());
            return;
        }

        let validation = self.form.validate(&mode, self.config.min_name_length);
        if !validation.is_valid {
            debug!(component = COMPONENT, "Submit blocked by {} field error(s)", validation.errors.len());
            self.show_all_errors = true;
            return;
        }

        let Some(request) = self.form.to_request(&mode) else {
            return;
        };

        info!(
            component = COMPONENT,
            "📝 Submitting check-in for {} {} ({})",
            request.first_name,
            request.last_name,
            mode.label()
        );
        self.is_submitting = true;
        self.spawn_check_in(request);
    }

    fn spawn_check_in(&self, request: CheckInRequest) {
        let token = self.shutdown.child_token();
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = api.check_in(&request) => {
                    let _ = tx.send(Message::SubmitSettled { result });
                }
            }
        });
    }

    fn on_submit_settled(&mut self, result: Result<CheckInResponse, ApiError>) {
        self.is_submitting = false;

        match result {
            Ok(response) => {
                let name = response.user.full_name();
                info!(
                    component = COMPONENT,
                    "✅ Checked in {} (attendance {}, new member: {})",
                    name,
                    response.attendance.id,
                    response.is_new_member
                );
                let message = if response.is_new_member {
                    format!("Welcome, {}! Registered and checked in.", name)
                } else {
                    format!("{} checked in successfully.", name)
                };

                self.reset_form();
                self.roster.reset_page();
                self.refresh_roster();
                self.notify(NotificationKind::Success, message);
            }
            Err(ApiError::DuplicateCheckIn(message)) => {
                warn!(component = COMPONENT, "Duplicate check-in rejected: {}", message);
                let message = Some(message).filter(|m| !m.is_empty()).unwrap_or_else(|| {
                    format!("{} is already checked in today.", self.form.name_query().display_name())
                });
                self.notify(NotificationKind::Error, message);
            }
            Err(e) => {
                warn!(component = COMPONENT, "❌ Check-in failed: {}", e);
                let message = e.server_message().unwrap_or(GENERIC_FAILURE).to_string();
                self.notify(NotificationKind::Error, message);
            }
        }
    }

    fn refresh_roster(&self) {
        let token = self.shutdown.child_token();
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = api.get_today_attendance() => {
                    let _ = tx.send(Message::RosterLoaded(result));
                }
            }
        });
    }

    fn on_roster_loaded(&mut self, result: Result<Vec<AttendanceRecord>, ApiError>) {
        match result {
            Ok(records) => {
                debug!(component = COMPONENT, "Roster refreshed: {} check-ins today", records.len());
                self.roster.replace(records);
            }
            Err(e) => warn!(component = COMPONENT, "⚠️ Failed to refresh roster: {}", e),
        }
    }

    fn load_ministries(&self) {
        let token = self.shutdown.child_token();
        let api = self.api.clone();
        let tx = self.tx.clone();
        let page_size = self.config.ministry_page_size;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = api.get_ministries(1, page_size) => {
                    let _ = tx.send(Message::MinistriesLoaded(result));
                }
            }
        });
    }

    fn on_ministries_loaded(&mut self, result: Result<MinistryListResponse, ApiError>) {
        match result {
            Ok(response) => {
                if response.total > response.data.len() as u64 {
                    debug!(
                        component = COMPONENT,
                        "Showing {} of {} ministries",
                        response.data.len(),
                        response.total
                    );
                }
                self.ministries = response.data;
            }
            Err(e) => warn!(component = COMPONENT, "⚠️ Failed to load ministries: {}", e),
        }
    }

    fn notify(&mut self, kind: NotificationKind, message: String) {
        let id = self.notifications.raise(kind, message);

        let token = self.shutdown.child_token();
        let tx = self.tx.clone();
        let duration = self.config.notification_duration;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    let _ = tx.send(Message::NotificationExpired(id));
                }
            }
        });
    }

    fn reset_form(&mut self) {
        self.debouncer.cancel();
        self.cancel_lookup();
        self.debounce_generation += 1;
        self.form.clear();
        self.controller.reset();
        self.show_all_errors = false;
    }

    fn cancel_lookup(&mut self) {
        if let Some(token) = self.lookup_token.take() {
            token.cancel();
        }
    }

    fn field_errors(&self, mode: &Mode) -> Vec<FormFieldError> {
        let errors = self.form.validate(mode, self.config.min_name_length).errors;
        if self.show_all_errors {
            return errors;
        }

        // Only flag fields the user has started filling in
        errors
            .into_iter()
            .filter(|error| match error {
                FormFieldError::FirstNameTooShort(_) => !self.form.first_name.is_empty(),
                FormFieldError::LastNameTooShort(_) => !self.form.last_name.is_empty(),
                FormFieldError::EmailInvalid => true,
                FormFieldError::EmailRequired => false,
            })
            .collect()
    }

    fn build_view(&self) -> CheckInView {
        let mode = self.controller.mode().clone();
        let can_submit = !self.is_submitting
            && mode.allows_submit()
            && self.form.validate(&mode, self.config.min_name_length).is_valid;

        CheckInView {
            form: self.form.clone(),
            field_errors: self.field_errors(&mode),
            can_submit,
            is_submitting: self.is_submitting,
            roster_rows: self.roster.current_rows(),
            roster_page: self.roster.page(),
            roster_page_count: self.roster.page_count(),
            roster_total: self.roster.total(),
            notification: self.notifications.current().cloned(),
            ministries: self.ministries.clone(),
            mode,
        }
    }

    fn publish(&self) {
        let view = self.build_view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
