//! Test doubles for the worker's collaborators and a log-capturing layer

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use account_store::{Account, AccountSource, AccountState, ConfigSource, CredentialSink};
use common::Secret;
use refresher::{RefreshError, RefreshOutcome, Refresher};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Expired account with both tempmail fields set.
pub fn expired_account(name: &str) -> Account {
    Account {
        tempmail_name: name.into(),
        tempmail_url: format!("http://mail.test/{name}"),
        cookie_expired: true,
        cookie: None,
    }
}

/// In-memory stand-in for the account store with injectable failures.
#[derive(Default)]
pub struct FakeStore {
    auto_refresh: Option<bool>,
    accounts: Vec<Account>,
    states: HashMap<usize, AccountState>,
    fail_reads: bool,
    fail_writes: bool,
    account_reads: AtomicUsize,
    written: Mutex<Vec<(usize, String)>>,
}

impl FakeStore {
    /// Store with auto refresh enabled and the given accounts.
    pub fn enabled(accounts: Vec<Account>) -> Self {
        Self {
            auto_refresh: Some(true),
            accounts,
            ..Default::default()
        }
    }

    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = Some(enabled);
        self
    }

    pub fn with_state_expired(mut self, index: usize) -> Self {
        self.states.insert(
            index,
            AccountState {
                cookie_expired: true,
            },
        );
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// How many times the account list was read.
    pub fn account_reads(&self) -> usize {
        self.account_reads.load(Ordering::SeqCst)
    }

    /// Cookies written back, in order.
    pub fn written(&self) -> Vec<(usize, String)> {
        self.written.lock().unwrap().clone()
    }
}

impl ConfigSource for FakeStore {
    fn get_flag<'a>(
        &'a self,
        _key: &'a str,
        default: bool,
    ) -> Pin<Box<dyn Future<Output = account_store::Result<bool>> + Send + 'a>> {
        let value = self.auto_refresh.unwrap_or(default);
        Box::pin(async move { Ok(value) })
    }
}

impl AccountSource for FakeStore {
    fn accounts(
        &self,
    ) -> Pin<Box<dyn Future<Output = account_store::Result<Vec<Account>>> + Send + '_>> {
        self.account_reads.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if self.fail_reads {
                return Err(account_store::Error::Unavailable("disk on fire".into()));
            }
            Ok(self.accounts.clone())
        })
    }

    fn account_states(
        &self,
    ) -> Pin<Box<dyn Future<Output = account_store::Result<HashMap<usize, AccountState>>> + Send + '_>>
    {
        Box::pin(async move { Ok(self.states.clone()) })
    }
}

impl CredentialSink for FakeStore {
    fn store_refreshed_cookie(
        &self,
        index: usize,
        cookie: Secret<String>,
    ) -> Pin<Box<dyn Future<Output = account_store::Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.fail_writes {
                return Err(account_store::Error::Io("read-only filesystem".into()));
            }
            self.written
                .lock()
                .unwrap()
                .push((index, cookie.expose().clone()));
            Ok(())
        })
    }
}

/// Refresher that records every index it is called with.
#[derive(Default)]
pub struct RecordingRefresher {
    calls: Mutex<Vec<usize>>,
    succeed: bool,
    fail_on: Option<usize>,
    panic_on: Option<usize>,
}

impl RecordingRefresher {
    /// Always reports `ManualRequired`.
    pub fn manual() -> Self {
        Self::default()
    }

    /// Always returns a cookie named after the index.
    pub fn refreshing() -> Self {
        Self {
            succeed: true,
            ..Default::default()
        }
    }

    pub fn fail_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub fn panic_on(mut self, index: usize) -> Self {
        self.panic_on = Some(index);
        self
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl Refresher for RecordingRefresher {
    fn id(&self) -> &str {
        "recording"
    }

    fn refresh<'a>(
        &'a self,
        index: usize,
        _account: &'a Account,
    ) -> Pin<Box<dyn Future<Output = refresher::Result<RefreshOutcome>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(index);
            if self.panic_on == Some(index) {
                panic!("refresher exploded on account {index}");
            }
            if self.fail_on == Some(index) {
                return Err(RefreshError::Upstream(format!("mailbox for {index} unreachable")));
            }
            if self.succeed {
                Ok(RefreshOutcome::Refreshed {
                    cookie: Secret::new(format!("cookie-{index}")),
                })
            } else {
                Ok(RefreshOutcome::ManualRequired)
            }
        })
    }
}

/// One captured log event.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
    pub account_index: Option<u64>,
}

/// Layer that keeps every event emitted while its guard is alive.
#[derive(Clone, Default)]
pub struct LogCapture {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl LogCapture {
    /// Install as the thread-local default subscriber.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn at_level(&self, level: Level) -> Vec<LogLine> {
        self.lines()
            .into_iter()
            .filter(|line| line.level == level)
            .collect()
    }

    /// Lines that carry an `account_index` field.
    pub fn per_account(&self) -> Vec<LogLine> {
        self.lines()
            .into_iter()
            .filter(|line| line.account_index.is_some())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        self.lines.lock().unwrap().push(LogLine {
            level: *event.metadata().level(),
            message: visitor.message,
            account_index: visitor.account_index,
        });
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    account_index: Option<u64>,
}

impl Visit for LineVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "account_index" {
            self.account_index = Some(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}
