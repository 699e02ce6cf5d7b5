#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;

use wholesale_portal::api::{ListSource, PageMeta, PageRequest, PageResponse};
use wholesale_portal::error::{PortalError, Result};
use wholesale_portal::list::{ListContext, ListController, ListSettings};
use wholesale_portal::notify::ToastQueue;
use wholesale_portal::realtime::{PushChannel, WatchSpec};
use wholesale_portal::types::{CurrentUser, NOTIFICATION_EVENT, Product};

/// In-memory list backend with scripted latency, totals and failures.
///
/// Rows are numbered `1..=total`; a search can be given its own total.
pub struct FakeSource {
    total_items: Mutex<u64>,
    search_totals: Mutex<HashMap<String, u64>>,
    latency: Mutex<Duration>,
    search_latency: Mutex<HashMap<String, Duration>>,
    failures_left: AtomicUsize,
    requests: Mutex<Vec<PageRequest>>,
}

impl FakeSource {
    pub fn new(total_items: u64) -> Self {
        Self {
            total_items: Mutex::new(total_items),
            search_totals: Mutex::new(HashMap::new()),
            latency: Mutex::new(Duration::from_millis(50)),
            search_latency: Mutex::new(HashMap::new()),
            failures_left: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = latency;
        self
    }

    pub fn set_total(&self, total_items: u64) {
        *self.total_items.lock() = total_items;
    }

    pub fn set_search_total(&self, search: &str, total_items: u64) {
        self.search_totals
            .lock()
            .insert(search.to_string(), total_items);
    }

    pub fn set_search_latency(&self, search: &str, latency: Duration) {
        self.search_latency
            .lock()
            .insert(search.to_string(), latency);
    }

    /// Make the next `count` fetches fail with a 500.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn page_for(&self, request: &PageRequest) -> PageResponse<Product> {
        let total = request
            .search
            .as_ref()
            .and_then(|search| self.search_totals.lock().get(search).copied())
            .unwrap_or_else(|| *self.total_items.lock());
        let per_page = u64::from(request.per_page);
        let first = u64::from(request.page - 1) * per_page + 1;
        let last = (first + per_page - 1).min(total);
        let items = (first..=last).map(product).collect();

        PageResponse {
            items,
            meta: PageMeta {
                total_items: total,
                items_per_page: request.per_page,
                current_page: request.page,
                total_pages: total.div_ceil(per_page) as u32,
            },
        }
    }
}

impl ListSource for FakeSource {
    type Row = Product;

    async fn fetch_page(
        &self,
        _user: &CurrentUser,
        request: PageRequest,
    ) -> Result<PageResponse<Product>> {
        self.requests.lock().push(request.clone());
        let latency = request
            .search
            .as_ref()
            .and_then(|search| self.search_latency.lock().get(search).copied())
            .unwrap_or_else(|| *self.latency.lock());
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let page = self.page_for(&request);

        tokio::time::sleep(latency).await;
        if fail {
            return Err(PortalError::Api {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        Ok(page)
    }
}

pub fn product(id: u64) -> Product {
    Product {
        id: id as i64,
        name: format!("Product {id}"),
        sku: Some(format!("SKU-{id:04}")),
        status: Some("active".to_string()),
        price: None,
        updated_at: None,
    }
}

/// Settings for a products screen: 10 per page, 400ms debounce.
pub fn product_settings() -> ListSettings {
    ListSettings {
        tab_filter: "status".to_string(),
        watches: vec![WatchSpec::new(
            NOTIFICATION_EVENT,
            ["product.created", "product.updated", "product.deleted"],
        )],
        ..ListSettings::default()
    }
}

/// A controller wired to fresh collaborators.
pub struct Harness {
    pub source: Arc<FakeSource>,
    pub channel: PushChannel,
    pub toasts: Arc<ToastQueue>,
    pub controller: ListController<FakeSource>,
}

impl Harness {
    pub fn new(source: FakeSource) -> Self {
        Self::with_settings(source, product_settings())
    }

    pub fn with_settings(source: FakeSource, settings: ListSettings) -> Self {
        let source = Arc::new(source);
        let channel = PushChannel::new();
        let toasts = Arc::new(ToastQueue::new());
        let context = ListContext::new(
            CurrentUser::anonymous().with_token("test-token"),
            channel.clone(),
            toasts.clone(),
        );
        let controller = ListController::new(Arc::clone(&source), context, settings);
        Self {
            source,
            channel,
            toasts,
            controller,
        }
    }

    /// Mount and wait for the first page.
    pub async fn mounted(mut self) -> Self {
        self.controller.mount();
        self.controller.settled().await;
        self
    }
}

/// Runs the `portal` binary against an isolated config file.
pub struct PortalTest {
    pub temp_dir: TempDir,
}

impl PortalTest {
    pub fn new() -> Self {
        PortalTest {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("portal").join("config.yaml")
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_portal"));
        command
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("PORTAL_CONFIG", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("PORTAL_BASE_URL")
            .env_remove("PORTAL_API_TOKEN")
            .env_remove("PORTAL_LOG");
        command
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .expect("Failed to execute portal command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Command {:?} should have failed\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }
}
