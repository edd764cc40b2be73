//! In-memory API fakes for handler tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{
    ApiError, ApiResult, DbaasApi, Extension, ExtensionCreateOpts, FloatingIp, FloatingIpOpts,
    License, LicenseOpts, ResellApi,
};

struct FakeExtension {
    extension: Extension,
    /// Statuses reported by the next reads; the last one repeats
    statuses: VecDeque<String>,
    /// Set once deleted: reads left before the extension disappears
    reads_until_gone: Option<usize>,
}

/// DBaaS fake with scripted extension statuses
pub(crate) struct FakeDbaas {
    extensions: Mutex<HashMap<String, FakeExtension>>,
    next_id: AtomicU32,
    create_statuses: Vec<&'static str>,
    delete_lag: usize,
    transient_read_failures: AtomicU32,
    mutation_delay: Duration,
    inflight: AtomicUsize,
    max_inflight: AtomicUsize,
    creates: AtomicUsize,
    reads: AtomicUsize,
}

impl FakeDbaas {
    pub(crate) fn new() -> Self {
        Self {
            extensions: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            create_statuses: vec!["PENDING_CREATE", "ACTIVE"],
            delete_lag: 1,
            transient_read_failures: AtomicU32::new(0),
            mutation_delay: Duration::ZERO,
            inflight: AtomicUsize::new(0),
            max_inflight: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_create_statuses(mut self, statuses: &[&'static str]) -> Self {
        self.create_statuses = statuses.to_vec();
        self
    }

    pub(crate) fn with_delete_lag(mut self, reads: usize) -> Self {
        self.delete_lag = reads;
        self
    }

    pub(crate) fn with_transient_read_failures(self, failures: u32) -> Self {
        self.transient_read_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_mutation_delay(mut self, delay: Duration) -> Self {
        self.mutation_delay = delay;
        self
    }

    /// Most create calls that were running at the same time
    pub(crate) fn max_inflight(&self) -> usize {
        self.max_inflight.load(Ordering::SeqCst)
    }

    pub(crate) fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.extensions.lock().unwrap().contains_key(id)
    }
}

#[async_trait]
impl DbaasApi for FakeDbaas {
    async fn create_extension(&self, opts: &ExtensionCreateOpts) -> ApiResult<Extension> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let running = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inflight.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.mutation_delay).await;
        self.inflight.fetch_sub(1, Ordering::SeqCst);

        let id = format!("ext-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let extension = Extension {
            id: id.clone(),
            available_extension_id: opts.available_extension_id.clone(),
            datastore_id: opts.datastore_id.clone(),
            database_id: opts.database_id.clone(),
            status: self.create_statuses[0].to_string(),
        };
        self.extensions.lock().unwrap().insert(
            id,
            FakeExtension {
                extension: extension.clone(),
                statuses: self.create_statuses.iter().map(|s| s.to_string()).collect(),
                reads_until_gone: None,
            },
        );
        Ok(extension)
    }

    async fn extension(&self, id: &str) -> ApiResult<Extension> {
        let failing = self
            .transient_read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ApiError::Transport("connection reset by peer".to_string()));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);

        let mut extensions = self.extensions.lock().unwrap();
        let Some(fake) = extensions.get_mut(id) else {
            return Err(ApiError::not_found(format!("extension {} not found", id)));
        };

        let remaining = fake.reads_until_gone;
        match remaining {
            Some(0) => {
                extensions.remove(id);
                return Err(ApiError::not_found(format!("extension {} not found", id)));
            }
            Some(n) => fake.reads_until_gone = Some(n - 1),
            None => {}
        }

        if fake.statuses.len() > 1 {
            if let Some(status) = fake.statuses.pop_front() {
                fake.extension.status = status;
            }
        } else if let Some(status) = fake.statuses.front() {
            fake.extension.status = status.clone();
        }
        Ok(fake.extension.clone())
    }

    async fn delete_extension(&self, id: &str) -> ApiResult<()> {
        let mut extensions = self.extensions.lock().unwrap();
        match extensions.get_mut(id) {
            Some(fake) => {
                fake.reads_until_gone = Some(self.delete_lag);
                Ok(())
            }
            None => Err(ApiError::not_found(format!("extension {} not found", id))),
        }
    }
}

#[derive(Default)]
struct ResellObjects {
    floating_ips: HashMap<String, FloatingIp>,
    licenses: HashMap<u64, License>,
}

/// VPC reseller fake
#[derive(Default)]
pub(crate) struct FakeResell {
    objects: Mutex<ResellObjects>,
    next_id: AtomicU32,
    /// Answer creates with one object too many
    extra_result: bool,
}

impl FakeResell {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_extra_result(mut self) -> Self {
        self.extra_result = true;
        self
    }

    pub(crate) fn insert_floating_ip(&self, floating_ip: FloatingIp) {
        self.objects
            .lock()
            .unwrap()
            .floating_ips
            .insert(floating_ip.id.clone(), floating_ip);
    }

    pub(crate) fn floating_ip_count(&self) -> usize {
        self.objects.lock().unwrap().floating_ips.len()
    }

    pub(crate) fn license_count(&self) -> usize {
        self.objects.lock().unwrap().licenses.len()
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn quantity(&self, requested: u32) -> u32 {
        if self.extra_result {
            requested + 1
        } else {
            requested
        }
    }
}

#[async_trait]
impl ResellApi for FakeResell {
    async fn create_floating_ips(
        &self,
        project_id: &str,
        opts: &[FloatingIpOpts],
    ) -> ApiResult<Vec<FloatingIp>> {
        let mut created = Vec::new();
        for opt in opts {
            for _ in 0..self.quantity(opt.quantity) {
                let n = self.next_id();
                created.push(FloatingIp {
                    id: format!("fip-{}", n),
                    project_id: project_id.to_string(),
                    region: opt.region.clone(),
                    floating_ip_address: format!("203.0.113.{}", n),
                    fixed_ip_address: None,
                    port_id: None,
                    status: "DOWN".to_string(),
                    servers: Vec::new(),
                });
            }
        }

        let mut objects = self.objects.lock().unwrap();
        for floating_ip in &created {
            objects
                .floating_ips
                .insert(floating_ip.id.clone(), floating_ip.clone());
        }
        Ok(created)
    }

    async fn floating_ip(&self, id: &str) -> ApiResult<FloatingIp> {
        self.objects
            .lock()
            .unwrap()
            .floating_ips
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("floating IP {} not found", id)))
    }

    async fn delete_floating_ip(&self, id: &str) -> ApiResult<()> {
        self.objects
            .lock()
            .unwrap()
            .floating_ips
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("floating IP {} not found", id)))
    }

    async fn create_licenses(
        &self,
        project_id: &str,
        opts: &[LicenseOpts],
    ) -> ApiResult<Vec<License>> {
        let mut created = Vec::new();
        for opt in opts {
            for _ in 0..self.quantity(opt.quantity) {
                created.push(License {
                    id: u64::from(self.next_id()),
                    project_id: project_id.to_string(),
                    region: opt.region.clone(),
                    license_type: opt.license_type.clone(),
                    status: "DOWN".to_string(),
                    network_id: None,
                    subnet_id: None,
                    port_id: None,
                    servers: Vec::new(),
                });
            }
        }

        let mut objects = self.objects.lock().unwrap();
        for license in &created {
            objects.licenses.insert(license.id, license.clone());
        }
        Ok(created)
    }

    async fn license(&self, id: &str) -> ApiResult<License> {
        let id: u64 = id
            .parse()
            .map_err(|_| ApiError::status(400, format!("invalid license id {}", id)))?;
        self.objects
            .lock()
            .unwrap()
            .licenses
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("license {} not found", id)))
    }

    async fn delete_license(&self, id: &str) -> ApiResult<()> {
        let id: u64 = id
            .parse()
            .map_err(|_| ApiError::status(400, format!("invalid license id {}", id)))?;
        self.objects
            .lock()
            .unwrap()
            .licenses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("license {} not found", id)))
    }
}
