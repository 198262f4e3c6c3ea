//! Mock DNS provider for E2E tests
//!
//! This module provides a mock implementation of the DnsProvider trait
//! that can be used in tests without making real DNS API calls.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use arvancloud_webhook::{
    DnsClientFactory, DnsError, DnsProvider, DnsRecord, TxtRecord, TXT_RECORD_TYPE,
};

/// Mock DNS provider that tracks operations without making real API calls
pub struct MockDnsProvider {
    /// Stored records: record_id -> (domain, record)
    records: DashMap<String, (String, DnsRecord)>,
    /// Counter for generating unique record IDs
    record_counter: AtomicU64,
    /// Every create call, in order: (domain, record)
    create_calls: Mutex<Vec<(String, TxtRecord)>>,
    /// Every delete call, in order: (domain, record_id)
    delete_calls: Mutex<Vec<(String, String)>>,
    search_calls: AtomicUsize,
    fail_create: AtomicBool,
    fail_search: AtomicBool,
    fail_delete: AtomicBool,
}

impl MockDnsProvider {
    /// Create a new mock DNS provider
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a TXT record as if it already existed at the provider
    pub fn seed_txt_record(&self, domain: &str, name: &str, text: &str) -> String {
        let record_id = self.next_record_id();
        self.records.insert(
            record_id.clone(),
            (
                domain.to_string(),
                DnsRecord {
                    id: record_id.clone(),
                    name: name.to_string(),
                    record_type: TXT_RECORD_TYPE.to_string(),
                    value: serde_json::json!({ "text": text }),
                    ttl: Some(120),
                },
            ),
        );
        record_id
    }

    /// Check if a TXT record with this name and value exists in the domain
    pub fn has_record(&self, domain: &str, name: &str, text: &str) -> bool {
        self.records.iter().any(|r| {
            let (record_domain, record) = r.value();
            record_domain == domain && record.name == name && record.text() == Some(text)
        })
    }

    /// Get the number of stored records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Get every create call made so far
    pub fn create_calls(&self) -> Vec<(String, TxtRecord)> {
        self.create_calls.lock().clone()
    }

    /// Get every delete call made so far
    pub fn delete_calls(&self) -> Vec<(String, String)> {
        self.delete_calls.lock().clone()
    }

    /// Get the number of search calls made so far
    pub fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Configure mock to fail create operations
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Configure mock to fail search operations
    pub fn set_fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    /// Configure mock to fail delete operations
    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn next_record_id(&self) -> String {
        format!(
            "mock-record-{}",
            self.record_counter.fetch_add(1, Ordering::Relaxed)
        )
    }
}

impl Default for MockDnsProvider {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            record_counter: AtomicU64::new(1),
            create_calls: Mutex::new(Vec::new()),
            delete_calls: Mutex::new(Vec::new()),
            search_calls: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            fail_search: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn create_txt_record(
        &self,
        domain: &str,
        record: &TxtRecord,
    ) -> Result<String, DnsError> {
        self.create_calls
            .lock()
            .push((domain.to_string(), record.clone()));

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DnsError::Api {
                status: 422,
                message: "Simulated create failure".into(),
            });
        }

        let record_id = self.next_record_id();
        self.records.insert(
            record_id.clone(),
            (
                domain.to_string(),
                DnsRecord {
                    id: record_id.clone(),
                    name: record.name.clone(),
                    record_type: TXT_RECORD_TYPE.to_string(),
                    value: serde_json::json!({ "text": record.text }),
                    ttl: Some(record.ttl),
                },
            ),
        );
        tracing::debug!(
            "MockDnsProvider: created record {} for {} in {}",
            record_id,
            record.name,
            domain
        );
        Ok("DNS record created".to_string())
    }

    async fn search_txt_records(
        &self,
        domain: &str,
        name: &str,
    ) -> Result<Vec<DnsRecord>, DnsError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_search.load(Ordering::SeqCst) {
            return Err(DnsError::Request("Simulated search failure".into()));
        }

        // Free-text search, like the real API: substring match on the name
        let mut found: Vec<DnsRecord> = self
            .records
            .iter()
            .filter(|r| {
                let (record_domain, record) = r.value();
                record_domain == domain && record.name.contains(name)
            })
            .map(|r| r.value().1.clone())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<String, DnsError> {
        self.delete_calls
            .lock()
            .push((domain.to_string(), record_id.to_string()));

        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(DnsError::Api {
                status: 500,
                message: "Simulated delete failure".into(),
            });
        }

        self.records.remove(record_id);
        tracing::debug!("MockDnsProvider: deleted record {}", record_id);
        Ok("DNS record deleted".to_string())
    }
}

/// Client factory handing out a shared [`MockDnsProvider`]
pub struct MockClientFactory {
    provider: Arc<MockDnsProvider>,
    /// API keys passed to `connect`, in order
    api_keys: Mutex<Vec<String>>,
    fail_connect: AtomicBool,
}

impl MockClientFactory {
    pub fn new(provider: Arc<MockDnsProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            api_keys: Mutex::new(Vec::new()),
            fail_connect: AtomicBool::new(false),
        })
    }

    /// API keys the solver connected with
    pub fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().clone()
    }

    /// Configure mock to fail client construction
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }
}

impl DnsClientFactory for MockClientFactory {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn DnsProvider>, DnsError> {
        self.api_keys.lock().push(api_key.to_string());

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(DnsError::Client("Simulated client failure".into()));
        }
        Ok(self.provider.clone())
    }
}
