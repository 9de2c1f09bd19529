//! In-process object store.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use super::{ListEntry, ListMode, ObjectMeta, ObjectStore, StoreResult};
use crate::core::SasPermissions;

type HmacSha256 = Hmac<Sha256>;

const DEV_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEV_ACCOUNT_KEY: &[u8] = b"memory-store-development-account-key";
const SIGNATURE_VERSION: &str = "2024-01-01";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn meta(&self, key: &str) -> ObjectMeta {
        ObjectMeta {
            key: key.to_string(),
            size: self.data.len() as u64,
            last_modified: self.last_modified,
            content_type: self.content_type.clone(),
        }
    }
}

type Container = BTreeMap<String, StoredObject>;

/// An object store that keeps every container in memory.
///
/// `MemoryStore` behaves like a blob service: containers are flat maps from keys to
/// objects, listings fold deeper keys into `/`-delimited prefixes, and signed URLs are
/// HMAC-SHA256 signed with the account key, so they can be checked again with
/// [`verify_signed_url`](Self::verify_signed_url).
///
/// ### Example
///
/// ```
/// use vfs_storage::store::{ListMode, MemoryStore, ObjectStore};
///
/// let store = MemoryStore::new();
/// store.create_container("docs").unwrap();
/// store.put_object("docs", "a/note.txt", b"Hello", "text/plain").unwrap();
///
/// let entries = store.list("docs", "", ListMode::Delimited).unwrap();
/// assert_eq!(entries[0].key(), "a/");
/// ```
pub struct MemoryStore {
    endpoint: String,
    account_key: Vec<u8>,
    containers: RwLock<BTreeMap<String, Container>>,
}

impl MemoryStore {
    /// Creates an empty store addressed like the local development storage account.
    pub fn new() -> Self {
        Self::with_account(DEV_ENDPOINT, DEV_ACCOUNT_KEY)
    }

    /// Creates an empty store whose signed URLs start with `endpoint`.
    pub fn with_account(endpoint: impl Into<String>, account_key: &[u8]) -> Self {
        Self {
            endpoint: endpoint.into(),
            account_key: account_key.to_vec(),
            containers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Checks that `url` is a valid, unexpired signed URL for `container`/`key` granting
    /// at least `required`.
    pub fn verify_signed_url(
        &self,
        url: &str,
        container: &str,
        key: &str,
        required: SasPermissions,
    ) -> StoreResult<()> {
        let url = Url::parse(url)?;
        let expected = self.object_url(container, key)?;
        if url.origin() != expected.origin() || url.path() != expected.path() {
            return Err(anyhow!("signed url does not address {container}/{key}"));
        }

        let query = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .ok_or_else(|| anyhow!("signed url is missing `{name}`"))
        };
        let expiry = query("se")?;
        let permissions = query("sp")?;
        let signature = BASE64.decode(query("sig")?)?;

        self.mac(container, key, &expiry, &permissions)?
            .verify_slice(&signature)
            .map_err(|_| anyhow!("signature mismatch"))?;

        let expires_at = DateTime::parse_from_rfc3339(&expiry)?.with_timezone(&Utc);
        if expires_at <= Utc::now() {
            return Err(anyhow!("signed url expired at {expiry}"));
        }
        let granted = SasPermissions::from_token(&permissions)
            .ok_or_else(|| anyhow!("invalid permissions `{permissions}`"))?;
        if !granted.contains(required) {
            return Err(anyhow!("signed url grants `{granted}`, `{required}` required"));
        }
        Ok(())
    }

    fn object_url(&self, container: &str, key: &str) -> StoreResult<Url> {
        let mut url = Url::parse(&self.endpoint)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("endpoint {} cannot be a base", self.endpoint))?
            .pop_if_empty()
            .push(container)
            .extend(key.split('/'));
        Ok(url)
    }

    fn mac(
        &self,
        container: &str,
        key: &str,
        expiry: &str,
        permissions: &str,
    ) -> StoreResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.account_key)
            .map_err(|e| anyhow!("invalid account key: {e}"))?;
        mac.update(format!("{container}\n{key}\n{expiry}\n{permissions}").as_bytes());
        Ok(mac)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Container>>> {
        self.containers
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Container>>> {
        self.containers
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_container(container: &str) -> anyhow::Error {
    anyhow!("container `{container}` does not exist")
}

fn missing_object(container: &str, key: &str) -> anyhow::Error {
    anyhow!("object `{container}/{key}` does not exist")
}

impl ObjectStore for MemoryStore {
    fn container_exists(&self, container: &str) -> StoreResult<bool> {
        Ok(self.read()?.contains_key(container))
    }

    fn create_container(&self, container: &str) -> StoreResult<bool> {
        if container.is_empty() || container.contains('/') {
            return Err(anyhow!("invalid container name `{container}`"));
        }
        let mut containers = self.write()?;
        if containers.contains_key(container) {
            return Ok(false);
        }
        containers.insert(container.to_string(), Container::new());
        Ok(true)
    }

    fn delete_container(&self, container: &str) -> StoreResult<()> {
        self.write()?
            .remove(container)
            .map(|_| ())
            .ok_or_else(|| missing_container(container))
    }

    fn object_exists(&self, container: &str, key: &str) -> StoreResult<bool> {
        let containers = self.read()?;
        let objects = containers
            .get(container)
            .ok_or_else(|| missing_container(container))?;
        Ok(objects.contains_key(key))
    }

    fn head_object(&self, container: &str, key: &str) -> StoreResult<ObjectMeta> {
        let containers = self.read()?;
        containers
            .get(container)
            .ok_or_else(|| missing_container(container))?
            .get(key)
            .map(|object| object.meta(key))
            .ok_or_else(|| missing_object(container, key))
    }

    fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>> {
        let containers = self.read()?;
        containers
            .get(container)
            .ok_or_else(|| missing_container(container))?
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| missing_object(container, key))
    }

    fn put_object(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> StoreResult<()> {
        if key.is_empty() {
            return Err(anyhow!("object key is empty"));
        }
        let mut containers = self.write()?;
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| missing_container(container))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn delete_object(&self, container: &str, key: &str) -> StoreResult<()> {
        let mut containers = self.write()?;
        containers
            .get_mut(container)
            .ok_or_else(|| missing_container(container))?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| missing_object(container, key))
    }

    fn copy_object(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        if dst_key.is_empty() {
            return Err(anyhow!("object key is empty"));
        }
        let mut containers = self.write()?;
        let mut object = containers
            .get(src_container)
            .ok_or_else(|| missing_container(src_container))?
            .get(src_key)
            .cloned()
            .ok_or_else(|| missing_object(src_container, src_key))?;
        object.last_modified = Utc::now();
        containers
            .get_mut(dst_container)
            .ok_or_else(|| missing_container(dst_container))?
            .insert(dst_key.to_string(), object);
        Ok(())
    }

    fn list(&self, container: &str, prefix: &str, mode: ListMode) -> StoreResult<Vec<ListEntry>> {
        let containers = self.read()?;
        let objects = containers
            .get(container)
            .ok_or_else(|| missing_container(container))?;

        let mut entries = Vec::new();
        let matching = objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix));
        for (key, object) in matching {
            let rest = &key[prefix.len()..];
            match (mode, rest.find('/')) {
                (ListMode::Delimited, Some(idx)) => {
                    // keys sharing a prefix are contiguous in a sorted map
                    let dir = format!("{prefix}{}", &rest[..=idx]);
                    if entries.last().map(ListEntry::key) != Some(dir.as_str()) {
                        entries.push(ListEntry::Prefix(dir));
                    }
                }
                _ => entries.push(ListEntry::Object(object.meta(key))),
            }
        }
        Ok(entries)
    }

    fn signed_url(
        &self,
        container: &str,
        key: &str,
        expires_at: DateTime<Utc>,
        permissions: SasPermissions,
    ) -> StoreResult<String> {
        if !self.object_exists(container, key)? {
            return Err(missing_object(container, key));
        }
        let expiry = expires_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let permissions = permissions.to_string();
        let signature = BASE64.encode(
            self.mac(container, key, &expiry, &permissions)?
                .finalize()
                .into_bytes(),
        );

        let mut url = self.object_url(container, key)?;
        url.query_pairs_mut()
            .append_pair("sv", SIGNATURE_VERSION)
            .append_pair("se", &expiry)
            .append_pair("sp", &permissions)
            .append_pair("sig", &signature);
        Ok(url.into())
    }
}
