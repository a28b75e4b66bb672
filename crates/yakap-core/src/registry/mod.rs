//! Assistance-record registry backed by sled.
//!
//! Holds the citizen-assistance records (yakaps) plus the barangay /
//! city / province location tables they reference.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BrgyId, CityId, ProvId, UserId, YakapId, fresh_id};

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Referenced barangay does not exist.
    #[error("Unknown barangay: {0}")]
    UnknownBrgy(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A citizen-assistance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YakapRecord {
    /// Unique record ID.
    pub yakap_id: YakapId,
    /// Full name of the assisted citizen.
    pub fullname: String,
    /// Street address, if given.
    pub address: Option<String>,
    /// Barangay the citizen belongs to.
    pub brgy_id: BrgyId,
    /// The encoder who created the record.
    pub user_id: UserId,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A province.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Province {
    /// Unique province ID.
    pub prov_id: ProvId,
    /// Province name.
    pub prov_name: String,
}

/// A city or municipality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    /// Unique city ID.
    pub city_id: CityId,
    /// City name.
    pub city_name: String,
    /// Province this city belongs to.
    pub prov_id: ProvId,
}

/// A barangay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brgy {
    /// Unique barangay ID.
    pub brgy_id: BrgyId,
    /// Barangay name.
    pub brgy_name: String,
    /// City this barangay belongs to.
    pub city_id: CityId,
}

/// A barangay listing row with its city and province resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrgyRow {
    /// Unique barangay ID.
    pub brgy_id: BrgyId,
    /// Barangay name.
    pub brgy_name: String,
    /// City, when the reference resolves.
    pub city: Option<CityRow>,
}

/// A city row nested under a barangay listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityRow {
    /// Unique city ID.
    pub city_id: CityId,
    /// City name.
    pub city_name: String,
    /// Province, when the reference resolves.
    pub province: Option<Province>,
}

/// Grouped counts over the full record set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Total number of records.
    pub total: u64,
    /// Record counts keyed by barangay ID.
    pub by_brgy: BTreeMap<String, u64>,
    /// Record counts keyed by encoder user ID.
    pub by_user: BTreeMap<String, u64>,
    /// Record counts keyed by creation day (`YYYY-MM-DD`), newest first
    /// when iterated in reverse.
    pub by_date: BTreeMap<String, u64>,
}

/// Registry store backed by sled.
pub struct RegistryStore {
    db: sled::Db,
    yakaps: sled::Tree,
    locations: sled::Tree,
}

impl RegistryStore {
    /// Open or create a registry store at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        let db = sled::open(path.join("registry"))
            .map_err(|e| RegistryError::Storage(format!("Failed to open registry database: {e}")))?;
        Self::with_db(db)
    }

    /// Create a registry store over an existing sled database.
    ///
    /// # Errors
    ///
    /// Returns error if trees cannot be opened.
    pub fn with_db(db: sled::Db) -> Result<Self, RegistryError> {
        let yakaps = db
            .open_tree("yakaps")
            .map_err(|e| RegistryError::Storage(format!("Failed to open yakaps tree: {e}")))?;
        let locations = db
            .open_tree("locations")
            .map_err(|e| RegistryError::Storage(format!("Failed to open locations tree: {e}")))?;

        Ok(Self {
            db,
            yakaps,
            locations,
        })
    }

    /// Get the underlying sled database.
    #[must_use]
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Create a new assistance record. The encoder is taken from the
    /// caller's session, never from client input.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBrgy` when the barangay reference does not resolve
    /// and a storage error when the write fails.
    pub fn create_yakap(
        &self,
        fullname: &str,
        address: Option<&str>,
        brgy_id: &BrgyId,
        user_id: &UserId,
    ) -> Result<YakapRecord, RegistryError> {
        if self.get_brgy(brgy_id)?.is_none() {
            return Err(RegistryError::UnknownBrgy(brgy_id.to_string()));
        }

        let now = Utc::now();
        let record = YakapRecord {
            yakap_id: YakapId::new(fresh_id("yakap")),
            fullname: fullname.to_string(),
            address: address.map(String::from),
            brgy_id: brgy_id.clone(),
            user_id: user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        self.put_yakap(&record)?;
        tracing::debug!(yakap_id = %record.yakap_id, brgy_id = %record.brgy_id, "created record");
        Ok(record)
    }

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get_yakap(&self, id: &YakapId) -> Result<Option<YakapRecord>, RegistryError> {
        match self.yakaps.get(id.as_ref().as_bytes()) {
            Ok(Some(value)) => {
                let record: YakapRecord = serde_json::from_slice(&value)
                    .map_err(|e| RegistryError::Storage(format!("Deserialization error: {e}")))?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(RegistryError::Storage(format!("Get error: {e}"))),
        }
    }

    /// Update a record's name and barangay.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the record does not exist, `UnknownBrgy` when
    /// the new barangay reference does not resolve.
    pub fn update_yakap(
        &self,
        id: &YakapId,
        fullname: &str,
        brgy_id: &BrgyId,
    ) -> Result<YakapRecord, RegistryError> {
        let mut record = self
            .get_yakap(id)?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        if self.get_brgy(brgy_id)?.is_none() {
            return Err(RegistryError::UnknownBrgy(brgy_id.to_string()));
        }

        record.fullname = fullname.to_string();
        record.brgy_id = brgy_id.clone();
        record.updated_at = Utc::now();

        self.put_yakap(&record)?;
        Ok(record)
    }

    /// List all records, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn list_yakaps(&self) -> Result<Vec<YakapRecord>, RegistryError> {
        let mut records = Vec::new();

        for result in self.yakaps.iter() {
            let (_, value) =
                result.map_err(|e| RegistryError::Storage(format!("Iter error: {e}")))?;
            let record: YakapRecord = serde_json::from_slice(&value)
                .map_err(|e| RegistryError::Storage(format!("Deserialization error: {e}")))?;
            records.push(record);
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Insert or replace a province.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn upsert_province(&self, province: &Province) -> Result<(), RegistryError> {
        self.put_location(&format!("prov:{}", province.prov_id), province)
    }

    /// Insert or replace a city.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn upsert_city(&self, city: &City) -> Result<(), RegistryError> {
        self.put_location(&format!("city:{}", city.city_id), city)
    }

    /// Insert or replace a barangay.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn upsert_brgy(&self, brgy: &Brgy) -> Result<(), RegistryError> {
        self.put_location(&format!("brgy:{}", brgy.brgy_id), brgy)
    }

    /// Get a barangay by ID.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn get_brgy(&self, id: &BrgyId) -> Result<Option<Brgy>, RegistryError> {
        self.get_location(&format!("brgy:{id}"))
    }

    /// List all barangays with their city and province resolved, sorted by
    /// barangay name.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn list_brgys(&self) -> Result<Vec<BrgyRow>, RegistryError> {
        let mut rows = Vec::new();

        for result in self.locations.scan_prefix(b"brgy:") {
            let (_, value) =
                result.map_err(|e| RegistryError::Storage(format!("Iter error: {e}")))?;
            let brgy: Brgy = serde_json::from_slice(&value)
                .map_err(|e| RegistryError::Storage(format!("Deserialization error: {e}")))?;

            let city: Option<City> = self.get_location(&format!("city:{}", brgy.city_id))?;
            let city_row = match city {
                Some(city) => {
                    let province = self.get_location(&format!("prov:{}", city.prov_id))?;
                    Some(CityRow {
                        city_id: city.city_id,
                        city_name: city.city_name,
                        province,
                    })
                }
                None => None,
            };

            rows.push(BrgyRow {
                brgy_id: brgy.brgy_id,
                brgy_name: brgy.brgy_name,
                city: city_row,
            });
        }

        rows.sort_by(|a, b| a.brgy_name.cmp(&b.brgy_name));
        Ok(rows)
    }

    /// Compute grouped counts over the full record set.
    ///
    /// # Errors
    ///
    /// Returns error if storage fails.
    pub fn dashboard(&self) -> Result<DashboardSummary, RegistryError> {
        let records = self.list_yakaps()?;

        let mut by_brgy: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_user: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_date: BTreeMap<String, u64> = BTreeMap::new();

        for record in &records {
            *by_brgy.entry(record.brgy_id.to_string()).or_insert(0) += 1;
            *by_user.entry(record.user_id.to_string()).or_insert(0) += 1;
            let day = record.created_at.format("%Y-%m-%d").to_string();
            *by_date.entry(day).or_insert(0) += 1;
        }

        Ok(DashboardSummary {
            total: records.len() as u64,
            by_brgy,
            by_user,
            by_date,
        })
    }

    fn put_yakap(&self, record: &YakapRecord) -> Result<(), RegistryError> {
        let value = serde_json::to_vec(record)
            .map_err(|e| RegistryError::Storage(format!("Serialization error: {e}")))?;

        self.yakaps
            .insert(record.yakap_id.as_ref().as_bytes(), value)
            .map_err(|e| RegistryError::Storage(format!("Insert error: {e}")))?;

        self.yakaps
            .flush()
            .map_err(|e| RegistryError::Storage(format!("Flush error: {e}")))?;

        Ok(())
    }

    fn put_location<T: Serialize>(&self, key: &str, value: &T) -> Result<(), RegistryError> {
        let encoded = serde_json::to_vec(value)
            .map_err(|e| RegistryError::Storage(format!("Serialization error: {e}")))?;

        self.locations
            .insert(key.as_bytes(), encoded)
            .map_err(|e| RegistryError::Storage(format!("Insert error: {e}")))?;

        self.locations
            .flush()
            .map_err(|e| RegistryError::Storage(format!("Flush error: {e}")))?;

        Ok(())
    }

    fn get_location<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
    ) -> Result<Option<T>, RegistryError> {
        match self.locations.get(key.as_bytes()) {
            Ok(Some(value)) => {
                let decoded: T = serde_json::from_slice(&value)
                    .map_err(|e| RegistryError::Storage(format!("Deserialization error: {e}")))?;
                Ok(Some(decoded))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(RegistryError::Storage(format!("Get error: {e}"))),
        }
    }
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore")
            .field("records", &self.yakaps.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn seeded_store() -> (TempDir, RegistryStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = RegistryStore::open(temp_dir.path()).unwrap();

        store
            .upsert_province(&Province {
                prov_id: ProvId::new("prov_1"),
                prov_name: "Laguna".to_string(),
            })
            .unwrap();
        store
            .upsert_city(&City {
                city_id: CityId::new("city_1"),
                city_name: "Calamba".to_string(),
                prov_id: ProvId::new("prov_1"),
            })
            .unwrap();
        store
            .upsert_brgy(&Brgy {
                brgy_id: BrgyId::new("brgy_1"),
                brgy_name: "Banlic".to_string(),
                city_id: CityId::new("city_1"),
            })
            .unwrap();
        store
            .upsert_brgy(&Brgy {
                brgy_id: BrgyId::new("brgy_2"),
                brgy_name: "Asinan".to_string(),
                city_id: CityId::new("city_1"),
            })
            .unwrap();

        (temp_dir, store)
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, store) = seeded_store();

        let record = store
            .create_yakap(
                "Juan dela Cruz",
                Some("123 Rizal St"),
                &BrgyId::new("brgy_1"),
                &UserId::new("user_1"),
            )
            .unwrap();

        assert!(record.yakap_id.as_ref().starts_with("yakap_"));
        assert_eq!(record.created_at, record.updated_at);

        let loaded = store.get_yakap(&record.yakap_id).unwrap().unwrap();
        assert_eq!(loaded.fullname, "Juan dela Cruz");
        assert_eq!(loaded.brgy_id.as_ref(), "brgy_1");
    }

    #[test]
    fn test_create_rejects_unknown_brgy() {
        let (_dir, store) = seeded_store();

        let result = store.create_yakap(
            "Juan dela Cruz",
            None,
            &BrgyId::new("brgy_999"),
            &UserId::new("user_1"),
        );
        assert!(matches!(result, Err(RegistryError::UnknownBrgy(_))));
    }

    #[test]
    fn test_update() {
        let (_dir, store) = seeded_store();

        let record = store
            .create_yakap("Juan", None, &BrgyId::new("brgy_1"), &UserId::new("user_1"))
            .unwrap();

        let updated = store
            .update_yakap(&record.yakap_id, "Juan Santos", &BrgyId::new("brgy_2"))
            .unwrap();

        assert_eq!(updated.fullname, "Juan Santos");
        assert_eq!(updated.brgy_id.as_ref(), "brgy_2");
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn test_update_missing_record() {
        let (_dir, store) = seeded_store();

        let result = store.update_yakap(&YakapId::new("yakap_none"), "X", &BrgyId::new("brgy_1"));
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, store) = seeded_store();

        for name in ["first", "second", "third"] {
            store
                .create_yakap(name, None, &BrgyId::new("brgy_1"), &UserId::new("user_1"))
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let records = store.list_yakaps().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].fullname, "third");
        assert_eq!(records[2].fullname, "first");
    }

    #[test]
    fn test_brgy_listing_sorted_and_nested() {
        let (_dir, store) = seeded_store();

        let rows = store.list_brgys().unwrap();
        assert_eq!(rows.len(), 2);
        // Sorted by name: Asinan before Banlic
        assert_eq!(rows[0].brgy_name, "Asinan");
        assert_eq!(rows[1].brgy_name, "Banlic");

        let city = rows[0].city.as_ref().unwrap();
        assert_eq!(city.city_name, "Calamba");
        assert_eq!(city.province.as_ref().unwrap().prov_name, "Laguna");
    }

    #[test]
    fn test_dashboard_counts() {
        let (_dir, store) = seeded_store();

        store
            .create_yakap("a", None, &BrgyId::new("brgy_1"), &UserId::new("user_1"))
            .unwrap();
        store
            .create_yakap("b", None, &BrgyId::new("brgy_1"), &UserId::new("user_2"))
            .unwrap();
        store
            .create_yakap("c", None, &BrgyId::new("brgy_2"), &UserId::new("user_1"))
            .unwrap();

        let summary = store.dashboard().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_brgy.get("brgy_1"), Some(&2));
        assert_eq!(summary.by_brgy.get("brgy_2"), Some(&1));
        assert_eq!(summary.by_user.get("user_1"), Some(&2));
        assert_eq!(summary.by_date.len(), 1);
    }
}
