use anyhow::{anyhow, bail, Context, Result};
use common::{brand_file_path, brand_state_key, Brand, BRAND_FILE_STORE_DIR};
use log::{debug, warn};

use crate::file_store::FileStore;
use crate::storage::StateStore;

/// Brand records live in the state store, with the file store as the durable
/// copy the state store is rebuilt from.
#[derive(Clone)]
pub struct BrandManager {
    state: StateStore,
    files: FileStore,
}

impl BrandManager {
    pub fn new(state: StateStore, files: FileStore) -> Self {
        Self { state, files }
    }

    pub async fn find_brand(&self, bid: &str) -> Result<Option<Brand>> {
        check_bid(bid)?;
        debug!("Getting brand {} from state store", bid);
        let key = brand_state_key(bid);
        if let Some(raw) = self.state.get(&key).await? {
            let brand = serde_json::from_str(&raw)
                .with_context(|| format!("brand {} in state store is not valid JSON", bid))?;
            return Ok(Some(brand));
        }

        debug!("Brand {} not found in state store, checking file store", bid);
        let path = brand_file_path(bid);
        let raw = match self.files.read(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Brand {} not in file store: {:#}", bid, e);
                return Ok(None);
            }
        };
        let brand: Brand = serde_json::from_slice(&raw)
            .with_context(|| format!("brand file {} is not valid JSON", path))?;

        // repopulate the state store from the file copy
        self.state.put(&key, &serde_json::to_string(&brand)?, None).await?;
        debug!("Restored brand {} to state store from file store", bid);
        Ok(Some(brand))
    }

    pub async fn get_brand(&self, bid: &str) -> Result<Brand> {
        self.find_brand(bid)
            .await?
            .ok_or_else(|| anyhow!("Brand not found in state store or file store for bid {}", bid))
    }

    pub async fn save_brand(&self, brand: Brand) -> Result<Brand> {
        check_bid(&brand.bid)?;
        let json = serde_json::to_string(&brand)?;

        let key = brand.state_key();
        debug!("Saving brand {} to state store with key {}", brand.bid, key);
        self.state.put(&key, &json, None).await?;

        debug!("Saving brand {} to file store", brand.bid);
        self.files.write(&brand.file_path(), json.as_bytes()).await?;
        Ok(brand)
    }

    pub async fn delete_brand(&self, bid: &str) -> Result<()> {
        check_bid(bid)?;
        self.state.delete(&brand_state_key(bid)).await?;
        self.files.delete(&brand_file_path(bid)).await?;
        Ok(())
    }

    /// Every brand in the file store; unreadable records are skipped.
    pub async fn get_all_brands(&self) -> Result<Vec<Brand>> {
        let prefix = format!("{}/", BRAND_FILE_STORE_DIR);
        let paths = self.files.list(&prefix).await?;
        debug!("Found {} brands in file store at path {}", paths.len(), prefix);

        let mut brands = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = match self.files.read(&path).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Error reading brand from file store {}: {:#}", path, e);
                    continue;
                }
            };
            match serde_json::from_slice::<Brand>(&raw) {
                Ok(brand) => brands.push(brand),
                Err(e) => warn!("Error parsing brand from file store {}: {}", path, e),
            }
        }
        Ok(brands)
    }
}

/// Brand ids double as file names, so only `[A-Za-z0-9_-]` is allowed.
pub fn is_valid_bid(bid: &str) -> bool {
    !bid.is_empty() && bid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_bid(bid: &str) -> Result<()> {
    if !is_valid_bid(bid) {
        bail!("invalid brand id {:?}", bid);
    }
    Ok(())
}
