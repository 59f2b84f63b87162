use std::sync::Arc;
use tracing::info;

use super::errors::AttendanceError;
use crate::storage::MinistryStorage;
use shared::{Ministry, MinistryListQuery, MinistryListResponse};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Read access to ministries for the optional check-in selector
#[derive(Clone)]
pub struct MinistryService {
    ministries: Arc<dyn MinistryStorage>,
}

impl MinistryService {
    pub fn new(ministries: Arc<dyn MinistryStorage>) -> Self {
        Self { ministries }
    }

    /// List one page of ministries. Page is 1-based; page size is clamped to 1..=100.
    pub async fn list_ministries(&self, query: MinistryListQuery) -> Result<MinistryListResponse, AttendanceError> {
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(page_size);

        let (data, total) = self.ministries.list_ministries(offset, page_size).await?;
        info!("Listing ministries page {} (size {}): {} of {}", page, page_size, data.len(), total);

        Ok(MinistryListResponse {
            data,
            total,
            page,
            page_size,
        })
    }

    /// Create any of the named ministries that do not exist yet.
    /// Returns how many were created.
    pub async fn ensure_ministries(&self, names: &[String]) -> Result<usize, AttendanceError> {
        let mut created = 0;

        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if self.ministries.find_ministry_by_name(name).await?.is_some() {
                continue;
            }

            let ministry = Ministry {
                id: Ministry::generate_id(),
                name: name.to_string(),
                description: None,
            };
            self.ministries.store_ministry(&ministry).await?;
            info!("Seeded ministry {} ({})", ministry.name, ministry.id);
            created += 1;
        }

        Ok(created)
    }
}
