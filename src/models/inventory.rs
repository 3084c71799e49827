use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Por debajo de esta cantidad el producto se considera con stock bajo.
pub const LOW_STOCK_THRESHOLD: f64 = 10.0;
/// Días de anticipación para marcar un producto como próximo a vencer.
pub const EXPIRING_WITHIN_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub lot: String,
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    pub expiration: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity < LOW_STOCK_THRESHOLD
    }

    /// Vence dentro de la ventana de aviso; los ya vencidos también cuentan.
    pub fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        (self.expiration - now).num_days() <= EXPIRING_WITHIN_DAYS
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.lot.to_lowercase().contains(&term)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryFilter {
    LowStock,
    Expiring,
}

/// Producto con sus indicadores derivados.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub low_stock: bool,
    pub expiring: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub items: Vec<InventoryView>,
    pub low_stock_count: usize,
    pub expiring_count: usize,
}

impl InventoryReport {
    /// Los contadores se calculan sobre todo el inventario, antes de filtrar.
    pub fn build(
        items: Vec<InventoryItem>,
        filter: Option<InventoryFilter>,
        search: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let views: Vec<InventoryView> = items
            .into_iter()
            .map(|item| InventoryView {
                low_stock: item.is_low_stock(),
                expiring: item.is_expiring(now),
                item,
            })
            .collect();

        let low_stock_count = views.iter().filter(|v| v.low_stock).count();
        let expiring_count = views.iter().filter(|v| v.expiring).count();

        let items = views
            .into_iter()
            .filter(|v| match filter {
                Some(InventoryFilter::LowStock) => v.low_stock,
                Some(InventoryFilter::Expiring) => v.expiring,
                None => true,
            })
            .filter(|v| search.map(|s| v.item.matches_search(s)).unwrap_or(true))
            .collect();

        InventoryReport {
            items,
            low_stock_count,
            expiring_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn product(name: &str, quantity: f64, days_left: i64, now: DateTime<Utc>) -> InventoryItem {
        InventoryItem {
            id: name.to_lowercase(),
            lot: format!("LOT-{}", name),
            name: name.to_string(),
            quantity,
            unit: Some("L".to_string()),
            expiration: now + Duration::days(days_left),
        }
    }

    #[test]
    fn flags_low_stock_and_expiring() {
        let now = Utc::now();
        let cipermetrina = product("Cipermetrina", 4.0, 200, now);
        let deltametrina = product("Deltametrina", 40.0, 12, now);
        let vencido = product("Bifentrina", 40.0, -3, now);

        assert!(cipermetrina.is_low_stock());
        assert!(!cipermetrina.is_expiring(now));
        assert!(!deltametrina.is_low_stock());
        assert!(deltametrina.is_expiring(now));
        assert!(vencido.is_expiring(now));
    }

    #[test]
    fn report_counts_before_filtering() {
        let now = Utc::now();
        let items = vec![
            product("Cipermetrina", 4.0, 200, now),
            product("Deltametrina", 40.0, 12, now),
            product("Fipronil", 50.0, 300, now),
        ];

        let report = InventoryReport::build(items, Some(InventoryFilter::LowStock), None, now);
        assert_eq!(report.low_stock_count, 1);
        assert_eq!(report.expiring_count, 1);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].item.name, "Cipermetrina");
    }

    #[test]
    fn search_matches_name_or_lot() {
        let now = Utc::now();
        let items = vec![product("Cipermetrina", 4.0, 200, now), product("Fipronil", 50.0, 300, now)];

        let report = InventoryReport::build(items, None, Some("lot-fip"), now);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].item.name, "Fipronil");
    }
}
