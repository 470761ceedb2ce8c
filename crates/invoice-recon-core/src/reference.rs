//! Reference data: approved vendors, per-vendor price history, item aliases
//! and shipping norms.
//!
//! Each (vendor, item) key holds raw price points from that vendor's own
//! invoices. Vendors with a single invoice have a single data point, not a
//! synthesized range.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PriceRecord;

/// Reference data errors.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Failed to read reference data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid reference data: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// An approved vendor and the lowercase aliases it appears under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovedVendor {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Serialized form of one price history key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceHistoryEntry {
    pub vendor: String,
    pub item: String,
    pub records: Vec<PriceRecord>,
}

/// Price history indexed by exact (vendor, item) key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PriceHistoryEntry>", into = "Vec<PriceHistoryEntry>")]
pub struct PriceHistory {
    entries: HashMap<(String, String), Vec<PriceRecord>>,
}

impl PriceHistory {
    /// Records for an exact (vendor, item) key.
    pub fn get(&self, vendor: &str, item: &str) -> Option<&[PriceRecord]> {
        self.entries
            .get(&(vendor.to_string(), item.to_string()))
            .map(|v| v.as_slice())
            .filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, vendor: impl Into<String>, item: impl Into<String>, records: Vec<PriceRecord>) {
        self.entries
            .entry((vendor.into(), item.into()))
            .or_default()
            .extend(records);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<PriceHistoryEntry>> for PriceHistory {
    fn from(entries: Vec<PriceHistoryEntry>) -> Self {
        let mut history = PriceHistory::default();
        for entry in entries {
            history.insert(entry.vendor, entry.item, entry.records);
        }
        history
    }
}

impl From<PriceHistory> for Vec<PriceHistoryEntry> {
    fn from(history: PriceHistory) -> Self {
        let mut entries: Vec<PriceHistoryEntry> = history
            .entries
            .into_iter()
            .map(|((vendor, item), records)| PriceHistoryEntry { vendor, item, records })
            .collect();
        entries.sort_by(|a, b| (&a.vendor, &a.item).cmp(&(&b.vendor, &b.item)));
        entries
    }
}

/// All static reference tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub vendors: Vec<ApprovedVendor>,
    pub price_history: PriceHistory,
    /// lowercase description → canonical item name
    pub item_aliases: BTreeMap<String, String>,
    /// canonical vendor → largest shipping charge seen
    pub shipping_max_seen: BTreeMap<String, f64>,
}

impl ReferenceData {
    /// Load reference data from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ReferenceResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn max_shipping_seen(&self, vendor: &str) -> Option<f64> {
        self.shipping_max_seen.get(vendor).copied()
    }

    /// Built-in reference data.
    pub fn builtin() -> Self {
        Self {
            vendors: default_vendors(),
            price_history: default_price_history(),
            item_aliases: default_item_aliases(),
            shipping_max_seen: default_shipping_max(),
        }
    }
}

fn default_vendors() -> Vec<ApprovedVendor> {
    let vendor = |name: &str, aliases: &[&str]| ApprovedVendor {
        name: name.into(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    };

    vec![
        vendor(
            "Acme Supplies Inc.",
            &["acme supplies", "acme supplies inc", "acme supplies inc.", "acme supply"],
        ),
        vendor(
            "BrightOffice LLC",
            &["brightoffice llc", "brightoffice", "bright office llc", "bright office", "bright-office"],
        ),
        vendor("Harbor Hardware", &["harbor hardware", "harbour hardware", "harbor hw"]),
        vendor(
            "Northstar IT Services",
            &["northstar it services", "northstar it", "northstar", "north star it", "north star it services"],
        ),
        vendor(
            "Citywide Maintenance",
            &["citywide maintenance", "citywide", "city wide maintenance", "city-wide maintenance"],
        ),
        vendor(
            "Orbit Software Ltd.",
            &["orbit software ltd.", "orbit software ltd", "orbit software", "orbit"],
        ),
        vendor(
            "Pioneer Logistics Co.",
            &["pioneer logistics co.", "pioneer logistics co", "pioneer logistics", "pioneer"],
        ),
        vendor(
            "GreenFields Produce",
            &["greenfields produce", "greenfields", "green fields produce", "green fields"],
        ),
        vendor(
            "Zenith Catering Group Inc",
            &["zenith catering group inc", "zenith catering group", "zenith catering", "zenith", "zcg"],
        ),
    ]
}

fn default_price_history() -> PriceHistory {
    let mut history = PriceHistory::default();
    let mut add = |vendor: &str, item: &str, points: &[(f64, f64, &str)]| {
        let records = points
            .iter()
            .map(|(price, qty, invoice)| PriceRecord::new(*price, Some(*qty), *invoice))
            .collect();
        history.insert(vendor, item, records);
    };

    // Acme Supplies Inc. (3 invoices)
    let acme = "Acme Supplies Inc.";
    add(acme, "A4 Paper Box", &[(88.72, 24.0, "INV-20250003"), (24.19, 35.0, "INV-20250011"), (84.99, 29.0, "INV-20250018")]);
    add(acme, "Notebooks (Set of 10)", &[(94.69, 41.0, "INV-20250003"), (118.77, 16.0, "INV-20250011"), (23.97, 50.0, "INV-20250018")]);
    add(acme, "Pens (Box)", &[(38.05, 43.0, "INV-20250003"), (88.55, 37.0, "INV-20250011"), (86.33, 28.0, "INV-20250018")]);
    add(acme, "Printer Toner Model X", &[(15.09, 46.0, "INV-20250003"), (32.61, 27.0, "INV-20250011"), (15.91, 8.0, "INV-20250018")]);
    add(acme, "Staples Pack", &[(147.86, 19.0, "INV-20250003"), (75.39, 43.0, "INV-20250011"), (28.43, 17.0, "INV-20250018")]);

    // BrightOffice LLC (2 invoices)
    let bright = "BrightOffice LLC";
    add(bright, "Monitor Arm", &[(190.35, 44.0, "INV-20250001"), (66.98, 17.0, "INV-20250015")]);
    add(bright, "Ergonomic Chair Rental", &[(40.00, 140.0, "INV-20250001"), (38.86, 159.0, "INV-20250015")]);
    add(bright, "Standing Desk Rental", &[(27.31, 109.0, "INV-20250001"), (92.77, 134.0, "INV-20250015")]);
    add(bright, "Cable Management Kit", &[(70.29, 6.0, "INV-20250001"), (92.26, 46.0, "INV-20250015")]);
    add(bright, "Keyboard + Mouse Set", &[(158.46, 33.0, "INV-20250001"), (154.24, 43.0, "INV-20250015")]);

    // Harbor Hardware (5 invoices)
    let harbor = "Harbor Hardware";
    add(harbor, "Safety Gloves", &[(162.13, 49.0, "INV-20250002"), (26.81, 2.0, "INV-20250008"), (185.67, 17.0, "INV-20250013"), (16.89, 35.0, "INV-20250014"), (44.70, 22.0, "INV-20250017")]);
    add(harbor, "Ladder Rental", &[(87.41, 45.0, "INV-20250002"), (184.11, 34.0, "INV-20250008"), (37.10, 4.0, "INV-20250013"), (117.94, 4.0, "INV-20250014"), (58.11, 10.0, "INV-20250017")]);
    add(harbor, "Drill Bits Set", &[(35.32, 18.0, "INV-20250002"), (190.93, 35.0, "INV-20250008"), (197.14, 1.0, "INV-20250013"), (35.70, 34.0, "INV-20250014"), (149.77, 7.0, "INV-20250017")]);
    add(harbor, "Fasteners Assortment", &[(70.64, 49.0, "INV-20250002"), (68.21, 39.0, "INV-20250008"), (173.61, 14.0, "INV-20250013"), (97.97, 38.0, "INV-20250014"), (27.51, 17.0, "INV-20250017")]);
    add(harbor, "Tools Rental", &[(79.09, 6.0, "INV-20250002"), (153.69, 24.0, "INV-20250008"), (99.70, 27.0, "INV-20250013"), (16.15, 21.0, "INV-20250014"), (46.07, 39.0, "INV-20250017")]);

    // Northstar IT Services (5 invoices)
    let northstar = "Northstar IT Services";
    add(northstar, "Security Audit", &[(116.94, 103.0, "INV-20250005"), (177.38, 36.0, "INV-20250006"), (155.78, 156.0, "INV-20250009"), (162.87, 133.0, "INV-20250010"), (77.02, 180.0, "INV-20250020")]);
    add(northstar, "Helpdesk Support", &[(278.28, 55.0, "INV-20250005"), (248.02, 41.0, "INV-20250006"), (82.10, 33.0, "INV-20250009"), (51.80, 57.0, "INV-20250010"), (89.80, 69.0, "INV-20250020")]);
    add(northstar, "Network Troubleshooting", &[(269.09, 146.0, "INV-20250005"), (238.95, 24.0, "INV-20250006"), (286.71, 122.0, "INV-20250009"), (106.17, 64.0, "INV-20250010"), (252.69, 189.0, "INV-20250020")]);
    add(northstar, "Software License Admin", &[(103.16, 81.0, "INV-20250005"), (104.83, 93.0, "INV-20250006"), (183.18, 195.0, "INV-20250009"), (55.26, 87.0, "INV-20250010"), (250.56, 106.0, "INV-20250020")]);
    add(northstar, "Laptop Setup", &[(148.91, 32.0, "INV-20250005"), (88.21, 8.0, "INV-20250006"), (116.26, 11.0, "INV-20250009"), (107.53, 36.0, "INV-20250010"), (281.12, 48.0, "INV-20250020")]);

    // Citywide Maintenance (2 invoices)
    let citywide = "Citywide Maintenance";
    add(citywide, "Plumbing Repair", &[(318.32, 175.0, "INV-20250007"), (275.26, 104.0, "INV-20250012")]);
    add(citywide, "Light Fixture Replacement", &[(148.38, 49.0, "INV-20250007"), (222.48, 13.0, "INV-20250012")]);
    add(citywide, "Trash Removal", &[(168.55, 42.0, "INV-20250007"), (191.02, 9.0, "INV-20250012")]);
    add(citywide, "Office Cleaning", &[(194.56, 19.0, "INV-20250007"), (143.38, 7.0, "INV-20250012")]);
    add(citywide, "HVAC Check", &[(75.89, 30.0, "INV-20250007"), (202.22, 18.0, "INV-20250012")]);

    // Orbit Software Ltd. (1 invoice)
    let orbit = "Orbit Software Ltd.";
    add(orbit, "Priority Support", &[(140.82, 172.0, "INV-20250004")]);
    add(orbit, "Additional Seats", &[(327.54, 175.0, "INV-20250004")]);
    add(orbit, "Implementation Fee", &[(321.14, 156.0, "INV-20250004")]);
    add(orbit, "API Overages", &[(367.27, 35.0, "INV-20250004")]);
    add(orbit, "SaaS Subscription", &[(236.51, 42.0, "INV-20250004")]);

    // Pioneer Logistics Co. (1 invoice)
    let pioneer = "Pioneer Logistics Co.";
    add(pioneer, "Storage Fee", &[(219.68, 19.0, "INV-20250016")]);
    add(pioneer, "Local Delivery", &[(113.43, 33.0, "INV-20250016")]);
    add(pioneer, "Freight Handling", &[(353.54, 90.0, "INV-20250016")]);
    add(pioneer, "Packing Materials", &[(154.12, 16.0, "INV-20250016")]);
    add(pioneer, "Express Delivery", &[(180.89, 11.0, "INV-20250016")]);

    // GreenFields Produce (1 invoice)
    let greenfields = "GreenFields Produce";
    add(greenfields, "Eggs (Dozen)", &[(15.86, 20.0, "INV-20250019")]);
    add(greenfields, "Fruit Assortment", &[(36.16, 3.0, "INV-20250019")]);
    add(greenfields, "Organic Salad Mix", &[(27.92, 54.0, "INV-20250019")]);
    add(greenfields, "Seasonal Veg Box", &[(5.91, 43.0, "INV-20250019")]);
    add(greenfields, "Herbs Bundle", &[(23.28, 50.0, "INV-20250019")]);

    // Zenith Catering Group Inc is approved but has no history.

    history
}

fn default_item_aliases() -> BTreeMap<String, String> {
    let pairs: &[(&str, &str)] = &[
        ("standing desk rental - nov", "Standing Desk Rental"),
        ("standing desk rental", "Standing Desk Rental"),
        ("ergonomic chair rental-nov", "Ergonomic Chair Rental"),
        ("ergonomic chair rental", "Ergonomic Chair Rental"),
        ("cable mgmt kit", "Cable Management Kit"),
        ("cable management kit", "Cable Management Kit"),
        ("a4 paper box", "A4 Paper Box"),
        ("printer toner model x", "Printer Toner Model X"),
        ("staples pack", "Staples Pack"),
        ("monitor arm", "Monitor Arm"),
        ("keyboard + mouse set", "Keyboard + Mouse Set"),
        ("keyboard and mouse set", "Keyboard + Mouse Set"),
        ("safety gloves", "Safety Gloves"),
        ("ladder rental", "Ladder Rental"),
        ("drill bits set", "Drill Bits Set"),
        ("fasteners assortment", "Fasteners Assortment"),
        ("tools rental", "Tools Rental"),
        ("notebooks (set of 10)", "Notebooks (Set of 10)"),
        ("pens (box)", "Pens (Box)"),
        ("security audit", "Security Audit"),
        ("helpdesk support", "Helpdesk Support"),
        ("network troubleshooting", "Network Troubleshooting"),
        ("software license admin", "Software License Admin"),
        ("laptop setup", "Laptop Setup"),
        ("plumbing repair", "Plumbing Repair"),
        ("light fixture replacement", "Light Fixture Replacement"),
        ("trash removal", "Trash Removal"),
        ("office cleaning", "Office Cleaning"),
        ("hvac check", "HVAC Check"),
        ("priority support", "Priority Support"),
        ("additional seats", "Additional Seats"),
        ("implementation fee", "Implementation Fee"),
        ("api overages", "API Overages"),
        ("saas subscription", "SaaS Subscription"),
        ("storage fee", "Storage Fee"),
        ("local delivery", "Local Delivery"),
        ("freight handling", "Freight Handling"),
        ("packing materials", "Packing Materials"),
        ("express delivery", "Express Delivery"),
        ("eggs (dozen)", "Eggs (Dozen)"),
        ("fruit assortment", "Fruit Assortment"),
        ("organic salad mix", "Organic Salad Mix"),
        ("seasonal veg box", "Seasonal Veg Box"),
        ("herbs bundle", "Herbs Bundle"),
        ("corporate lunch buffet", "Corporate Lunch Buffet"),
        ("corporate lunch buffet (45 ppl)", "Corporate Lunch Buffet"),
        ("beverage package", "Beverage Package"),
        ("vegetarian add-on", "Vegetarian Add-on"),
        ("vegetarian addon", "Vegetarian Add-on"),
    ];

    pairs
        .iter()
        .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
        .collect()
}

fn default_shipping_max() -> BTreeMap<String, f64> {
    let pairs: &[(&str, f64)] = &[
        ("Acme Supplies Inc.", 60.00),
        ("BrightOffice LLC", 60.00),
        ("Harbor Hardware", 40.00),
        ("Northstar IT Services", 40.00),
        ("Citywide Maintenance", 40.00),
        ("Orbit Software Ltd.", 60.00),
        ("Pioneer Logistics Co.", 40.00),
        ("GreenFields Produce", 40.00),
        // No invoices yet; conservative estimate
        ("Zenith Catering Group Inc", 60.00),
    ];

    pairs
        .iter()
        .map(|(vendor, max)| (vendor.to_string(), *max))
        .collect()
}
