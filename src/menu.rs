//! The menu table data model: rows, translatable fields, and the fixed
//! 25-column output schema.
//!
//! A [`MenuRow`] holds the five source-language ("Default") cells extracted
//! from a page, plus one optional translated value per `(field, language)`
//! pair. The price column is numeric-as-text and never translated, so only
//! the four text fields participate in the per-language blocks.
//!
//! Column order is fixed: the five default columns, then for each language
//! block (En, Pt, Fr, De, Es) the four translated fields. That yields the
//! 25-column schema the workbook writer emits.

use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header labels of the five source-language columns, in schema order.
pub const DEFAULT_HEADERS: [&str; 5] = [
    "CategoryTitleDefault",
    "SubcategoryTitleDefault",
    "ItemNameDefault",
    "ItemDescriptionDefault",
    "ItemPrice",
];

/// The four text fields that get per-language translated columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TranslatableField {
    CategoryTitle,
    SubcategoryTitle,
    ItemName,
    ItemDescription,
}

impl TranslatableField {
    /// All translatable fields, in schema order within a language block.
    pub const ALL: [TranslatableField; 4] = [
        TranslatableField::CategoryTitle,
        TranslatableField::SubcategoryTitle,
        TranslatableField::ItemName,
        TranslatableField::ItemDescription,
    ];

    /// Base column name without a language suffix.
    pub fn base_name(self) -> &'static str {
        match self {
            TranslatableField::CategoryTitle => "CategoryTitle",
            TranslatableField::SubcategoryTitle => "SubcategoryTitle",
            TranslatableField::ItemName => "ItemName",
            TranslatableField::ItemDescription => "ItemDescription",
        }
    }

    /// Column header for this field in a given language block,
    /// e.g. `ItemNameFr`.
    pub fn column_header(self, lang: Language) -> String {
        format!("{}{}", self.base_name(), lang.code())
    }
}

/// One menu item: the five default-language cells plus translations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuRow {
    pub category_title: String,
    pub subcategory_title: String,
    pub item_name: String,
    pub item_description: String,
    /// Numeric-as-text, no currency symbol. Kept as text deliberately:
    /// prices like "5,50" or "12.-" must survive round-tripping unchanged.
    pub item_price: String,
    /// Translated values keyed by column header (`"ItemNameFr"`, …). Absent
    /// keys render as empty cells — the schema is widened at write time, not
    /// here. String keys keep the row JSON-serialisable for `--json` output.
    translations: HashMap<String, String>,
}

impl MenuRow {
    /// Build a row from the five default-language cells in schema order.
    pub fn from_cells(cells: [String; 5]) -> Self {
        let [category_title, subcategory_title, item_name, item_description, item_price] = cells;
        MenuRow {
            category_title,
            subcategory_title,
            item_name,
            item_description,
            item_price,
            translations: HashMap::new(),
        }
    }

    /// The default-language value of a translatable field.
    pub fn default_value(&self, field: TranslatableField) -> &str {
        match field {
            TranslatableField::CategoryTitle => &self.category_title,
            TranslatableField::SubcategoryTitle => &self.subcategory_title,
            TranslatableField::ItemName => &self.item_name,
            TranslatableField::ItemDescription => &self.item_description,
        }
    }

    /// The translated value for `(field, lang)`, empty string if unset.
    pub fn translation(&self, field: TranslatableField, lang: Language) -> &str {
        self.translations
            .get(&field.column_header(lang))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Set the translated value for `(field, lang)`.
    pub fn set_translation(&mut self, field: TranslatableField, lang: Language, value: String) {
        self.translations.insert(field.column_header(lang), value);
    }
}

/// The accumulated output table for one conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuTable {
    pub rows: Vec<MenuRow>,
}

impl MenuTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// All 25 column headers in output order: the five default columns, then
    /// En/Pt/Fr/De/Es blocks of the four translatable fields.
    pub fn headers() -> Vec<String> {
        let mut headers: Vec<String> = DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect();
        for lang in Language::ALL {
            for field in TranslatableField::ALL {
                headers.push(field.column_header(lang));
            }
        }
        headers
    }

    /// Render one row as its 25 cells in output order.
    pub fn row_cells(row: &MenuRow) -> Vec<String> {
        let mut cells = vec![
            row.category_title.clone(),
            row.subcategory_title.clone(),
            row.item_name.clone(),
            row.item_description.clone(),
            row.item_price.clone(),
        ];
        for lang in Language::ALL {
            for field in TranslatableField::ALL {
                cells.push(row.translation(field, lang).to_string());
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> MenuRow {
        MenuRow::from_cells([
            "Starters".into(),
            "".into(),
            "Soup".into(),
            "Tomato soup".into(),
            "5.50".into(),
        ])
    }

    #[test]
    fn headers_are_25_columns_in_block_order() {
        let headers = MenuTable::headers();
        assert_eq!(headers.len(), 25);
        assert_eq!(headers[0], "CategoryTitleDefault");
        assert_eq!(headers[4], "ItemPrice");
        // First language block is English.
        assert_eq!(headers[5], "CategoryTitleEn");
        assert_eq!(headers[8], "ItemDescriptionEn");
        // Last block is Spanish.
        assert_eq!(headers[21], "CategoryTitleEs");
        assert_eq!(headers[24], "ItemDescriptionEs");
    }

    #[test]
    fn unset_translation_renders_empty() {
        let row = sample_row();
        let cells = MenuTable::row_cells(&row);
        assert_eq!(cells.len(), 25);
        assert_eq!(cells[2], "Soup");
        assert!(cells[5..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn set_translation_lands_in_its_column() {
        let mut row = sample_row();
        row.set_translation(TranslatableField::ItemName, Language::Fr, "Soupe".into());
        let cells = MenuTable::row_cells(&row);
        let headers = MenuTable::headers();
        let idx = headers.iter().position(|h| h == "ItemNameFr").unwrap();
        assert_eq!(cells[idx], "Soupe");
        assert_eq!(row.translation(TranslatableField::ItemName, Language::Fr), "Soupe");
        assert_eq!(row.translation(TranslatableField::ItemName, Language::De), "");
    }

    #[test]
    fn column_header_formatting() {
        assert_eq!(
            TranslatableField::SubcategoryTitle.column_header(Language::Pt),
            "SubcategoryTitlePt"
        );
    }
}
