//! Catalog seed file loading.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::products::NewProduct;
use crate::ConfigError;

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<NewProduct>,
}

/// Load and validate a catalog seed file from YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_catalog(&content)
}

/// Parse and validate catalog YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let mut catalog: CatalogFile =
        serde_yaml::from_str(content).map_err(ConfigError::CatalogFileParse)?;
    validate_catalog(&mut catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &mut CatalogFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for product in &mut catalog.products {
        product
            .normalize()
            .map_err(|e| ConfigError::Validation(format!("product '{}': {e}", product.name)))?;

        if !seen_names.insert(product.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate product name: '{}'",
                product.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    const CATALOG: &str = r"
products:
  - name: Tempo Trainer
    description: Daily trainer with a firm midsole
    category: Shoes
    price: '119.00'
    stock: 12
    photos:
      - https://cdn.example.com/tempo.jpg
  - name: Merino Crew Sock
    description: Cushioned running sock
    category: Apparel
    price: '18.50'
";

    #[test]
    fn parses_products_with_defaults() {
        let catalog = parse_catalog(CATALOG).unwrap();
        assert_eq!(catalog.products.len(), 2);
        assert_eq!(catalog.products[0].price, Decimal::new(11900, 2));
        assert_eq!(catalog.products[0].photos.len(), 1);
        assert_eq!(catalog.products[1].stock, 0);
        assert!(catalog.products[1].photos.is_empty());
    }

    #[test]
    fn rejects_duplicate_names_case_insensitively() {
        let yaml = r"
products:
  - { name: Gel Pack, description: Energy gel, category: Nutrition, price: '2.50' }
  - { name: gel pack, description: Energy gel, category: Nutrition, price: '2.50' }
";
        let err = parse_catalog(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate product name"));
    }

    #[test]
    fn rejects_negative_stock() {
        let yaml = r"
products:
  - { name: Visor, description: Sun visor, category: Apparel, price: '20.00', stock: -1 }
";
        let err = parse_catalog(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("Visor")));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            parse_catalog("products: [ {"),
            Err(ConfigError::CatalogFileParse(_))
        ));
    }

    #[test]
    fn bundled_catalog_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/catalog.yaml");
        let catalog = load_catalog(&path).unwrap();
        assert!(!catalog.products.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_catalog(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::CatalogFileIo { .. }));
    }
}
