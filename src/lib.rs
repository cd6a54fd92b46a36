pub mod exchange;
pub mod generator;
pub mod heuristics;
pub mod logical;
pub mod markdown;
pub mod mcd;
pub mod mld;
pub mod mpd;
pub mod sql;

use wasm_bindgen::prelude::*;

use mpd::Dialect;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compile markdown MCD source to SQL DDL for the given dialect.
#[wasm_bindgen(js_name = "mcdToSql")]
pub fn mcd_to_sql(source: &str, dialect: Option<String>) -> Result<String, String> {
    let dialect =
        Dialect::parse(dialect.as_deref().unwrap_or("mysql")).map_err(|e| e.to_string())?;
    let outcome = markdown::parse(source);
    let logical = logical::to_logical(&outcome.schema).map_err(|e| e.to_string())?;
    let physical = mpd::to_physical(&logical, dialect);
    Ok(generator::to_sql(&physical))
}

/// Inspect SQL DDL: returns validation issues and optimization
/// suggestions as a JSON document.
#[wasm_bindgen(js_name = "inspectSql")]
pub fn inspect_sql(source: &str) -> Result<String, String> {
    let schema = sql::analyze_sql(source);
    let report = serde_json::json!({
        "issues": sql::validate_schema(&schema),
        "suggestions": sql::suggest_optimizations(&schema),
    });
    serde_json::to_string_pretty(&report).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r#"
## Client
- nom (varchar) : nom du client

## Commande
- montant (decimal)

### Client <-> Commande : Passe
Client : 1,1
Commande : 0,n
"#;

    #[test]
    fn test_mcd_to_sql_end_to_end() {
        let sql = mcd_to_sql(SHOP, Some("postgresql".to_string())).unwrap();
        assert!(sql.contains("CREATE TABLE client"));
        assert!(sql.contains("client_id"));
    }

    #[test]
    fn test_mcd_to_sql_rejects_unknown_dialect() {
        assert!(mcd_to_sql(SHOP, Some("oracle".to_string())).is_err());
    }

    #[test]
    fn test_mcd_to_sql_idempotent() {
        let first = mcd_to_sql(SHOP, None).unwrap();
        let second = mcd_to_sql(SHOP, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_inspect_sql_reports_json() {
        let report = inspect_sql("CREATE TABLE log (message TEXT);").unwrap();
        assert!(report.contains("missing_primary_key"));
        assert!(report.contains("suggestions"));
    }
}
