//! Table registration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use reqwest::blocking::Client;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::error::ConfigResult;
use crate::ingestion::{
    DEFAULT_TABLE_NAME, Discovery, IngestionObserver, IngestionOptions, IngestionSeverity, discover_from_url,
};
use crate::types::{Row, TableSchema};

use super::schema::{ColumnDefinition, build_columns};
use super::value::HostValue;

/// A registered table: host column definitions plus the rows captured at discovery.
///
/// Rows are immutable and shared, so [`Table::list`] can run concurrently for independent
/// queries.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<ColumnDefinition>,
    rows: Arc<[Row]>,
}

impl Table {
    pub fn from_schema(name: impl Into<String>, schema: &TableSchema) -> Self {
        Self {
            name: name.into(),
            columns: build_columns(&schema.columns),
            rows: Arc::clone(&schema.rows),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Replay every captured row, in parse order, through `emit`.
    pub fn list<F>(&self, mut emit: F)
    where
        F: FnMut(&Row),
    {
        for row in self.rows.iter() {
            emit(row);
        }
    }

    /// A row's values converted to the column types, in column order.
    pub fn project(&self, row: &Row) -> Vec<HostValue> {
        self.columns.iter().map(|c| c.value(row)).collect()
    }
}

/// Registration object for one connection.
///
/// Each call to [`Plugin::tables`] runs discovery once and returns the `http` table. Discovery
/// never fails registration: an unreachable or unparsable source gives an empty table.
///
/// ```no_run
/// use url_table::config::ConnectionConfig;
/// use url_table::host::Plugin;
///
/// # fn main() -> Result<(), url_table::ConfigError> {
/// let plugin = Plugin::new(ConnectionConfig::new("https://example.com/data.csv"))?;
/// let tables = plugin.tables();
/// let http = &tables["http"];
/// http.list(|row| println!("{row:?}"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Plugin {
    config: ConnectionConfig,
    client: Option<Client>,
    observer: Option<Arc<dyn IngestionObserver>>,
    alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("config", &self.config)
            .field("client_set", &self.client.is_some())
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Plugin {
    /// Validate `config` and build a plugin for it.
    pub fn new(config: ConnectionConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            client: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        })
    }

    /// Use `client` for the fetch instead of a default client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Report diagnostics to `observer`, alerting at or above `alert_at_or_above`.
    pub fn with_observer(
        mut self,
        observer: Arc<dyn IngestionObserver>,
        alert_at_or_above: IngestionSeverity,
    ) -> Self {
        self.observer = Some(observer);
        self.alert_at_or_above = alert_at_or_above;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Run discovery and build the table, keeping the diagnostics.
    pub fn discover_table(&self) -> (Table, Discovery) {
        let options = IngestionOptions {
            observer: self.observer.clone(),
            alert_at_or_above: self.alert_at_or_above,
            ..IngestionOptions::from_config(&self.config)
        };
        let client = self.client.clone().unwrap_or_default();
        let discovery = discover_from_url(&client, &self.config.data_url, &options);
        let table = Table::from_schema(&options.table_name, &discovery.schema);
        info!(
            table = table.name(),
            columns = table.columns().len(),
            rows = table.row_count(),
            diagnostics = discovery.diagnostics.len(),
            "table registered"
        );
        (table, discovery)
    }

    /// Tables exposed by this connection, keyed by name.
    pub fn tables(&self) -> BTreeMap<String, Table> {
        let (table, _) = self.discover_table();
        BTreeMap::from([(DEFAULT_TABLE_NAME.to_string(), table)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostColumnType;
    use crate::ingestion::discover_from_text;

    fn sample_table() -> Table {
        let text = "id,name,score\n1,Ada,9.5\n2,Grace,\n";
        let discovery = discover_from_text(text, &IngestionOptions::default());
        Table::from_schema("http", &discovery.schema)
    }

    #[test]
    fn list_replays_rows_in_order_every_time() {
        let table = sample_table();
        for _ in 0..2 {
            let mut names = Vec::new();
            table.list(|row| names.push(row.get("name").unwrap_or_default().to_string()));
            assert_eq!(names, vec!["Ada", "Grace"]);
        }
    }

    #[test]
    fn columns_are_mapped_to_host_types() {
        let table = sample_table();
        let types: Vec<_> = table.columns().iter().map(|c| c.column_type).collect();
        // The empty score makes the column a string.
        assert_eq!(
            types,
            vec![HostColumnType::Int, HostColumnType::String, HostColumnType::String]
        );
    }

    #[test]
    fn project_converts_values() {
        let table = sample_table();
        let mut projected = Vec::new();
        table.list(|row| projected.push(table.project(row)));
        assert_eq!(projected[0][0], HostValue::Int(1));
        assert_eq!(projected[1][2], HostValue::String(String::new()));
    }

    #[test]
    fn concurrent_listing() {
        let table = Arc::new(sample_table());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = Arc::clone(&table);
                std::thread::spawn(move || {
                    let mut n = 0;
                    t.list(|_| n += 1);
                    n
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 2);
        }
    }

    #[test]
    fn repeated_header_name_projects_the_surviving_cell() {
        let discovery = discover_from_text("v,v\n1,x\n2,y\n", &IngestionOptions::default());
        let table = Table::from_schema("http", &discovery.schema);

        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.columns()[0].column_type, HostColumnType::String);
        let mut projected = Vec::new();
        table.list(|row| projected.push(table.project(row)));
        assert_eq!(
            projected,
            vec![
                vec![HostValue::String("x".to_string())],
                vec![HostValue::String("y".to_string())],
            ]
        );
    }

    #[test]
    fn plugin_rejects_invalid_config() {
        assert!(Plugin::new(ConnectionConfig::new("nope")).is_err());
    }
}
