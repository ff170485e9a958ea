//! Database schema and operations

use anyhow::{Context, Result};
use log::warn;
use rusqlite::{Connection, OptionalExtension};

use crate::index::normalize_resource_name;
use crate::models::{Building, ResourceAmount};
use crate::report::{Market, PriceSource, Quote};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Registry order is insertion order of the building row
        CREATE TABLE IF NOT EXISTS buildings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        -- What a building consumes per cycle
        CREATE TABLE IF NOT EXISTS building_inputs (
            building_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            resource_name TEXT NOT NULL,
            quantity REAL NOT NULL,
            PRIMARY KEY (building_id, position)
        );

        -- What a building produces per cycle
        CREATE TABLE IF NOT EXISTS building_outputs (
            building_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            resource_name TEXT NOT NULL,
            quantity REAL NOT NULL,
            PRIMARY KEY (building_id, position)
        );

        -- Unit prices, keyed by normalized resource name
        CREATE TABLE IF NOT EXISTS prices (
            resource_key TEXT NOT NULL,
            market TEXT NOT NULL,
            resource_name TEXT NOT NULL,
            buy REAL NOT NULL,
            sell REAL NOT NULL,
            PRIMARY KEY (resource_key, market)
        );

        CREATE INDEX IF NOT EXISTS idx_building_outputs_resource ON building_outputs(resource_name);
        "#,
    )?;
    Ok(())
}

/// Insert a building, or replace the inputs and outputs of an existing one.
/// A replaced building keeps its place in the registry.
pub fn upsert_building(conn: &Connection, building: &Building) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO buildings (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        [&building.name],
    )?;
    let id: i64 = tx.query_row(
        "SELECT id FROM buildings WHERE name = ?1",
        [&building.name],
        |row| row.get(0),
    )?;

    tx.execute("DELETE FROM building_inputs WHERE building_id = ?1", [id])?;
    tx.execute("DELETE FROM building_outputs WHERE building_id = ?1", [id])?;

    for (position, input) in building.inputs.iter().enumerate() {
        tx.execute(
            "INSERT INTO building_inputs (building_id, position, resource_name, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            (id, position as i64, &input.resource_name, input.quantity),
        )?;
    }
    for (position, output) in building.outputs.iter().enumerate() {
        tx.execute(
            "INSERT INTO building_outputs (building_id, position, resource_name, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            (id, position as i64, &output.resource_name, output.quantity),
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Remove a building and its resources. Returns whether it existed.
pub fn remove_building(conn: &Connection, name: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let id: Option<i64> = tx
        .query_row("SELECT id FROM buildings WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;

    let Some(id) = id else {
        return Ok(false);
    };

    tx.execute("DELETE FROM building_inputs WHERE building_id = ?1", [id])?;
    tx.execute("DELETE FROM building_outputs WHERE building_id = ?1", [id])?;
    tx.execute("DELETE FROM buildings WHERE id = ?1", [id])?;
    tx.commit()?;
    Ok(true)
}

/// Clear all buildings (prices are kept)
pub fn clear_registry(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM building_outputs;
        DELETE FROM building_inputs;
        DELETE FROM buildings;
        "#,
    )?;
    Ok(())
}

/// Load every building in registry order
pub fn load_registry(conn: &Connection) -> Result<Vec<Building>> {
    let mut stmt = conn.prepare("SELECT id, name FROM buildings ORDER BY id")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

    let mut heads = Vec::new();
    for row in rows {
        heads.push(row?);
    }

    let mut buildings = Vec::with_capacity(heads.len());
    for (id, name) in heads {
        let inputs = load_amounts(conn, "building_inputs", id)
            .with_context(|| format!("Failed to load inputs of {}", name))?;
        let outputs = load_amounts(conn, "building_outputs", id)
            .with_context(|| format!("Failed to load outputs of {}", name))?;
        buildings.push(Building {
            name,
            inputs,
            outputs,
        });
    }
    Ok(buildings)
}

fn load_amounts(conn: &Connection, table: &str, building_id: i64) -> Result<Vec<ResourceAmount>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT resource_name, quantity FROM {} WHERE building_id = ?1 ORDER BY position",
        table
    ))?;

    let rows = stmt.query_map([building_id], |row| {
        Ok(ResourceAmount {
            resource_name: row.get(0)?,
            quantity: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all unique resources that are outputs, one spelling per resource
pub fn list_producible_resources(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT MIN(trim(resource_name)) FROM building_outputs
         GROUP BY lower(trim(resource_name))
         ORDER BY lower(trim(resource_name))",
    )?;

    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Insert or replace the price of a resource in one market
pub fn set_price(conn: &Connection, resource: &str, market: Market, quote: Quote) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO prices (resource_key, market, resource_name, buy, sell)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            normalize_resource_name(resource),
            market.as_str(),
            resource.trim(),
            quote.buy,
            quote.sell,
        ),
    )?;
    Ok(())
}

/// Prices stored alongside the registry
pub struct PriceStore<'c> {
    conn: &'c Connection,
}

impl<'c> PriceStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn lookup(&self, resource: &str, market: Market) -> Result<Option<Quote>> {
        let quote = self
            .conn
            .query_row(
                "SELECT buy, sell FROM prices WHERE resource_key = ?1 AND market = ?2",
                (normalize_resource_name(resource), market.as_str()),
                |row| {
                    Ok(Quote {
                        buy: row.get(0)?,
                        sell: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(quote)
    }
}

impl PriceSource for PriceStore<'_> {
    fn quote(&self, resource: &str, market: Market) -> Option<Quote> {
        match self.lookup(resource, market) {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Price lookup for {} failed: {}", resource, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn registry_round_trips_in_insertion_order() {
        let conn = open();
        let mill = Building::new("Mill")
            .with_input("Ore", 4.0)
            .with_input("Coal", 1.0)
            .with_output("Steel", 1.0);
        let mine = Building::new("Mine").with_output("Ore", 5.0);
        upsert_building(&conn, &mill).unwrap();
        upsert_building(&conn, &mine).unwrap();

        assert_eq!(load_registry(&conn).unwrap(), vec![mill, mine]);
    }

    #[test]
    fn upsert_keeps_registry_position() {
        let conn = open();
        upsert_building(&conn, &Building::new("A").with_output("X", 1.0)).unwrap();
        upsert_building(&conn, &Building::new("B").with_output("Y", 1.0)).unwrap();
        let updated = Building::new("A").with_input("Z", 2.0).with_output("X", 3.0);
        upsert_building(&conn, &updated).unwrap();

        let registry = load_registry(&conn).unwrap();
        assert_eq!(registry[0], updated);
        assert_eq!(registry[1].name, "B");
    }

    #[test]
    fn remove_and_clear() {
        let conn = open();
        upsert_building(&conn, &Building::new("A").with_output("X", 1.0)).unwrap();
        upsert_building(&conn, &Building::new("B").with_output("Y", 1.0)).unwrap();

        assert!(remove_building(&conn, "A").unwrap());
        assert!(!remove_building(&conn, "A").unwrap());
        assert_eq!(list_producible_resources(&conn).unwrap(), vec!["Y"]);

        clear_registry(&conn).unwrap();
        assert!(load_registry(&conn).unwrap().is_empty());
    }

    #[test]
    fn producible_resources_ignore_case_and_whitespace() {
        let conn = open();
        upsert_building(&conn, &Building::new("A").with_output("Steel", 1.0)).unwrap();
        upsert_building(&conn, &Building::new("B").with_output("steel ", 2.0)).unwrap();
        upsert_building(&conn, &Building::new("C").with_output("Coal", 1.0)).unwrap();

        assert_eq!(list_producible_resources(&conn).unwrap(), vec!["Coal", "Steel"]);
    }

    #[test]
    fn prices_match_case_insensitively() {
        let conn = open();
        set_price(&conn, "Steel", Market::Primary, Quote { buy: 4.0, sell: 3.0 }).unwrap();
        set_price(&conn, " steel", Market::Primary, Quote { buy: 5.0, sell: 4.0 }).unwrap();

        let store = PriceStore::new(&conn);
        assert_eq!(
            store.quote("STEEL", Market::Primary),
            Some(Quote { buy: 5.0, sell: 4.0 })
        );
        assert_eq!(store.quote("Steel", Market::Secondary), None);
    }
}
