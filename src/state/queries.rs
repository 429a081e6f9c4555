// Database CRUD operations
use rusqlite::{params, Row};

use super::db::{DbConnection, DbResult};
use super::models::{NewPlayerPerformance, PlayerPerformance};

const SELECT_COLUMNS: &str =
    "SELECT id, average, strike_rate, bowling_average, economy_rate, fielding_stats, label
     FROM player_performance";

fn performance_from_row(row: &Row<'_>) -> rusqlite::Result<PlayerPerformance> {
    Ok(PlayerPerformance {
        id: row.get(0)?,
        average: row.get(1)?,
        strike_rate: row.get(2)?,
        bowling_average: row.get(3)?,
        economy_rate: row.get(4)?,
        fielding_stats: row.get(5)?,
        label: row.get(6)?,
    })
}

/// Insert a record and return it with its assigned id
pub fn create_performance(
    db: &DbConnection,
    performance: NewPlayerPerformance,
) -> DbResult<PlayerPerformance> {
    let conn = db.lock();
    conn.execute(
        "INSERT INTO player_performance (average, strike_rate, bowling_average, economy_rate, fielding_stats, label)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            performance.average,
            performance.strike_rate,
            performance.bowling_average,
            performance.economy_rate,
            performance.fielding_stats,
            performance.label,
        ],
    )?;

    Ok(PlayerPerformance {
        id: conn.last_insert_rowid(),
        average: performance.average,
        strike_rate: performance.strike_rate,
        bowling_average: performance.bowling_average,
        economy_rate: performance.economy_rate,
        fielding_stats: performance.fielding_stats,
        label: performance.label,
    })
}

/// Get a record by ID
pub fn get_performance(db: &DbConnection, id: i64) -> DbResult<Option<PlayerPerformance>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;

    match stmt.query_row([id], performance_from_row) {
        Ok(performance) => Ok(Some(performance)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List all records, oldest first
pub fn list_performances(db: &DbConnection) -> DbResult<Vec<PlayerPerformance>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(&format!("{} ORDER BY id ASC", SELECT_COLUMNS))?;

    let performances = stmt
        .query_map([], performance_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(performances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::db::init_db_in_memory;

    fn new_performance(average: f64, label: i32) -> NewPlayerPerformance {
        NewPlayerPerformance {
            average,
            strike_rate: 140.0,
            bowling_average: 20.0,
            economy_rate: 4.2,
            fielding_stats: 15,
            label,
        }
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let db = init_db_in_memory().unwrap();

        let first = create_performance(&db, new_performance(50.5, 1)).unwrap();
        let second = create_performance(&db, new_performance(22.0, 0)).unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.average, 50.5);
        assert_eq!(second.label, 0);
    }

    #[test]
    fn test_list_returns_stored_values_in_order() {
        let db = init_db_in_memory().unwrap();
        assert!(list_performances(&db).unwrap().is_empty());

        let created: Vec<PlayerPerformance> = [(50.5, 1), (31.0, 0), (44.4, 1)]
            .iter()
            .map(|(avg, label)| create_performance(&db, new_performance(*avg, *label)).unwrap())
            .collect();

        let listed = list_performances(&db).unwrap();
        assert_eq!(listed, created);
    }

    #[test]
    fn test_get_performance() {
        let db = init_db_in_memory().unwrap();
        let created = create_performance(&db, new_performance(50.5, 1)).unwrap();

        assert_eq!(get_performance(&db, created.id).unwrap(), Some(created.clone()));
        assert_eq!(get_performance(&db, created.id + 100).unwrap(), None);
    }
}
