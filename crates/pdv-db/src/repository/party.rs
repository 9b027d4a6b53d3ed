//! # Party Repository
//!
//! Users (sellers) and customers. The ledger only needs their display
//! names for read models; account management lives elsewhere.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

/// Which party table to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyKind {
    User,
    Customer,
}

impl PartyKind {
    fn table(&self) -> &'static str {
        match self {
            PartyKind::User => "users",
            PartyKind::Customer => "customers",
        }
    }
}

/// Repository for user/customer lookups.
pub struct PartyRepository;

impl PartyRepository {
    /// Returns the display name of a party, if it exists.
    pub async fn name_of(
        conn: &mut SqliteConnection,
        kind: PartyKind,
        id: &str,
    ) -> DbResult<Option<String>> {
        let sql = format!("SELECT name FROM {} WHERE id = ?1", kind.table());
        let name = sqlx::query_scalar::<_, String>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(name)
    }

    /// Name lookup for an optional id.
    pub async fn name_of_opt(
        conn: &mut SqliteConnection,
        kind: PartyKind,
        id: Option<&str>,
    ) -> DbResult<Option<String>> {
        match id {
            Some(id) => Self::name_of(conn, kind, id).await,
            None => Ok(None),
        }
    }

    /// Inserts or renames a party.
    pub async fn upsert(
        conn: &mut SqliteConnection,
        kind: PartyKind,
        id: &str,
        name: &str,
    ) -> DbResult<()> {
        debug!(table = kind.table(), id = %id, "Upserting party");

        let sql = format!(
            "INSERT INTO {} (id, name) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(name)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        PartyRepository::upsert(&mut conn, PartyKind::Customer, "c-1", "Maria")
            .await
            .unwrap();
        PartyRepository::upsert(&mut conn, PartyKind::Customer, "c-1", "Maria Souza")
            .await
            .unwrap();

        let name = PartyRepository::name_of(&mut conn, PartyKind::Customer, "c-1")
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("Maria Souza"));

        // users and customers are separate tables
        let name = PartyRepository::name_of(&mut conn, PartyKind::User, "c-1")
            .await
            .unwrap();
        assert!(name.is_none());

        let name = PartyRepository::name_of_opt(&mut conn, PartyKind::User, None)
            .await
            .unwrap();
        assert!(name.is_none());
    }
}
